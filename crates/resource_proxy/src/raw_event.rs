use std::num::NonZeroU64;

/// An opaque identifier for an object owned by the native engine.
///
/// The identifier contains a niche, so `Option<NativeId>` is never bigger than the identifier itself.  Zero is reserved
/// by the native side to mean "no object".
#[derive(Copy, Clone, Debug, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub struct NativeId(NonZeroU64);

impl NativeId {
    pub fn new(raw: u64) -> Option<NativeId> {
        NonZeroU64::new(raw).map(NativeId)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

/// A notification as the native engine reports it.
///
/// The meaning of the arguments depends on `kind`, and each resource kind decides what to make of them.  Kinds a
/// resource doesn't know about are ignored rather than treated as errors: the engine may grow new notifications before
/// the proxies learn about them.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RawEvent {
    pub kind: i32,
    pub arg1: i64,
    pub arg2: i64,
    pub argf: f32,
}

impl RawEvent {
    pub fn new(kind: i32) -> RawEvent {
        RawEvent {
            kind,
            arg1: 0,
            arg2: 0,
            argf: 0.0,
        }
    }

    pub fn with_arg(kind: i32, arg1: i64) -> RawEvent {
        RawEvent {
            arg1,
            ..RawEvent::new(kind)
        }
    }

    pub fn with_args(kind: i32, arg1: i64, arg2: i64) -> RawEvent {
        RawEvent {
            arg1,
            arg2,
            ..RawEvent::new(kind)
        }
    }

    pub fn with_float(kind: i32, argf: f32) -> RawEvent {
        RawEvent {
            argf,
            ..RawEvent::new(kind)
        }
    }

    /// Interpret `arg1` as an index, where negative values mean "no index".
    pub fn index_arg(&self) -> Option<usize> {
        usize::try_from(self.arg1).ok()
    }
}

/// The entry point the native engine calls with notifications.
///
/// Implementations must tolerate being called from any thread at any time, including after the object behind them has
/// been released, in which case the call does nothing.
pub trait EventSink: Send + Sync {
    fn dispatch(&self, event: RawEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_not_an_id() {
        assert!(NativeId::new(0).is_none());
        assert_eq!(NativeId::new(7).unwrap().get(), 7);
        assert_eq!(
            std::mem::size_of::<Option<NativeId>>(),
            std::mem::size_of::<NativeId>()
        );
    }

    #[test]
    fn negative_index_args_are_not_indices() {
        assert_eq!(RawEvent::with_arg(1, -1).index_arg(), None);
        assert_eq!(RawEvent::with_arg(1, 3).index_arg(), Some(3));
    }
}
