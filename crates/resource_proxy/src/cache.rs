//! Lazily populated caches of native attributes.
use crate::handle::{Lease, ManagedHandle, Resource};

/// One cached attribute.
///
/// Every invalidation bumps a generation counter.  A fetch takes a [FetchTicket] before it goes to the native side and
/// may only store its result if no invalidation happened in the meantime, so a notification racing a fetch always wins
/// and the stale value is never cached.
#[derive(Clone, Debug)]
pub struct CacheSlot<T> {
    value: Option<T>,
    generation: u64,
}

/// Opaque proof of which generation a fetch started in.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FetchTicket(u64);

impl<T> Default for CacheSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CacheSlot<T> {
    pub const fn new() -> Self {
        CacheSlot {
            value: None,
            generation: 0,
        }
    }

    pub fn get(&self) -> Option<T>
    where
        T: Clone,
    {
        self.value.clone()
    }

    pub fn peek(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_populated(&self) -> bool {
        self.value.is_some()
    }

    pub fn invalidate(&mut self) {
        self.value = None;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Store a value directly, as when a notification carries the new value with it.
    pub fn set(&mut self, value: T) {
        self.value = Some(value);
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn ticket(&self) -> FetchTicket {
        FetchTicket(self.generation)
    }

    /// Store a fetched value if nothing changed since `ticket` was taken.
    pub fn store(&mut self, ticket: FetchTicket, value: T) -> bool {
        if ticket.0 != self.generation {
            return false;
        }
        self.value = Some(value);
        true
    }
}

/// Read an attribute through its cache.
///
/// On a hit this never crosses into the native side.  On a miss the object is pinned with a lease and `fetch` runs
/// outside the object's lock; its result is cached unless the slot was invalidated while it ran.  A fetch which fails
/// is not cached, so the next read asks again.  If the object has already been released, `released` is returned.
pub fn get_or_fetch<R: Resource, T: Clone>(
    handle: &ManagedHandle<R>,
    slot: impl Fn(&mut R::State) -> &mut CacheSlot<T>,
    released: Option<T>,
    fetch: impl FnOnce(&Lease<'_, R>) -> Option<T>,
) -> Option<T> {
    let hub = handle.resource().hub();
    let ticket = match hub.with_state(|s| {
        let slot = slot(s);
        slot.get().ok_or_else(|| slot.ticket())
    }) {
        Ok(hit) => return Some(hit),
        Err(t) => t,
    };

    let Some(lease) = handle.lease() else {
        return released;
    };

    let fetched = fetch(&lease)?;
    let stored = hub.with_state(|s| slot(s).store(ticket, fetched.clone()));
    if !stored {
        log::debug!(
            "Not caching a value for {:?}: invalidated during the fetch",
            lease.native()
        );
    }

    Some(fetched)
}
