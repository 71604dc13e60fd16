use resource_proxy::MirrorError;

use crate::native::NativeError;

#[derive(Debug, derive_more::Display, derive_more::IsVariant)]
enum ErrorPayload {
    #[display(fmt = "Native engine error: {}", _0)]
    Native(NativeError),

    #[display(fmt = "Media list error: {}", _0)]
    Mirror(MirrorError),

    #[display(fmt = "The engine could not {}", _0)]
    OperationFailed(&'static str),
}

#[derive(Debug, thiserror::Error)]
#[error("{payload}")]
pub struct Error {
    payload: ErrorPayload,
}

macro_rules! conv {
    ($variant: ident, $from_err: path) => {
        impl From<$from_err> for Error {
            fn from(value: $from_err) -> Error {
                Error {
                    payload: ErrorPayload::$variant(value),
                }
            }
        }
    };
}

conv!(Native, NativeError);
conv!(Mirror, MirrorError);

impl Error {
    pub(crate) fn operation_failed(what: &'static str) -> Error {
        Error {
            payload: ErrorPayload::OperationFailed(what),
        }
    }

    /// Did the native engine refuse to create an object?
    pub fn is_native(&self) -> bool {
        self.payload.is_native()
    }

    /// Was an index past the end of a [crate::MediaList]?
    pub fn is_index_out_of_range(&self) -> bool {
        matches!(self.payload, ErrorPayload::Mirror(MirrorError::OutOfRange { .. }))
    }

    /// Is the entry at an index one the engine couldn't give us?
    pub fn is_vacant_entry(&self) -> bool {
        matches!(self.payload, ErrorPayload::Mirror(MirrorError::Vacant { .. }))
    }

    /// Did a mutation report failure?
    pub fn is_operation_failed(&self) -> bool {
        self.payload.is_operation_failed()
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Turn a native success flag into a result.
pub(crate) fn check(ok: bool, what: &'static str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        log::debug!("Native call failed: {}", what);
        Err(Error::operation_failed(what))
    }
}
