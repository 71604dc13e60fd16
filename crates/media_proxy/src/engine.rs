use std::sync::Arc;

use resource_proxy::{HandleRef, Resource};

use crate::config::EngineConfig;
use crate::native::NativeEngine;

/// The root every proxy is created from: a native engine plus the configuration proxies consult.
///
/// Cheap to clone; every proxy keeps one.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    native: Arc<dyn NativeEngine>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(native: Arc<dyn NativeEngine>, config: EngineConfig) -> Engine {
        Engine {
            inner: Arc::new(EngineInner { native, config }),
        }
    }

    pub fn with_defaults(native: Arc<dyn NativeEngine>) -> Engine {
        Self::new(native, Default::default())
    }

    pub fn native(&self) -> &dyn NativeEngine {
        &*self.inner.native
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Point the engine's notifications for a freshly created object at its proxy.
    pub(crate) fn attach<R: Resource>(&self, handle: &HandleRef<R>) {
        if let Some(lease) = handle.lease() {
            self.native().attach_events(lease.native(), handle.sink());
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
