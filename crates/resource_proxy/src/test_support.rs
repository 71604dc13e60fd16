//! A resource which records what happens to it, for exercising the substrate without a native engine.
use std::sync::{Arc, Mutex as StdMutex};

use crate::cache::CacheSlot;
use crate::handle::{HandleRef, ManagedHandle, Resource};
use crate::hub::EventHub;
use crate::raw_event::{NativeId, RawEvent};

pub(crate) const SET_VALUE: i32 = 1;
pub(crate) const INVALIDATE: i32 = 2;
pub(crate) const ECHO: i32 = 3;

#[derive(Default)]
pub(crate) struct ProbeLog {
    torn_down: StdMutex<Vec<NativeId>>,
}

/// Creates [ProbeResource]s which all report to the same log.
#[derive(Clone, Default)]
pub(crate) struct Probe {
    log: Arc<ProbeLog>,
}

#[derive(Default)]
pub(crate) struct ProbeState {
    pub(crate) value: CacheSlot<u64>,
    pub(crate) seen: Vec<i32>,
}

pub(crate) struct ProbeResource {
    log: Arc<ProbeLog>,
    hub: EventHub<ProbeState, u64>,
}

impl Probe {
    pub(crate) fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        Default::default()
    }

    fn resource(&self) -> ProbeResource {
        ProbeResource {
            log: self.log.clone(),
            hub: EventHub::new(ProbeState::default()),
        }
    }

    pub(crate) fn handle(&self, id: u64) -> ManagedHandle<ProbeResource> {
        ManagedHandle::new(NativeId::new(id).unwrap(), self.resource())
    }

    pub(crate) fn handle_ref(&self, id: u64) -> HandleRef<ProbeResource> {
        HandleRef::new(NativeId::new(id).unwrap(), self.resource())
    }

    pub(crate) fn teardowns(&self) -> usize {
        self.log.torn_down.lock().unwrap().len()
    }

    #[track_caller]
    pub(crate) fn assert_teardowns(&self, expected: usize) {
        assert_eq!(self.teardowns(), expected, "Unexpected number of teardowns");
    }

    #[track_caller]
    pub(crate) fn assert_torn_down(&self, id: NativeId) {
        let log = self.log.torn_down.lock().unwrap();
        assert_eq!(
            log.iter().filter(|x| **x == id).count(),
            1,
            "{:?} should have been torn down exactly once",
            id
        );
    }
}

impl Resource for ProbeResource {
    type State = ProbeState;
    type Event = u64;

    fn hub(&self) -> &EventHub<ProbeState, u64> {
        &self.hub
    }

    fn on_raw_event(
        &self,
        _native: NativeId,
        state: &mut ProbeState,
        event: &RawEvent,
    ) -> Option<u64> {
        state.seen.push(event.kind);
        match event.kind {
            SET_VALUE => {
                state.value.set(event.arg1 as u64);
                Some(event.arg1 as u64)
            }
            INVALIDATE => {
                state.value.invalidate();
                Some(0)
            }
            ECHO => Some(event.arg1 as u64),
            _ => None,
        }
    }

    fn teardown(&self, native: NativeId) {
        self.log.torn_down.lock().unwrap().push(native);
    }
}
