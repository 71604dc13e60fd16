//! Reference counting for native objects.
//!
//! Memory and native ownership are deliberately separate.  The memory of a [ManagedHandle] lives behind an [Arc] and
//! goes away when the last Rust value pointing at it does.  The native object is owned by an explicit reference count
//! which is retained and released by holders, and which tears the native object down the moment it reaches zero.  This
//! is what lets a released proxy still answer questions from its caches: the memory is still there, but the native
//! identifier is no longer reachable.
use std::sync::{Arc, Weak};

use crate::hub::EventHub;
use crate::raw_event::{EventSink, NativeId, RawEvent};
use crate::sync::{AtomicBool, AtomicUsize, Ordering};

/// A kind of native object which can sit behind a [ManagedHandle].
pub trait Resource: Send + Sync + Sized + 'static {
    /// State guarded by the object's lock and mutated by notifications.
    type State: Send + 'static;

    /// The typed events listeners receive.
    type Event: Send + 'static;

    fn hub(&self) -> &EventHub<Self::State, Self::Event>;

    /// Translate a raw notification into a typed event, updating state as needed.
    ///
    /// Runs with the object's lock held and the object pinned alive.  Returning `None` suppresses delivery, which is
    /// what should happen for unknown kinds and for notifications which no longer match local state.
    fn on_raw_event(
        &self,
        native: NativeId,
        state: &mut Self::State,
        event: &RawEvent,
    ) -> Option<Self::Event>;

    /// Free the native object.
    ///
    /// Called exactly once, after the reference count reached zero and the listener was cleared.  This is also the
    /// place to release any child handles the resource owns.
    fn teardown(&self, native: NativeId);
}

/// Reference-counted ownership of one native object.
///
/// The count starts at one, owned by whoever constructed the handle.  [ManagedHandle::retain] fails once the count has
/// reached zero, so a handle can never be resurrected, and consequently the alive flag flips exactly once.
pub struct ManagedHandle<R: Resource> {
    native: NativeId,
    refs: AtomicUsize,
    alive: AtomicBool,
    resource: R,
}

/// A temporary reference which pins a handle alive.
///
/// The native identifier is only reachable through a lease.  Dropping the lease releases its reference, which may tear
/// the object down if every other holder already let go.
pub struct Lease<'a, R: Resource> {
    handle: &'a ManagedHandle<R>,
}

impl<R: Resource> ManagedHandle<R> {
    pub fn new(native: NativeId, resource: R) -> Self {
        ManagedHandle {
            native,
            refs: AtomicUsize::new(1),
            alive: AtomicBool::new(true),
            resource,
        }
    }

    /// Take another reference, but only if the object is still alive.
    pub fn retain(&self) -> bool {
        let mut current = self.refs.load(Ordering::Relaxed);
        loop {
            if current == 0 {
                return false;
            }

            match self.refs.compare_exchange(
                current,
                current + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(c) => current = c,
            }
        }
    }

    /// Give up a reference, tearing the object down if this was the last one.
    ///
    /// Releasing more references than were retained is a bug in the caller and panics.
    pub fn release(&self) {
        let mut current = self.refs.load(Ordering::Relaxed);
        loop {
            assert!(
                current != 0,
                "Native handle {:?} was released more times than it was retained",
                self.native
            );

            match self.refs.compare_exchange(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(c) => current = c,
            }
        }

        if current == 1 {
            self.destroy();
        }
    }

    fn destroy(&self) {
        let was_alive = self.alive.swap(false, Ordering::AcqRel);
        assert!(was_alive, "Native handle {:?} was torn down twice", self.native);
        log::trace!("Tearing down native handle {:?}", self.native);

        // Dropped here, outside the hub's lock.
        let registration = self.resource.hub().deactivate();
        std::mem::drop(registration);

        self.resource.teardown(self.native);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Pin the object alive, or return `None` if it is already gone.
    pub fn lease(&self) -> Option<Lease<'_, R>> {
        self.retain().then(|| Lease { handle: self })
    }

    /// The resource behind this handle.
    ///
    /// This stays valid after release so that cached state can still be read.  The native identifier does not.
    pub fn resource(&self) -> &R {
        &self.resource
    }

    /// Deliver a notification from the native side.
    ///
    /// Does nothing if the object has been released.  Otherwise the object stays pinned until delivery finishes, so a
    /// concurrent release defers teardown until this call is done with it.
    pub fn dispatch(&self, event: RawEvent) {
        let Some(lease) = self.lease() else {
            log::trace!(
                "Dropping notification {} for released handle {:?}",
                event.kind,
                self.native
            );
            return;
        };

        let native = lease.native();
        let resource = lease.resource();
        let (registration, translated) = resource
            .hub()
            .translate(|state| resource.on_raw_event(native, state, &event));

        match (registration, translated) {
            (Some(registration), Some(translated)) => registration.deliver(translated),
            (None, Some(_)) => {
                log::trace!(
                    "No listener for notification {} on {:?}",
                    event.kind,
                    native
                );
            }
            (_, None) => {}
        }
    }
}

impl<R: Resource> EventSink for ManagedHandle<R> {
    fn dispatch(&self, event: RawEvent) {
        ManagedHandle::dispatch(self, event)
    }
}

impl<R: Resource> Lease<'_, R> {
    pub fn native(&self) -> NativeId {
        self.handle.native
    }

    pub fn resource(&self) -> &R {
        &self.handle.resource
    }
}

impl<R: Resource> Drop for Lease<'_, R> {
    fn drop(&mut self) {
        self.handle.release();
    }
}

/// An owner of one reference to a [ManagedHandle].
///
/// Cloning retains, dropping releases.  A ref can also be *detached*, which gives up its reference but keeps the
/// memory around so that cached state stays readable; clones of a detached ref stay detached once the object is gone.
pub struct HandleRef<R: Resource> {
    handle: Arc<ManagedHandle<R>>,
    owns_reference: bool,
}

impl<R: Resource> HandleRef<R> {
    /// Wrap a freshly created native object, taking ownership of its initial reference.
    pub fn new(native: NativeId, resource: R) -> Self {
        HandleRef {
            handle: Arc::new(ManagedHandle::new(native, resource)),
            owns_reference: true,
        }
    }

    pub fn handle(&self) -> &ManagedHandle<R> {
        &self.handle
    }

    pub fn resource(&self) -> &R {
        self.handle.resource()
    }

    pub fn is_alive(&self) -> bool {
        self.handle.is_alive()
    }

    pub fn owns_reference(&self) -> bool {
        self.owns_reference
    }

    pub fn lease(&self) -> Option<Lease<'_, R>> {
        self.handle.lease()
    }

    /// The sink the native side should deliver notifications for this object to.
    ///
    /// Weak, so that the native side never keeps the proxy's memory alive.
    pub fn sink(&self) -> Weak<dyn EventSink> {
        let weak: Weak<ManagedHandle<R>> = Arc::downgrade(&self.handle);
        weak
    }

    /// Release this reference now.
    pub fn release(self) {
        std::mem::drop(self);
    }

    /// Release this reference but keep the handle readable.
    pub fn detach(mut self) -> Self {
        if self.owns_reference {
            self.owns_reference = false;
            self.handle.release();
        }
        self
    }

    /// Do two refs point at the same native object?
    pub fn ptr_eq(&self, other: &HandleRef<R>) -> bool {
        Arc::ptr_eq(&self.handle, &other.handle)
    }
}

impl<R: Resource> Clone for HandleRef<R> {
    fn clone(&self) -> Self {
        HandleRef {
            owns_reference: self.handle.retain(),
            handle: self.handle.clone(),
        }
    }
}

impl<R: Resource> Drop for HandleRef<R> {
    fn drop(&mut self) {
        if self.owns_reference {
            self.handle.release();
        }
    }
}

impl<R: Resource> std::fmt::Debug for HandleRef<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleRef")
            .field("native", &self.handle.native)
            .field("alive", &self.handle.is_alive())
            .field("owns_reference", &self.owns_reference)
            .finish()
    }
}


#[cfg(test)]
mod model_tests {
    use super::*;

    use crate::test_support::*;

    /// A retain racing the final release either wins, keeping the object alive until it lets go, or loses cleanly.
    /// Either way teardown happens exactly once.
    #[test]
    fn retain_racing_final_release() {
        crate::sync::wrap_test(|| {
            let probe = Probe::new();
            let handle = Arc::new(probe.handle(1));

            let racer = {
                let handle = handle.clone();
                crate::sync::spawn(move || {
                    if handle.retain() {
                        assert!(handle.is_alive());
                        handle.release();
                    }
                })
            };

            handle.release();
            racer.join().unwrap();

            assert!(!handle.is_alive());
            probe.assert_teardowns(1);
        });
    }
}
