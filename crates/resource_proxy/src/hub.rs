//! The per-object lock, and the listener bound to it.
use std::sync::Arc;

use crate::delivery::DeliveryContext;
use crate::sync::{AtomicBool, Mutex, Ordering};

/// Something which wants typed events from a proxy.
pub trait Listener<E>: Send + Sync + 'static {
    fn on_event(&self, event: &E);
}

impl<E, F> Listener<E> for F
where
    F: Fn(&E) + Send + Sync + 'static,
{
    fn on_event(&self, event: &E) {
        (self)(event)
    }
}

/// A listener together with the context its events are delivered on.
///
/// Registrations are snapshotted under the object's lock and used after it is dropped.  Clearing the listener or
/// rebinding it never blocks on a delivery in progress: the old registration just finishes whatever it already has.
/// Tearing the object down deactivates the registration, and queued deliveries which haven't started yet are dropped.
pub struct Registration<E> {
    listener: Arc<dyn Listener<E>>,
    context: Arc<dyn DeliveryContext>,
    active: Arc<AtomicBool>,
}

impl<E> Clone for Registration<E> {
    fn clone(&self) -> Self {
        Registration {
            listener: self.listener.clone(),
            context: self.context.clone(),
            active: self.active.clone(),
        }
    }
}

impl<E: Send + 'static> Registration<E> {
    fn new(listener: Arc<dyn Listener<E>>, context: Arc<dyn DeliveryContext>) -> Self {
        Registration {
            listener,
            context,
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn listener(&self) -> &Arc<dyn Listener<E>> {
        &self.listener
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Queued jobs never own the context, so a queue dropped undrained frees its jobs and their payloads.
    pub(crate) fn deliver(self, event: E) {
        let Registration {
            listener,
            context,
            active,
        } = self;
        context.deliver(Box::new(move || {
            if active.load(Ordering::Acquire) {
                listener.on_event(&event);
            } else {
                log::trace!("Dropping a queued event for a torn down object");
            }
        }));
    }
}

struct HubInner<S, E> {
    registration: Option<Registration<E>>,
    state: S,
}

/// The lock every proxy holds exactly one of.
///
/// It guards the listener registration and the state notifications mutate, which for most resources is a set of
/// caches.  Nothing user-supplied ever runs with this lock held.
pub struct EventHub<S, E> {
    inner: Mutex<HubInner<S, E>>,
}

impl<S, E: Send + 'static> EventHub<S, E> {
    pub fn new(state: S) -> Self {
        EventHub {
            inner: Mutex::new(HubInner {
                registration: None,
                state,
            }),
        }
    }

    fn lock(&self) -> crate::sync::MutexGuard<'_, HubInner<S, E>> {
        self.inner.lock().expect("Event hub mutex poisoned")
    }

    /// Bind a listener, returning whatever was bound before.
    ///
    /// The returned registration should be dropped by the caller, which is never under the lock.
    pub fn set_listener(
        &self,
        listener: Arc<dyn Listener<E>>,
        context: Arc<dyn DeliveryContext>,
    ) -> Option<Registration<E>> {
        let registration = Registration::new(listener, context);
        self.lock().registration.replace(registration)
    }

    pub fn clear_listener(&self) -> Option<Registration<E>> {
        self.lock().registration.take()
    }

    pub fn has_listener(&self) -> bool {
        self.lock().registration.is_some()
    }

    /// Clear the listener and make sure nothing it has queued will run.
    pub(crate) fn deactivate(&self) -> Option<Registration<E>> {
        let old = self.lock().registration.take();
        if let Some(r) = old.as_ref() {
            r.deactivate();
        }
        old
    }

    /// Run a closure against the guarded state.
    ///
    /// The closure must not call back into anything which takes this hub's lock.
    pub fn with_state<T>(&self, closure: impl FnOnce(&mut S) -> T) -> T {
        closure(&mut self.lock().state)
    }

    /// Run a translation hook under the lock, and snapshot the registration its result should go to.
    pub(crate) fn translate(
        &self,
        hook: impl FnOnce(&mut S) -> Option<E>,
    ) -> (Option<Registration<E>>, Option<E>) {
        let mut guard = self.lock();
        let translated = hook(&mut guard.state);
        let registration = if translated.is_some() {
            guard.registration.clone()
        } else {
            None
        };
        (registration, translated)
    }
}
