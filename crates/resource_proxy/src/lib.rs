//! Building blocks for proxies over native, reference-counted resources.
//!
//! A native engine owns the real objects.  It hands out opaque identifiers, answers synchronous attribute queries, and
//! calls back on threads we do not control whenever something about an object changes.  Everything in this crate is
//! about making that boundary safe to use from ordinary Rust:
//!
//! - [ManagedHandle] counts references to one native object, tears it down exactly once, and only hands out the
//!   native identifier through a [Lease] which keeps the object alive while it is being used.
//! - [EventHub] owns the per-object lock, the listener [Registration], and the state that notifications mutate.  The
//!   native side calls [EventSink::dispatch]; the owning resource translates the [RawEvent] into a typed event under
//!   the lock, and the event is delivered afterwards through a [DeliveryContext] with no lock held.
//! - [CacheSlot] and [get_or_fetch] cache rarely-changing attributes so that reads don't cross the boundary, and let
//!   notifications invalidate individual entries.
//! - [OrderedMirror] keeps a local, index-ordered copy of a native sequence of children in step with insert and delete
//!   notifications.
//!
//! The crate spawns no threads.  All operations run on whichever thread calls them.
mod cache;
mod delivery;
mod handle;
mod hub;
mod mirror;
mod raw_event;
mod sync;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{get_or_fetch, CacheSlot, FetchTicket};
pub use delivery::{inline, DeliveryContext, DeliveryQueue, Inline, Job};
pub use handle::{HandleRef, Lease, ManagedHandle, Resource};
pub use hub::{EventHub, Listener, Registration};
pub use mirror::{BulkGuard, MirrorError, MirrorSource, OrderedMirror};
pub use raw_event::{EventSink, NativeId, RawEvent};
