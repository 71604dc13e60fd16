//! A local, index-ordered copy of a sequence of children the native side owns.
//!
//! The native side numbers children densely from zero and tells us about inserts and deletes by index.  The only way
//! that arithmetic stays correct is if nothing interleaves with it, so every mutation of the mirror happens under the
//! mirror's bulk lock.  Notifications for one mirror are serialized by the native side; finding the bulk lock already
//! held means something is calling back into the mirror from inside a mutation, and that is a bug we refuse to continue
//! past.
use std::sync::TryLockError;

use crate::handle::{HandleRef, Resource};
use crate::sync::{AtomicBool, Mutex, MutexGuard, Ordering};

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum MirrorError {
    #[error("Index {index} is out of range for a mirror of {count} entries")]
    OutOfRange { index: usize, count: usize },

    #[error("Entry {index} could not be constructed")]
    Vacant { index: usize },
}

/// The native half of a mirror.
pub trait MirrorSource<R: Resource> {
    /// Stop the native side from mutating the sequence.
    fn lock_native(&self);

    fn unlock_native(&self);

    /// How many children there are.  Only called with the native side locked.
    fn native_count(&self) -> usize;

    /// Build the proxy for the child at `index`, or `None` if the native side couldn't give us one.
    fn build_child(&self, guard: &BulkGuard<'_, R>, index: usize) -> Option<HandleRef<R>>;
}

/// Proof that the bulk lock is held.
///
/// Dropping the guard unlocks, so the lock can't be released twice or released by someone who never took it.
pub struct BulkGuard<'a, R: Resource> {
    mirror: &'a OrderedMirror<R>,
    _guard: MutexGuard<'a, ()>,
}

struct NativeLock<'a, R: Resource, S: MirrorSource<R>> {
    source: &'a S,
    _phantom: std::marker::PhantomData<fn(R)>,
}

impl<'a, R: Resource, S: MirrorSource<R>> NativeLock<'a, R, S> {
    fn new(source: &'a S) -> Self {
        source.lock_native();
        NativeLock {
            source,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<R: Resource, S: MirrorSource<R>> Drop for NativeLock<'_, R, S> {
    fn drop(&mut self) {
        self.source.unlock_native();
    }
}

/// An index-ordered sequence of owned child handles.
///
/// Entries may be vacant when the native side reported a child we couldn't build a proxy for; they still occupy their
/// index so that later notifications line up.
pub struct OrderedMirror<R: Resource> {
    bulk: Mutex<()>,
    locked: AtomicBool,
    entries: Mutex<Vec<Option<HandleRef<R>>>>,
}

impl<R: Resource> Default for OrderedMirror<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource> OrderedMirror<R> {
    pub fn new() -> Self {
        OrderedMirror {
            bulk: Mutex::new(()),
            locked: AtomicBool::new(false),
            entries: Mutex::new(vec![]),
        }
    }

    /// Take the bulk lock.
    ///
    /// # Panics
    ///
    /// If the lock is already held.  Mutations of one mirror never legitimately nest or overlap.
    #[track_caller]
    pub fn lock(&self) -> BulkGuard<'_, R> {
        let guard = match self.bulk.try_lock() {
            Ok(g) => g,
            Err(TryLockError::WouldBlock) => panic!("Ordered mirror is already locked"),
            Err(TryLockError::Poisoned(_)) => panic!("Ordered mirror bulk lock poisoned"),
        };
        self.locked.store(true, Ordering::Release);
        BulkGuard {
            mirror: self,
            _guard: guard,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Option<HandleRef<R>>>> {
        self.entries.lock().expect("Ordered mirror entries poisoned")
    }

    /// Rebuild the mirror from the native side.
    ///
    /// Both the native lock and the bulk lock are held for the duration, taken in that order: the native side reports
    /// changes with its lock held, so it can't be inside [OrderedMirror::insert] or [OrderedMirror::delete] once we have
    /// it.  Whatever was mirrored before is released.
    pub fn initialize<S: MirrorSource<R>>(&self, source: &S) {
        let native = NativeLock::new(source);
        let guard = self.lock();

        let count = source.native_count();
        let fresh = (0..count)
            .map(|i| {
                let child = source.build_child(&guard, i);
                if child.is_none() {
                    log::warn!("Could not build mirrored child {}", i);
                }
                child
            })
            .collect::<Vec<_>>();
        log::debug!("Mirrored {} native children", count);

        let old = std::mem::replace(&mut *self.entries(), fresh);
        std::mem::drop(guard);
        std::mem::drop(native);
        std::mem::drop(old);
    }

    /// Insert a child at `index`, shifting everything at or after it up by one.
    ///
    /// Returns a new reference to the inserted child for the caller to hand out, or `None` if the index is stale or the
    /// child couldn't be built.  A child which couldn't be built still takes up its slot.
    pub fn insert(
        &self,
        index: usize,
        build: impl FnOnce(&BulkGuard<'_, R>, usize) -> Option<HandleRef<R>>,
    ) -> Option<HandleRef<R>> {
        let guard = self.lock();

        let count = self.count();
        if index > count {
            log::debug!(
                "Ignoring insert at {} into a mirror of {} entries",
                index,
                count
            );
            return None;
        }

        let child = build(&guard, index);
        let handed_out = child.clone();
        self.entries().insert(index, child);
        std::mem::drop(guard);
        handed_out
    }

    /// Remove the child at `index`, shifting everything after it down by one.
    ///
    /// The removed child is released, and handed back detached so that whatever it cached can still be read.  `None`
    /// means there was nothing there to remove.
    pub fn delete(&self, index: usize) -> Option<HandleRef<R>> {
        let guard = self.lock();

        let removed = {
            let mut entries = self.entries();
            if index >= entries.len() {
                log::debug!(
                    "Ignoring delete at {} from a mirror of {} entries",
                    index,
                    entries.len()
                );
                return None;
            }
            entries.remove(index)
        };

        std::mem::drop(guard);
        removed.map(HandleRef::detach)
    }

    /// Get a new reference to the child at `index`.
    pub fn get(&self, index: usize) -> Result<HandleRef<R>, MirrorError> {
        let entries = self.entries();
        match entries.get(index) {
            None => Err(MirrorError::OutOfRange {
                index,
                count: entries.len(),
            }),
            Some(None) => Err(MirrorError::Vacant { index }),
            Some(Some(child)) => Ok(child.clone()),
        }
    }

    pub fn count(&self) -> usize {
        self.entries().len()
    }

    /// New references to every child, in order.
    pub fn snapshot(&self) -> Vec<Option<HandleRef<R>>> {
        self.entries().clone()
    }

    /// Release everything still mirrored.
    pub fn teardown(&self) {
        let guard = self.lock();
        let old = std::mem::take(&mut *self.entries());
        std::mem::drop(guard);
        log::trace!("Releasing {} mirrored children", old.len());
        std::mem::drop(old);
    }
}

impl<R: Resource> Drop for BulkGuard<'_, R> {
    fn drop(&mut self) {
        self.mirror.locked.store(false, Ordering::Release);
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use std::sync::atomic::{AtomicU64, AtomicUsize};

    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::raw_event::NativeId;
    use crate::test_support::*;

    struct FakeSource {
        probe: Probe,
        count: usize,
        native_locks: AtomicUsize,
        native_unlocks: AtomicUsize,
    }

    impl FakeSource {
        fn new(probe: &Probe, count: usize) -> Self {
            FakeSource {
                probe: probe.clone(),
                count,
                native_locks: AtomicUsize::new(0),
                native_unlocks: AtomicUsize::new(0),
            }
        }
    }

    impl MirrorSource<ProbeResource> for FakeSource {
        fn lock_native(&self) {
            self.native_locks.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }

        fn unlock_native(&self) {
            self.native_unlocks
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }

        fn native_count(&self) -> usize {
            self.count
        }

        fn build_child(
            &self,
            guard: &BulkGuard<'_, ProbeResource>,
            index: usize,
        ) -> Option<HandleRef<ProbeResource>> {
            assert!(guard.mirror.is_locked());
            Some(self.probe.handle_ref(100 + index as u64))
        }
    }

    fn ids(mirror: &OrderedMirror<ProbeResource>) -> Vec<Option<u64>> {
        mirror
            .snapshot()
            .iter()
            .map(|c| c.as_ref().and_then(|c| c.lease()).map(|l| l.native().get()))
            .collect()
    }

    fn three(probe: &Probe) -> OrderedMirror<ProbeResource> {
        let mirror = OrderedMirror::new();
        let source = FakeSource::new(probe, 3);
        mirror.initialize(&source);
        assert_eq!(source.native_locks.load(std::sync::atomic::Ordering::Relaxed), 1);
        assert_eq!(source.native_unlocks.load(std::sync::atomic::Ordering::Relaxed), 1);
        mirror
    }

    #[test]
    fn initialize_mirrors_every_child() {
        let probe = Probe::new();
        let mirror = three(&probe);
        assert!(!mirror.is_locked());
        assert_eq!(ids(&mirror), vec![Some(100), Some(101), Some(102)]);
    }

    #[test]
    fn insert_shifts_later_entries_up() {
        let probe = Probe::new();
        let mirror = three(&probe);

        let inserted = mirror
            .insert(1, |_, _| Some(probe.handle_ref(7)))
            .expect("Insert should have produced a child");
        assert!(inserted.owns_reference());
        assert_eq!(mirror.count(), 4);
        assert_eq!(ids(&mirror), vec![Some(100), Some(7), Some(101), Some(102)]);

        // The caller's reference and the mirror's are separate.
        std::mem::drop(inserted);
        probe.assert_teardowns(0);
    }

    #[test]
    fn delete_releases_exactly_once_and_preserves_order() {
        let probe = Probe::new();
        let mirror = three(&probe);

        let removed = mirror.delete(0).expect("Delete should have produced a child");
        assert!(!removed.is_alive());
        probe.assert_teardowns(1);
        probe.assert_torn_down(NativeId::new(100).unwrap());
        assert_eq!(ids(&mirror), vec![Some(101), Some(102)]);

        std::mem::drop(removed);
        probe.assert_teardowns(1);
    }

    #[test]
    fn delete_keeps_children_handed_out_alive() {
        let probe = Probe::new();
        let mirror = three(&probe);
        let held = mirror.get(2).unwrap();

        let removed = mirror.delete(2).unwrap();
        assert!(removed.is_alive());
        assert!(held.ptr_eq(&removed));
        probe.assert_teardowns(0);

        std::mem::drop(held);
        probe.assert_teardowns(1);
    }

    #[test]
    fn stale_indices_are_ignored() {
        let probe = Probe::new();
        let mirror = three(&probe);

        assert!(mirror.insert(4, |_, _| panic!("Built a child for a stale insert")).is_none());
        assert!(mirror.delete(3).is_none());
        assert_eq!(mirror.count(), 3);
        probe.assert_teardowns(0);
    }

    #[test]
    fn vacant_entries_keep_their_slot() {
        let probe = Probe::new();
        let mirror = three(&probe);

        assert!(mirror.insert(0, |_, _| None).is_none());
        assert_eq!(mirror.count(), 4);
        assert_eq!(mirror.get(0).unwrap_err(), MirrorError::Vacant { index: 0 });
        assert_eq!(ids(&mirror), vec![None, Some(100), Some(101), Some(102)]);
        assert!(mirror.delete(0).is_none());
        assert_eq!(mirror.count(), 3);
    }

    #[test]
    fn get_is_bounds_checked() {
        let probe = Probe::new();
        let mirror = three(&probe);

        assert_eq!(
            mirror.get(3).unwrap_err(),
            MirrorError::OutOfRange { index: 3, count: 3 }
        );
        let child = mirror.get(2).unwrap();
        assert!(child.owns_reference());
    }

    #[test]
    #[should_panic(expected = "already locked")]
    fn double_lock_panics() {
        let probe = Probe::new();
        let mirror = three(&probe);
        let _first = mirror.lock();
        let _second = mirror.lock();
    }

    #[test]
    #[should_panic(expected = "already locked")]
    fn mutating_from_inside_a_mutation_panics() {
        let probe = Probe::new();
        let mirror = three(&probe);
        mirror.insert(0, |_, _| mirror.delete(0));
    }

    #[test]
    fn unlock_happens_on_drop() {
        let probe = Probe::new();
        let mirror = three(&probe);
        {
            let _guard = mirror.lock();
            assert!(mirror.is_locked());
        }
        assert!(!mirror.is_locked());
        let _again = mirror.lock();
    }

    #[test]
    fn teardown_releases_everything() {
        let probe = Probe::new();
        let mirror = three(&probe);
        mirror.teardown();
        probe.assert_teardowns(3);
        assert_eq!(mirror.count(), 0);
    }

    #[test]
    fn reinitialize_releases_the_old_children() {
        let probe = Probe::new();
        let mirror = three(&probe);
        mirror.initialize(&FakeSource::new(&probe, 1));
        probe.assert_teardowns(3);
        assert_eq!(ids(&mirror), vec![Some(100)]);
    }

    #[derive(Clone, Debug)]
    enum Op {
        Insert(usize),
        Delete(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..8usize).prop_map(Op::Insert),
            (0..8usize).prop_map(Op::Delete),
        ]
    }

    proptest! {
        #[test]
        fn mirror_matches_a_vec_model(ops in prop::collection::vec(op(), 0..64)) {
            let probe = Probe::new();
            let mirror = OrderedMirror::new();
            let next_id = AtomicU64::new(1);
            let mut model: Vec<u64> = vec![];

            for op in ops {
                match op {
                    Op::Insert(i) => {
                        let id = next_id.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                        let got = mirror.insert(i, |_, _| Some(probe.handle_ref(id)));
                        if i <= model.len() {
                            model.insert(i, id);
                            prop_assert!(got.is_some());
                        } else {
                            prop_assert!(got.is_none());
                        }
                    }
                    Op::Delete(i) => {
                        let got = mirror.delete(i);
                        if i < model.len() {
                            model.remove(i);
                            prop_assert!(got.is_some());
                        } else {
                            prop_assert!(got.is_none());
                        }
                    }
                }

                let expected = model.iter().copied().map(Some).collect::<Vec<_>>();
                prop_assert_eq!(ids(&mirror), expected);
            }

            let created = next_id.load(std::sync::atomic::Ordering::Relaxed) as usize - 1;
            prop_assert_eq!(probe.teardowns(), created - model.len());
            mirror.teardown();
            prop_assert_eq!(probe.teardowns(), created);
        }
    }
}
