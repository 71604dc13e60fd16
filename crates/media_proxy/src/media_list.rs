use std::sync::Arc;

use resource_proxy::{
    BulkGuard, DeliveryContext, EventHub, HandleRef, Listener, MirrorSource, NativeId,
    OrderedMirror, RawEvent, Resource,
};

use crate::engine::Engine;
use crate::error::Result;
use crate::media::{Media, MediaCore};

/// Notifications about a [MediaList].
#[derive(Clone, Debug)]
pub enum MediaListEvent {
    /// The media is a new reference which the event owns.
    ItemAdded { media: Media, index: usize },

    /// The media has already been released by the list, but anything it cached can still be read.
    ItemDeleted { media: Media, index: usize },

    EndReached,
}

impl MediaListEvent {
    pub const ITEM_ADDED: i32 = 0x200;
    pub const ITEM_DELETED: i32 = 0x202;
    pub const END_REACHED: i32 = 0x204;
}

pub(crate) struct MediaListCore {
    engine: Engine,
    mirror: OrderedMirror<MediaCore>,
    hub: EventHub<(), MediaListEvent>,
}

/// Reads a native list under its lock, for (re)building the mirror.
struct NativeList<'a> {
    engine: &'a Engine,
    list: NativeId,
}

impl MirrorSource<MediaCore> for NativeList<'_> {
    fn lock_native(&self) {
        self.engine.native().list_lock(self.list);
    }

    fn unlock_native(&self) {
        self.engine.native().list_unlock(self.list);
    }

    fn native_count(&self) -> usize {
        self.engine.native().list_count(self.list)
    }

    fn build_child(
        &self,
        guard: &BulkGuard<'_, MediaCore>,
        index: usize,
    ) -> Option<HandleRef<MediaCore>> {
        Media::list_child(self.engine, guard, self.list, index)
    }
}

impl Resource for MediaListCore {
    type State = ();
    type Event = MediaListEvent;

    fn hub(&self) -> &EventHub<(), MediaListEvent> {
        &self.hub
    }

    fn on_raw_event(
        &self,
        native: NativeId,
        _state: &mut (),
        event: &RawEvent,
    ) -> Option<MediaListEvent> {
        match event.kind {
            MediaListEvent::ITEM_ADDED => {
                let index = event.index_arg()?;
                let media = self.mirror.insert(index, |guard, i| {
                    Media::list_child(&self.engine, guard, native, i)
                })?;
                Some(MediaListEvent::ItemAdded {
                    media: Media::from_ref(media),
                    index,
                })
            }
            MediaListEvent::ITEM_DELETED => {
                let index = event.index_arg()?;
                let media = self.mirror.delete(index)?;
                Some(MediaListEvent::ItemDeleted {
                    media: Media::from_ref(media),
                    index,
                })
            }
            MediaListEvent::END_REACHED => Some(MediaListEvent::EndReached),
            other => {
                log::debug!("Ignoring list notification {} for {:?}", other, native);
                None
            }
        }
    }

    fn teardown(&self, native: NativeId) {
        self.mirror.teardown();
        self.engine.native().list_release(native);
    }
}

/// An ordered list of [Media], mirrored locally so that counting and indexing don't go to the engine.
#[derive(Clone)]
pub struct MediaList {
    inner: HandleRef<MediaListCore>,
}

impl MediaList {
    fn wrap(engine: &Engine, native: NativeId) -> MediaList {
        let core = MediaListCore {
            engine: engine.clone(),
            mirror: OrderedMirror::new(),
            hub: EventHub::new(()),
        };
        let inner = HandleRef::new(native, core);

        // Attach first: anything the engine changes after we read the list must reach the mirror.
        engine.attach(&inner);
        inner.resource().mirror.initialize(&NativeList {
            engine,
            list: native,
        });
        MediaList { inner }
    }

    pub fn new(engine: &Engine) -> Result<MediaList> {
        let native = engine.native().list_new()?;
        Ok(Self::wrap(engine, native))
    }

    pub(crate) fn from_media(engine: &Engine, media: NativeId) -> Result<MediaList> {
        let native = engine.native().list_from_media(media)?;
        Ok(Self::wrap(engine, native))
    }

    fn core(&self) -> &MediaListCore {
        self.inner.resource()
    }

    pub fn count(&self) -> usize {
        self.core().mirror.count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// A new reference to the media at `index`.
    pub fn media_at(&self, index: usize) -> Result<Media> {
        Ok(Media::from_ref(self.core().mirror.get(index)?))
    }

    /// New references to every media, in order.  Entries the engine couldn't give us are skipped.
    pub fn snapshot(&self) -> Vec<Media> {
        self.core()
            .mirror
            .snapshot()
            .into_iter()
            .flatten()
            .map(Media::from_ref)
            .collect()
    }

    /// Is the list in the middle of a bulk update?
    pub fn is_locked(&self) -> bool {
        self.core().mirror.is_locked()
    }

    pub fn is_released(&self) -> bool {
        !self.inner.is_alive()
    }

    pub fn release(self) {
        self.inner.release();
    }

    #[track_caller]
    pub fn set_event_listener(
        &self,
        listener: impl Listener<MediaListEvent>,
        context: Arc<dyn DeliveryContext>,
    ) {
        let Some(_lease) = self.inner.lease() else {
            panic!("Media list was used after being released");
        };
        let old = self.core().hub.set_listener(Arc::new(listener), context);
        std::mem::drop(old);
    }

    pub fn clear_event_listener(&self) {
        std::mem::drop(self.core().hub.clear_listener());
    }

    #[cfg(any(test, feature = "testing"))]
    pub fn native_id(&self) -> Option<NativeId> {
        self.inner.lease().map(|l| l.native())
    }
}

impl PartialEq for MediaList {
    fn eq(&self, other: &MediaList) -> bool {
        self.inner.ptr_eq(&other.inner)
    }
}

impl Eq for MediaList {}

impl std::fmt::Debug for MediaList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaList")
            .field("count", &self.count())
            .field("handle", &self.inner)
            .finish()
    }
}
