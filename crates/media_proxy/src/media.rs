use std::sync::Arc;
use std::time::Duration;

use resource_proxy::{
    get_or_fetch, BulkGuard, CacheSlot, DeliveryContext, EventHub, HandleRef, Lease, Listener,
    NativeId, RawEvent, Resource,
};

use crate::engine::Engine;
use crate::error::{check, Result};
use crate::media_info::*;
use crate::media_list::MediaList;

/// Notifications about a [Media].
#[derive(Clone, Debug, PartialEq)]
pub enum MediaEvent {
    /// `None` if the engine named a meta we don't know.
    MetaChanged { meta: Option<Meta> },
    SubItemAdded,
    DurationChanged,
    ParsedChanged { status: Option<ParsedStatus> },
    StateChanged,
    SubItemTreeAdded,
}

impl MediaEvent {
    pub const META_CHANGED: i32 = 0;
    pub const SUB_ITEM_ADDED: i32 = 1;
    pub const DURATION_CHANGED: i32 = 2;
    pub const PARSED_CHANGED: i32 = 3;
    pub const STATE_CHANGED: i32 = 5;
    pub const SUB_ITEM_TREE_ADDED: i32 = 6;
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
enum ParseProgress {
    #[default]
    Idle,
    Parsing,
    Parsed,
}

#[derive(Default)]
pub(crate) struct MediaCache {
    duration: CacheSlot<i64>,
    state: CacheSlot<MediaState>,
    media_type: CacheSlot<MediaType>,
    tracks: CacheSlot<Arc<[Track]>>,
    metas: [CacheSlot<String>; Meta::COUNT],
    parse: ParseProgress,
    sub_items: Option<MediaList>,
    codec_option_set: bool,
}

impl MediaCache {
    /// Parsing can change everything it discovered, so all of that is fetched again.
    fn mark_parsed(&mut self) {
        self.parse = ParseProgress::Parsed;
        self.tracks.invalidate();
        self.duration.invalidate();
        self.state.invalidate();
        self.media_type.invalidate();
    }
}

pub(crate) struct MediaCore {
    engine: Engine,
    uri: Option<String>,
    hub: EventHub<MediaCache, MediaEvent>,
}

impl Resource for MediaCore {
    type State = MediaCache;
    type Event = MediaEvent;

    fn hub(&self) -> &EventHub<MediaCache, MediaEvent> {
        &self.hub
    }

    fn on_raw_event(
        &self,
        native: NativeId,
        cache: &mut MediaCache,
        event: &RawEvent,
    ) -> Option<MediaEvent> {
        Some(match event.kind {
            MediaEvent::META_CHANGED => {
                let meta = Meta::from_id(event.arg1);
                if let Some(m) = meta {
                    cache.metas[m.id()].invalidate();
                }
                MediaEvent::MetaChanged { meta }
            }
            MediaEvent::SUB_ITEM_ADDED => MediaEvent::SubItemAdded,
            MediaEvent::DURATION_CHANGED => {
                cache.duration.invalidate();
                MediaEvent::DurationChanged
            }
            MediaEvent::PARSED_CHANGED => {
                cache.mark_parsed();
                MediaEvent::ParsedChanged {
                    status: ParsedStatus::from_raw(event.arg1),
                }
            }
            MediaEvent::STATE_CHANGED => {
                cache.state.invalidate();
                MediaEvent::StateChanged
            }
            MediaEvent::SUB_ITEM_TREE_ADDED => MediaEvent::SubItemTreeAdded,
            other => {
                log::debug!("Ignoring media notification {} for {:?}", other, native);
                return None;
            }
        })
    }

    fn teardown(&self, native: NativeId) {
        let sub_items = self.hub.with_state(|c| c.sub_items.take());
        std::mem::drop(sub_items);
        self.engine.native().media_release(native);
    }
}

/// Something the engine can play: a file, a stream, an item of a list.
///
/// Attributes which rarely change are cached and refreshed when the engine says they changed.  A released media still
/// answers from its caches, falling back to neutral values for anything never read; mutating one panics.
#[derive(Clone)]
pub struct Media {
    inner: HandleRef<MediaCore>,
}

impl Media {
    fn wrap(engine: &Engine, native: NativeId, uri: Option<String>) -> HandleRef<MediaCore> {
        let core = MediaCore {
            engine: engine.clone(),
            uri,
            hub: EventHub::new(Default::default()),
        };
        let handle = HandleRef::new(native, core);
        engine.attach(&handle);
        handle
    }

    fn wrap_with_mrl(engine: &Engine, native: NativeId) -> HandleRef<MediaCore> {
        let uri = engine.native().media_mrl(native);
        Self::wrap(engine, native, uri)
    }

    pub fn new_path(engine: &Engine, path: &str) -> Result<Media> {
        let native = engine.native().media_new_path(path)?;
        Ok(Media {
            inner: Self::wrap_with_mrl(engine, native),
        })
    }

    pub fn new_location(engine: &Engine, location: &str) -> Result<Media> {
        let native = engine.native().media_new_location(location)?;
        Ok(Media {
            inner: Self::wrap(engine, native, Some(location.to_string())),
        })
    }

    /// The file descriptor must stay open for as long as the media is used.
    pub fn new_fd(engine: &Engine, fd: i32) -> Result<Media> {
        let native = engine.native().media_new_fd(fd)?;
        Ok(Media {
            inner: Self::wrap_with_mrl(engine, native),
        })
    }

    /// Build the proxy for an item of a list, which must be locked.
    pub(crate) fn list_child(
        engine: &Engine,
        _locked: &BulkGuard<'_, MediaCore>,
        list: NativeId,
        index: usize,
    ) -> Option<HandleRef<MediaCore>> {
        match engine.native().media_new_from_list(list, index) {
            Ok(native) => Some(Self::wrap_with_mrl(engine, native)),
            Err(e) => {
                log::warn!("No media for item {} of list {:?}: {}", index, list, e);
                None
            }
        }
    }

    pub(crate) fn from_ref(inner: HandleRef<MediaCore>) -> Media {
        Media { inner }
    }

    pub(crate) fn lease(&self) -> Option<Lease<'_, MediaCore>> {
        self.inner.lease()
    }

    fn core(&self) -> &MediaCore {
        self.inner.resource()
    }

    fn engine(&self) -> &Engine {
        &self.core().engine
    }

    #[track_caller]
    fn live(&self) -> Lease<'_, MediaCore> {
        match self.inner.lease() {
            Some(l) => l,
            None => panic!("Media {:?} was used after being released", self.uri()),
        }
    }

    /// The location of this media.  Never changes.
    pub fn uri(&self) -> Option<&str> {
        self.core().uri.as_deref()
    }

    pub fn is_released(&self) -> bool {
        !self.inner.is_alive()
    }

    /// Give up this reference now rather than at drop.
    pub fn release(self) {
        self.inner.release();
    }

    /// Duration in milliseconds, or 0 if released before it was ever read.
    pub fn duration(&self) -> Option<i64> {
        get_or_fetch(
            self.inner.handle(),
            |c| &mut c.duration,
            Some(0),
            |lease| self.engine().native().media_duration(lease.native()),
        )
    }

    pub fn state(&self) -> Option<MediaState> {
        get_or_fetch(
            self.inner.handle(),
            |c| &mut c.state,
            Some(MediaState::Error),
            |lease| self.engine().native().media_state(lease.native()),
        )
    }

    pub fn media_type(&self) -> Option<MediaType> {
        get_or_fetch(
            self.inner.handle(),
            |c| &mut c.media_type,
            Some(MediaType::Unknown),
            |lease| self.engine().native().media_type(lease.native()),
        )
    }

    pub fn tracks(&self) -> Option<Arc<[Track]>> {
        get_or_fetch(
            self.inner.handle(),
            |c| &mut c.tracks,
            None,
            |lease| {
                self.engine()
                    .native()
                    .media_tracks(lease.native())
                    .map(Arc::from)
            },
        )
    }

    pub fn track_count(&self) -> usize {
        self.tracks().map_or(0, |t| t.len())
    }

    pub fn track(&self, index: usize) -> Option<Track> {
        self.tracks()?.get(index).cloned()
    }

    pub fn meta(&self, meta: Meta) -> Option<String> {
        get_or_fetch(
            self.inner.handle(),
            |c| &mut c.metas[meta.id()],
            None,
            |lease| self.engine().native().media_meta(lease.native(), meta),
        )
    }

    /// Claim the right to start parsing.  Only the first caller gets it, until a parse fails.
    fn begin_parse(&self) -> bool {
        self.core().hub.with_state(|c| {
            if c.parse == ParseProgress::Idle {
                c.parse = ParseProgress::Parsing;
                true
            } else {
                false
            }
        })
    }

    fn abandon_parse(&self) {
        self.core().hub.with_state(|c| {
            if c.parse == ParseProgress::Parsing {
                c.parse = ParseProgress::Idle;
            }
        });
    }

    /// Parse synchronously.
    ///
    /// Returns `false` without doing anything if this media was already parsed or is being parsed.  A parse which
    /// fails may be tried again.
    pub fn parse(&self, flags: ParseFlags) -> bool {
        let lease = self.live();
        if !self.begin_parse() {
            return false;
        }

        let parsed = self.engine().native().media_parse(lease.native(), flags);
        if parsed {
            self.core().hub.with_state(MediaCache::mark_parsed);
        } else {
            self.abandon_parse();
        }
        parsed
    }

    pub fn parse_with_defaults(&self) -> bool {
        self.parse(self.engine().config().default_parse_flags)
    }

    /// Start parsing in the background.  Completion is reported with [MediaEvent::ParsedChanged].
    pub fn parse_async(&self, flags: ParseFlags, timeout: Option<Duration>) -> bool {
        let lease = self.live();
        if !self.begin_parse() {
            return false;
        }

        let started = self
            .engine()
            .native()
            .media_parse_async(lease.native(), flags, timeout);
        if !started {
            self.abandon_parse();
        }
        started
    }

    pub fn is_parsed(&self) -> bool {
        self.core()
            .hub
            .with_state(|c| c.parse == ParseProgress::Parsed)
    }

    pub fn slaves(&self) -> Option<Vec<Slave>> {
        let lease = self.inner.lease()?;
        self.engine().native().media_slaves(lease.native())
    }

    pub fn stats(&self) -> Option<Stats> {
        let lease = self.inner.lease()?;
        self.engine().native().media_stats(lease.native())
    }

    pub fn add_option(&self, option: &str) {
        let lease = self.live();
        if option.starts_with(":codec=") {
            self.core().hub.with_state(|c| c.codec_option_set = true);
        }
        self.engine()
            .native()
            .media_add_option(lease.native(), option);
    }

    pub fn add_slave(&self, slave: &Slave) -> Result<()> {
        let lease = self.live();
        check(
            self.engine()
                .native()
                .media_add_slave(lease.native(), slave),
            "add a slave",
        )
    }

    pub fn clear_slaves(&self) {
        let lease = self.live();
        self.engine().native().media_clear_slaves(lease.native());
    }

    /// Choose decoders.  `force` uses the configured hardware decoders even when they aren't known to work here.
    pub fn set_hw_decoder_enabled(&self, enabled: bool, force: bool) {
        for option in self.engine().config().codec_options(enabled, force) {
            self.add_option(&option);
        }
    }

    /// Enable hardware decoding unless a codec was already picked.  Happens at most once per media.
    pub(crate) fn apply_default_player_options(&self) {
        let already_set = self
            .core()
            .hub
            .with_state(|c| std::mem::replace(&mut c.codec_option_set, true));
        if !already_set {
            self.set_hw_decoder_enabled(true, false);
        }
    }

    /// The list of items inside this media, as for a playlist or directory.
    ///
    /// Created on first use and shared by later calls.
    pub fn sub_items(&self) -> Result<MediaList> {
        if let Some(existing) = self.core().hub.with_state(|c| c.sub_items.clone()) {
            return Ok(existing);
        }

        let lease = self.live();
        let fresh = MediaList::from_media(self.engine(), lease.native())?;
        let (list, lost_race) = self.core().hub.with_state(|c| match &c.sub_items {
            Some(existing) => (existing.clone(), Some(fresh)),
            None => {
                c.sub_items = Some(fresh.clone());
                (fresh, None)
            }
        });
        std::mem::drop(lost_race);
        Ok(list)
    }

    /// Replace the listener.  Events already on their way to the old one still arrive there.
    #[track_caller]
    pub fn set_event_listener(
        &self,
        listener: impl Listener<MediaEvent>,
        context: Arc<dyn DeliveryContext>,
    ) {
        let _lease = self.live();
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

impl PartialEq for Media {
    fn eq(&self, other: &Media) -> bool {
        self.inner.ptr_eq(&other.inner)
    }
}

impl Eq for Media {}

impl std::fmt::Debug for Media {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Media")
            .field("uri", &self.uri())
            .field("handle", &self.inner)
            .finish()
    }
}
