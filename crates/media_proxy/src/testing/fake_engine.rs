use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use std::time::Duration;

use ahash::AHashMap;
use resource_proxy::{EventSink, NativeId, RawEvent};

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::media_info::*;
use crate::media_list::MediaListEvent;
use crate::native::*;
use crate::player::{Chapter, PlayerTrackKind, Title, TrackDescription};
use crate::renderer::{RendererEvent, RendererInfo, RendererService};

/// What the fake knows about one media.
#[derive(Clone, Debug)]
pub struct FakeMedia {
    pub mrl: String,
    pub duration: Option<i64>,
    pub state: Option<MediaState>,
    pub media_type: Option<MediaType>,
    pub metas: AHashMap<Meta, String>,
    pub tracks: Option<Vec<Track>>,
    pub parse_succeeds: bool,
    pub parse_calls: usize,
    pub options: Vec<String>,
    pub slaves: Vec<Slave>,
    pub stats: Option<Stats>,
    pub sub_items: Option<NativeId>,
}

impl FakeMedia {
    fn new(mrl: String) -> FakeMedia {
        FakeMedia {
            mrl,
            duration: Some(0),
            state: Some(MediaState::NothingSpecial),
            media_type: Some(MediaType::File),
            metas: AHashMap::new(),
            tracks: Some(vec![]),
            parse_succeeds: true,
            parse_calls: 0,
            options: vec![],
            slaves: vec![],
            stats: None,
            sub_items: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct FakeList {
    pub items: Vec<NativeId>,
    pub locked: bool,
}

/// What the fake knows about one player.
#[derive(Clone, Debug)]
pub struct FakePlayer {
    pub media: Option<NativeId>,
    pub playing: bool,
    pub paused: bool,
    /// If false, every mutation reporting success fails.
    pub accepts: bool,
    pub audio_outputs_set: Vec<String>,
    pub audio_devices_set: Vec<String>,
    pub time: Option<i64>,
    pub position: Option<f32>,
    pub length: Option<i64>,
    pub rate: f32,
    pub volume: Option<i32>,
    pub seekable: bool,
    pub tracks: AHashMap<PlayerTrackKind, Vec<TrackDescription>>,
    pub current_tracks: AHashMap<PlayerTrackKind, i32>,
    pub delays: AHashMap<PlayerTrackKind, i64>,
    pub titles: Vec<Title>,
    pub chapters: Vec<Chapter>,
    pub title: i32,
    pub chapter: i32,
    pub scale: f32,
    pub aspect_ratio: Option<String>,
    pub slaves: Vec<(SlaveKind, String, bool)>,
}

impl Default for FakePlayer {
    fn default() -> Self {
        FakePlayer {
            media: None,
            playing: false,
            paused: false,
            accepts: true,
            audio_outputs_set: vec![],
            audio_devices_set: vec![],
            time: Some(0),
            position: Some(0.0),
            length: None,
            rate: 1.0,
            volume: Some(100),
            seekable: false,
            tracks: AHashMap::new(),
            current_tracks: AHashMap::new(),
            delays: AHashMap::new(),
            titles: vec![],
            chapters: vec![],
            title: -1,
            chapter: -1,
            scale: 0.0,
            aspect_ratio: None,
            slaves: vec![],
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct FakeDiscoverer {
    pub name: String,
    pub started: bool,
    pub renderers: AHashMap<i64, RendererInfo>,
}

enum FakeKind {
    Media(FakeMedia),
    List(FakeList),
    Player(FakePlayer),
    Discoverer(FakeDiscoverer),
    Renderer,
}

impl FakeKind {
    fn name(&self) -> &'static str {
        match self {
            FakeKind::Media(_) => "media",
            FakeKind::List(_) => "list",
            FakeKind::Player(_) => "player",
            FakeKind::Discoverer(_) => "discoverer",
            FakeKind::Renderer => "renderer",
        }
    }
}

struct FakeObject {
    refs: usize,
    kind: FakeKind,
}

type FetchHook = Arc<dyn Fn(NativeId, &'static str) + Send + Sync>;

#[derive(Default)]
struct FakeState {
    next_id: u64,
    objects: AHashMap<NativeId, FakeObject>,
    sinks: AHashMap<NativeId, Vec<Weak<dyn EventSink>>>,
    failing_creations: usize,
    fetches: AHashMap<(NativeId, &'static str), usize>,
    services: Vec<RendererService>,
}

impl FakeState {
    fn create(&mut self, kind: FakeKind, refs: usize) -> NativeId {
        self.next_id += 1;
        let id = NativeId::new(self.next_id).expect("Ids start at 1");
        self.objects.insert(id, FakeObject { refs, kind });
        id
    }

    fn try_create(&mut self, kind: FakeKind) -> NativeResult<NativeId> {
        if self.failing_creations > 0 {
            self.failing_creations -= 1;
            return Err(NativeError::CreationFailed(kind.name()));
        }
        Ok(self.create(kind, 1))
    }

    #[track_caller]
    fn object(&mut self, id: NativeId) -> &mut FakeObject {
        match self.objects.get_mut(&id) {
            Some(o) if o.refs > 0 => o,
            Some(_) => panic!("{:?} was used after its last reference was released", id),
            None => panic!("{:?} was never created", id),
        }
    }

    #[track_caller]
    fn retain(&mut self, id: NativeId) {
        self.object(id).refs += 1;
    }

    /// Drop one reference, and whatever the object owned if it was the last.
    #[track_caller]
    fn release(&mut self, id: NativeId, expected: &'static str) {
        assert_eq!(self.object(id).kind.name(), expected, "Released the wrong kind of object");

        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let object = self.object(id);
            object.refs -= 1;
            if object.refs > 0 {
                continue;
            }

            match &object.kind {
                FakeKind::Media(m) => pending.extend(m.sub_items),
                FakeKind::List(l) => pending.extend(l.items.iter().copied()),
                FakeKind::Player(p) => pending.extend(p.media),
                FakeKind::Discoverer(_) | FakeKind::Renderer => {}
            }
            self.sinks.remove(&id);
        }
    }

    #[track_caller]
    fn media(&mut self, id: NativeId) -> &mut FakeMedia {
        match &mut self.object(id).kind {
            FakeKind::Media(m) => m,
            _ => panic!("{:?} is not a media", id),
        }
    }

    #[track_caller]
    fn list(&mut self, id: NativeId) -> &mut FakeList {
        match &mut self.object(id).kind {
            FakeKind::List(l) => l,
            _ => panic!("{:?} is not a list", id),
        }
    }

    #[track_caller]
    fn player(&mut self, id: NativeId) -> &mut FakePlayer {
        match &mut self.object(id).kind {
            FakeKind::Player(p) => p,
            _ => panic!("{:?} is not a player", id),
        }
    }

    #[track_caller]
    fn discoverer(&mut self, id: NativeId) -> &mut FakeDiscoverer {
        match &mut self.object(id).kind {
            FakeKind::Discoverer(d) => d,
            _ => panic!("{:?} is not a discoverer", id),
        }
    }
}

/// A [NativeEngine] which keeps everything in memory.
pub struct FakeEngine {
    state: Mutex<FakeState>,
    list_unlocked: Condvar,
    fetch_hook: Mutex<Option<FetchHook>>,
}

impl FakeEngine {
    pub fn new() -> Arc<FakeEngine> {
        Arc::new(FakeEngine {
            state: Mutex::new(FakeState {
                services: vec![RendererService {
                    name: "microdns_renderer".to_string(),
                    long_name: "mDNS renderers".to_string(),
                }],
                ..Default::default()
            }),
            list_unlocked: Condvar::new(),
            fetch_hook: Mutex::new(None),
        })
    }

    pub fn engine(self: &Arc<Self>) -> Engine {
        Engine::with_defaults(self.clone())
    }

    pub fn engine_with(self: &Arc<Self>, config: EngineConfig) -> Engine {
        Engine::new(self.clone(), config)
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("Fake engine state poisoned")
    }

    fn with<T>(&self, closure: impl FnOnce(&mut FakeState) -> T) -> T {
        closure(&mut self.lock())
    }

    /// Make the next `count` object creations fail.
    pub fn fail_next_creations(&self, count: usize) {
        self.with(|s| s.failing_creations = count);
    }

    /// Run `hook` at the end of every attribute fetch, after the value was read but before it is returned, with no
    /// engine lock held.
    pub fn set_fetch_hook(&self, hook: impl Fn(NativeId, &'static str) + Send + Sync + 'static) {
        *self.fetch_hook.lock().expect("Fetch hook poisoned") = Some(Arc::new(hook));
    }

    pub fn clear_fetch_hook(&self) {
        *self.fetch_hook.lock().expect("Fetch hook poisoned") = None;
    }

    fn fetch<T>(
        &self,
        id: NativeId,
        what: &'static str,
        read: impl FnOnce(&mut FakeMedia) -> T,
    ) -> T {
        let value = self.with(|s| {
            *s.fetches.entry((id, what)).or_default() += 1;
            read(s.media(id))
        });
        let hook = self.fetch_hook.lock().expect("Fetch hook poisoned").clone();
        if let Some(hook) = hook {
            hook(id, what);
        }
        value
    }

    /// How many times `what` was fetched for `id`.  `what` is one of `mrl`, `duration`, `state`, `type`, `meta`, or
    /// `tracks`.
    pub fn fetch_count(&self, id: NativeId, what: &'static str) -> usize {
        self.with(|s| s.fetches.get(&(id, what)).copied().unwrap_or(0))
    }

    /// Outstanding native references to `id`.
    pub fn refs(&self, id: NativeId) -> usize {
        self.with(|s| s.objects.get(&id).map_or(0, |o| o.refs))
    }

    pub fn is_released(&self, id: NativeId) -> bool {
        self.refs(id) == 0
    }

    /// How many objects still have references.
    pub fn live_objects(&self) -> usize {
        self.with(|s| s.objects.values().filter(|o| o.refs > 0).count())
    }

    pub fn media(&self, id: NativeId) -> FakeMedia {
        self.with(|s| s.media(id).clone())
    }

    pub fn update_media(&self, id: NativeId, update: impl FnOnce(&mut FakeMedia)) {
        self.with(|s| update(s.media(id)))
    }

    pub fn list(&self, id: NativeId) -> FakeList {
        self.with(|s| s.list(id).clone())
    }

    pub fn player(&self, id: NativeId) -> FakePlayer {
        self.with(|s| s.player(id).clone())
    }

    pub fn update_player(&self, id: NativeId, update: impl FnOnce(&mut FakePlayer)) {
        self.with(|s| update(s.player(id)))
    }

    pub fn discoverer(&self, id: NativeId) -> FakeDiscoverer {
        self.with(|s| s.discoverer(id).clone())
    }

    /// Deliver a notification the way the engine would: from the calling thread, with no engine lock held, to
    /// everything attached to the object.
    ///
    /// Returns whether anything was attached.
    pub fn emit(&self, id: NativeId, event: RawEvent) -> bool {
        let sinks = self.with(|s| {
            s.sinks
                .get(&id)
                .map(|sinks| sinks.iter().filter_map(Weak::upgrade).collect::<Vec<_>>())
                .unwrap_or_default()
        });
        for sink in sinks.iter() {
            sink.dispatch(event);
        }
        !sinks.is_empty()
    }

    /// Add a new media to a list at `index`, notifying with the list locked.
    pub fn list_insert(&self, list: NativeId, index: usize, mrl: &str) -> NativeId {
        self.list_lock(list);
        let media = self.with(|s| {
            let media = s.create(FakeKind::Media(FakeMedia::new(mrl.to_string())), 1);
            s.list(list).items.insert(index, media);
            media
        });
        self.emit(
            list,
            RawEvent::with_arg(MediaListEvent::ITEM_ADDED, index as i64),
        );
        self.list_unlock(list);
        media
    }

    /// Remove the media at `index` from a list, notifying with the list locked.
    pub fn list_remove(&self, list: NativeId, index: usize) -> NativeId {
        self.list_lock(list);
        let media = self.with(|s| s.list(list).items.remove(index));
        self.emit(
            list,
            RawEvent::with_arg(MediaListEvent::ITEM_DELETED, index as i64),
        );
        self.with(|s| s.release(media, "media"));
        self.list_unlock(list);
        media
    }

    /// Give a media sub-items before anyone asks for them.  Returns the native list.
    pub fn give_sub_items(&self, media: NativeId, mrls: &[&str]) -> NativeId {
        self.with(|s| {
            assert!(s.media(media).sub_items.is_none(), "{:?} already has sub-items", media);
            let items = mrls
                .iter()
                .map(|mrl| s.create(FakeKind::Media(FakeMedia::new(mrl.to_string())), 1))
                .collect();
            let list = s.create(FakeKind::List(FakeList { items, locked: false }), 1);
            s.media(media).sub_items = Some(list);
            list
        })
    }

    /// Add a media to a list without telling anyone, as if it was there from the start.
    pub fn list_push_silently(&self, list: NativeId, mrl: &str) -> NativeId {
        self.with(|s| {
            let media = s.create(FakeKind::Media(FakeMedia::new(mrl.to_string())), 1);
            s.list(list).items.push(media);
            media
        })
    }

    /// Make a discoverer find a renderer.
    pub fn add_renderer(&self, discoverer: NativeId, reference: i64, info: RendererInfo) -> bool {
        self.with(|s| s.discoverer(discoverer).renderers.insert(reference, info));
        self.emit(
            discoverer,
            RawEvent::with_arg(RendererEvent::ITEM_ADDED, reference),
        )
    }

    pub fn remove_renderer(&self, discoverer: NativeId, reference: i64) -> bool {
        self.with(|s| s.discoverer(discoverer).renderers.remove(&reference));
        self.emit(
            discoverer,
            RawEvent::with_arg(RendererEvent::ITEM_DELETED, reference),
        )
    }

    fn accepts(&self, player: NativeId, update: impl FnOnce(&mut FakePlayer)) -> bool {
        self.with(|s| {
            let p = s.player(player);
            if p.accepts {
                update(p);
            }
            p.accepts
        })
    }
}

impl MediaBackend for FakeEngine {
    fn media_new_path(&self, path: &str) -> NativeResult<NativeId> {
        let mrl = format!("file://{}", path);
        self.with(|s| s.try_create(FakeKind::Media(FakeMedia::new(mrl))))
    }

    fn media_new_location(&self, location: &str) -> NativeResult<NativeId> {
        self.with(|s| s.try_create(FakeKind::Media(FakeMedia::new(location.to_string()))))
    }

    fn media_new_fd(&self, fd: i32) -> NativeResult<NativeId> {
        let mrl = format!("fd://{}", fd);
        self.with(|s| s.try_create(FakeKind::Media(FakeMedia::new(mrl))))
    }

    fn media_new_from_list(&self, list: NativeId, index: usize) -> NativeResult<NativeId> {
        self.with(|s| {
            let media = s
                .list(list)
                .items
                .get(index)
                .copied()
                .ok_or(NativeError::CreationFailed("list item"))?;
            s.retain(media);
            Ok(media)
        })
    }

    fn media_release(&self, media: NativeId) {
        self.with(|s| s.release(media, "media"))
    }

    fn media_mrl(&self, media: NativeId) -> Option<String> {
        self.fetch(media, "mrl", |m| Some(m.mrl.clone()))
    }

    fn media_duration(&self, media: NativeId) -> Option<i64> {
        self.fetch(media, "duration", |m| m.duration)
    }

    fn media_state(&self, media: NativeId) -> Option<MediaState> {
        self.fetch(media, "state", |m| m.state)
    }

    fn media_type(&self, media: NativeId) -> Option<MediaType> {
        self.fetch(media, "type", |m| m.media_type)
    }

    fn media_meta(&self, media: NativeId, meta: Meta) -> Option<String> {
        self.fetch(media, "meta", |m| m.metas.get(&meta).cloned())
    }

    fn media_tracks(&self, media: NativeId) -> Option<Vec<Track>> {
        self.fetch(media, "tracks", |m| m.tracks.clone())
    }

    fn media_parse(&self, media: NativeId, _flags: ParseFlags) -> bool {
        self.with(|s| {
            let m = s.media(media);
            m.parse_calls += 1;
            m.parse_succeeds
        })
    }

    fn media_parse_async(
        &self,
        media: NativeId,
        flags: ParseFlags,
        _timeout: Option<Duration>,
    ) -> bool {
        self.media_parse(media, flags)
    }

    fn media_add_option(&self, media: NativeId, option: &str) {
        self.with(|s| s.media(media).options.push(option.to_string()))
    }

    fn media_add_slave(&self, media: NativeId, slave: &Slave) -> bool {
        if slave.uri.is_empty() {
            return false;
        }
        self.with(|s| s.media(media).slaves.push(slave.clone()));
        true
    }

    fn media_clear_slaves(&self, media: NativeId) {
        self.with(|s| s.media(media).slaves.clear())
    }

    fn media_slaves(&self, media: NativeId) -> Option<Vec<Slave>> {
        self.with(|s| Some(s.media(media).slaves.clone()))
    }

    fn media_stats(&self, media: NativeId) -> Option<Stats> {
        self.with(|s| s.media(media).stats.clone())
    }
}

impl MediaListBackend for FakeEngine {
    fn list_new(&self) -> NativeResult<NativeId> {
        self.with(|s| s.try_create(FakeKind::List(Default::default())))
    }

    fn list_from_media(&self, media: NativeId) -> NativeResult<NativeId> {
        self.with(|s| {
            if let Some(list) = s.media(media).sub_items {
                s.retain(list);
                return Ok(list);
            }
            if s.failing_creations > 0 {
                s.failing_creations -= 1;
                return Err(NativeError::CreationFailed("list"));
            }

            // One reference for the media, one for the caller.
            let list = s.create(FakeKind::List(Default::default()), 2);
            s.media(media).sub_items = Some(list);
            Ok(list)
        })
    }

    fn list_release(&self, list: NativeId) {
        self.with(|s| s.release(list, "list"))
    }

    fn list_count(&self, list: NativeId) -> usize {
        self.with(|s| s.list(list).items.len())
    }

    fn list_lock(&self, list: NativeId) {
        let mut state = self.lock();
        while state.list(list).locked {
            state = self
                .list_unlocked
                .wait(state)
                .expect("Fake engine state poisoned");
        }
        state.list(list).locked = true;
    }

    fn list_unlock(&self, list: NativeId) {
        self.with(|s| {
            let l = s.list(list);
            assert!(l.locked, "Unlocked {:?}, which was not locked", list);
            l.locked = false;
        });
        self.list_unlocked.notify_all();
    }
}

impl PlayerBackend for FakeEngine {
    fn player_new(&self) -> NativeResult<NativeId> {
        self.with(|s| s.try_create(FakeKind::Player(Default::default())))
    }

    fn player_new_from_media(&self, media: NativeId) -> NativeResult<NativeId> {
        self.with(|s| {
            let player = s.try_create(FakeKind::Player(FakePlayer {
                media: Some(media),
                ..Default::default()
            }))?;
            s.retain(media);
            Ok(player)
        })
    }

    fn player_release(&self, player: NativeId) {
        self.with(|s| s.release(player, "player"))
    }

    fn player_set_media(&self, player: NativeId, media: Option<NativeId>) {
        self.with(|s| {
            if let Some(m) = media {
                s.retain(m);
            }
            let old = std::mem::replace(&mut s.player(player).media, media);
            if let Some(old) = old {
                s.release(old, "media");
            }
        })
    }

    fn player_play(&self, player: NativeId) {
        self.with(|s| {
            let p = s.player(player);
            p.playing = true;
            p.paused = false;
        })
    }

    fn player_stop(&self, player: NativeId) {
        self.with(|s| {
            let p = s.player(player);
            p.playing = false;
            p.paused = false;
        })
    }

    fn player_pause(&self, player: NativeId) {
        self.with(|s| {
            let p = s.player(player);
            p.paused = !p.paused;
        })
    }

    fn player_set_pause(&self, player: NativeId, paused: bool) {
        self.with(|s| s.player(player).paused = paused)
    }

    fn player_is_playing(&self, player: NativeId) -> bool {
        self.with(|s| {
            let p = s.player(player);
            p.playing && !p.paused
        })
    }

    fn player_is_seekable(&self, player: NativeId) -> bool {
        self.with(|s| s.player(player).seekable)
    }

    fn player_time(&self, player: NativeId) -> Option<i64> {
        self.with(|s| s.player(player).time)
    }

    fn player_set_time(&self, player: NativeId, time: i64) {
        self.with(|s| s.player(player).time = Some(time))
    }

    fn player_position(&self, player: NativeId) -> Option<f32> {
        self.with(|s| s.player(player).position)
    }

    fn player_set_position(&self, player: NativeId, position: f32) {
        self.with(|s| s.player(player).position = Some(position))
    }

    fn player_length(&self, player: NativeId) -> Option<i64> {
        self.with(|s| s.player(player).length)
    }

    fn player_rate(&self, player: NativeId) -> f32 {
        self.with(|s| s.player(player).rate)
    }

    fn player_set_rate(&self, player: NativeId, rate: f32) -> bool {
        self.accepts(player, |p| p.rate = rate)
    }

    fn player_volume(&self, player: NativeId) -> Option<i32> {
        self.with(|s| s.player(player).volume)
    }

    fn player_set_volume(&self, player: NativeId, volume: i32) -> bool {
        self.accepts(player, |p| p.volume = Some(volume))
    }

    fn player_set_audio_output(&self, player: NativeId, output: &str) -> bool {
        self.accepts(player, |p| p.audio_outputs_set.push(output.to_string()))
    }

    fn player_set_audio_output_device(&self, player: NativeId, device: &str) -> bool {
        self.accepts(player, |p| p.audio_devices_set.push(device.to_string()))
    }

    fn player_track_count(&self, player: NativeId, kind: PlayerTrackKind) -> Option<usize> {
        self.with(|s| s.player(player).tracks.get(&kind).map(Vec::len))
    }

    fn player_tracks(
        &self,
        player: NativeId,
        kind: PlayerTrackKind,
    ) -> Option<Vec<TrackDescription>> {
        self.with(|s| s.player(player).tracks.get(&kind).cloned())
    }

    fn player_current_track(&self, player: NativeId, kind: PlayerTrackKind) -> Option<i32> {
        self.with(|s| Some(s.player(player).current_tracks.get(&kind).copied().unwrap_or(-1)))
    }

    fn player_set_track(&self, player: NativeId, kind: PlayerTrackKind, id: i32) -> bool {
        self.accepts(player, |p| {
            p.current_tracks.insert(kind, id);
        })
    }

    fn player_delay(&self, player: NativeId, kind: PlayerTrackKind) -> i64 {
        self.with(|s| s.player(player).delays.get(&kind).copied().unwrap_or(0))
    }

    fn player_set_delay(&self, player: NativeId, kind: PlayerTrackKind, delay: i64) -> bool {
        if kind == PlayerTrackKind::Video {
            return false;
        }
        self.accepts(player, |p| {
            p.delays.insert(kind, delay);
        })
    }

    fn player_titles(&self, player: NativeId) -> Option<Vec<Title>> {
        self.with(|s| Some(s.player(player).titles.clone()))
    }

    fn player_chapters(&self, player: NativeId, title: i32) -> Option<Vec<Chapter>> {
        self.with(|s| {
            let p = s.player(player);
            (title >= 0 && (title as usize) < p.titles.len()).then(|| p.chapters.clone())
        })
    }

    fn player_title(&self, player: NativeId) -> i32 {
        self.with(|s| s.player(player).title)
    }

    fn player_set_title(&self, player: NativeId, title: i32) {
        self.with(|s| s.player(player).title = title)
    }

    fn player_chapter(&self, player: NativeId) -> i32 {
        self.with(|s| s.player(player).chapter)
    }

    fn player_set_chapter(&self, player: NativeId, chapter: i32) {
        self.with(|s| s.player(player).chapter = chapter)
    }

    fn player_scale(&self, player: NativeId) -> f32 {
        self.with(|s| s.player(player).scale)
    }

    fn player_set_scale(&self, player: NativeId, scale: f32) {
        self.with(|s| s.player(player).scale = scale)
    }

    fn player_aspect_ratio(&self, player: NativeId) -> Option<String> {
        self.with(|s| s.player(player).aspect_ratio.clone())
    }

    fn player_set_aspect_ratio(&self, player: NativeId, aspect: Option<&str>) {
        self.with(|s| s.player(player).aspect_ratio = aspect.map(str::to_string))
    }

    fn player_add_slave(
        &self,
        player: NativeId,
        kind: SlaveKind,
        uri: &str,
        select: bool,
    ) -> bool {
        self.accepts(player, |p| p.slaves.push((kind, uri.to_string(), select)))
    }
}

impl RendererBackend for FakeEngine {
    fn renderer_services(&self) -> Vec<RendererService> {
        self.with(|s| s.services.clone())
    }

    fn discoverer_new(&self, name: &str) -> NativeResult<NativeId> {
        self.with(|s| {
            if !s.services.iter().any(|d| d.name == name) {
                return Err(NativeError::Unsupported("this renderer service"));
            }
            s.try_create(FakeKind::Discoverer(FakeDiscoverer {
                name: name.to_string(),
                ..Default::default()
            }))
        })
    }

    fn discoverer_release(&self, discoverer: NativeId) {
        self.with(|s| s.release(discoverer, "discoverer"))
    }

    fn discoverer_start(&self, discoverer: NativeId) -> bool {
        self.with(|s| s.discoverer(discoverer).started = true);
        true
    }

    fn discoverer_stop(&self, discoverer: NativeId) {
        self.with(|s| s.discoverer(discoverer).started = false)
    }

    fn renderer_item_hold(
        &self,
        discoverer: NativeId,
        reference: i64,
    ) -> Option<(NativeId, RendererInfo)> {
        self.with(|s| {
            let info = s
                .discoverer(discoverer)
                .renderers
                .get(&reference)
                .cloned()?;
            Some((s.create(FakeKind::Renderer, 1), info))
        })
    }

    fn renderer_item_release(&self, item: NativeId) {
        self.with(|s| s.release(item, "renderer"))
    }
}

impl NativeEngine for FakeEngine {
    fn attach_events(&self, object: NativeId, sink: Weak<dyn EventSink>) {
        self.with(|s| {
            s.object(object);
            let sinks = s.sinks.entry(object).or_default();
            sinks.retain(|w| w.strong_count() > 0);
            sinks.push(sink);
        })
    }
}
