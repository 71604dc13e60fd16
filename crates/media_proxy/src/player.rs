use std::sync::Arc;

use resource_proxy::{
    DeliveryContext, EventHub, HandleRef, Lease, Listener, NativeId, RawEvent, Resource,
};

use crate::engine::Engine;
use crate::error::{check, Result};
use crate::media::Media;
use crate::media_info::{SlaveKind, Track, TrackKind};

/// The kinds of track a player selects between.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum PlayerTrackKind {
    Video,
    Audio,
    Spu,
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct TrackDescription {
    pub id: i32,
    pub name: String,
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Title {
    /// In milliseconds.
    pub duration: i64,
    pub name: Option<String>,
    flags: u32,
}

impl Title {
    const MENU: u32 = 0x01;
    const INTERACTIVE: u32 = 0x02;

    pub fn new(duration: i64, name: Option<String>, menu: bool, interactive: bool) -> Title {
        let mut flags = 0;
        if menu {
            flags |= Self::MENU;
        }
        if interactive {
            flags |= Self::INTERACTIVE;
        }
        Title {
            duration,
            name,
            flags,
        }
    }

    pub fn is_menu(&self) -> bool {
        self.flags & Self::MENU != 0
    }

    pub fn is_interactive(&self) -> bool {
        self.flags & Self::INTERACTIVE != 0
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Chapter {
    /// In milliseconds from the start of the title.
    pub time_offset: i64,
    pub duration: i64,
    pub name: Option<String>,
}

/// Notifications about a [MediaPlayer].
#[derive(Clone, Debug, PartialEq)]
pub enum PlayerEvent {
    MediaChanged,
    Opening,
    Buffering { cache: f32 },
    Playing,
    Paused,
    Stopped,
    EndReached,
    EncounteredError,
    TimeChanged { time: i64 },
    PositionChanged { position: f32 },
    SeekableChanged { seekable: bool },
    PausableChanged { pausable: bool },
    Vout { count: usize },
    EsAdded { kind: TrackKind, id: i64 },
    EsDeleted { kind: TrackKind, id: i64 },
    EsSelected { kind: TrackKind, id: i64 },
}

impl PlayerEvent {
    pub const MEDIA_CHANGED: i32 = 0x100;
    pub const OPENING: i32 = 0x102;
    pub const BUFFERING: i32 = 0x103;
    pub const PLAYING: i32 = 0x104;
    pub const PAUSED: i32 = 0x105;
    pub const STOPPED: i32 = 0x106;
    pub const END_REACHED: i32 = 0x109;
    pub const ENCOUNTERED_ERROR: i32 = 0x10a;
    pub const TIME_CHANGED: i32 = 0x10b;
    pub const POSITION_CHANGED: i32 = 0x10c;
    pub const SEEKABLE_CHANGED: i32 = 0x10d;
    pub const PAUSABLE_CHANGED: i32 = 0x10e;
    pub const VOUT: i32 = 0x112;
    pub const ES_ADDED: i32 = 0x114;
    pub const ES_DELETED: i32 = 0x115;
    pub const ES_SELECTED: i32 = 0x116;
}

pub(crate) struct PlayerState {
    media: Option<Media>,
    playing: bool,
    play_requested: bool,

    /// Stopping resets the native audio output, so the next play sets it again.
    audio_reset: bool,
    audio_output: Option<String>,
    audio_output_device: Option<String>,
    vout_count: usize,
}

pub(crate) struct PlayerCore {
    engine: Engine,
    hub: EventHub<PlayerState, PlayerEvent>,
}

impl Resource for PlayerCore {
    type State = PlayerState;
    type Event = PlayerEvent;

    fn hub(&self) -> &EventHub<PlayerState, PlayerEvent> {
        &self.hub
    }

    fn on_raw_event(
        &self,
        native: NativeId,
        state: &mut PlayerState,
        event: &RawEvent,
    ) -> Option<PlayerEvent> {
        use PlayerEvent as E;

        let translated = match event.kind {
            E::MEDIA_CHANGED => E::MediaChanged,
            E::STOPPED => E::Stopped,
            E::END_REACHED => E::EndReached,
            E::ENCOUNTERED_ERROR => E::EncounteredError,
            E::OPENING => E::Opening,
            E::BUFFERING => E::Buffering { cache: event.argf },
            E::PLAYING => E::Playing,
            E::PAUSED => E::Paused,
            E::TIME_CHANGED => E::TimeChanged { time: event.arg1 },
            E::POSITION_CHANGED => E::PositionChanged {
                position: event.argf,
            },
            E::SEEKABLE_CHANGED => E::SeekableChanged {
                seekable: event.arg1 != 0,
            },
            E::PAUSABLE_CHANGED => E::PausableChanged {
                pausable: event.arg1 != 0,
            },
            E::VOUT => {
                let count = usize::try_from(event.arg1).unwrap_or(0);
                state.vout_count = count;
                E::Vout { count }
            }
            E::ES_ADDED | E::ES_DELETED | E::ES_SELECTED => {
                let kind = TrackKind::from_raw(event.arg1);
                let id = event.arg2;
                match event.kind {
                    E::ES_ADDED => E::EsAdded { kind, id },
                    E::ES_DELETED => E::EsDeleted { kind, id },
                    _ => E::EsSelected { kind, id },
                }
            }
            other => {
                log::debug!("Ignoring player notification {} for {:?}", other, native);
                return None;
            }
        };

        if matches!(
            translated,
            E::MediaChanged | E::Stopped | E::EndReached | E::EncounteredError
        ) {
            state.vout_count = 0;
        }

        Some(translated)
    }

    fn teardown(&self, native: NativeId) {
        let media = self.hub.with_state(|s| {
            s.vout_count = 0;
            s.media.take()
        });
        std::mem::drop(media);
        self.engine.native().player_release(native);
    }
}

/// Plays one [Media] at a time.
#[derive(Clone)]
pub struct MediaPlayer {
    inner: HandleRef<PlayerCore>,
}

impl MediaPlayer {
    fn wrap(engine: &Engine, native: NativeId, media: Option<Media>) -> MediaPlayer {
        let state = PlayerState {
            media,
            playing: false,
            play_requested: false,
            audio_reset: false,
            audio_output: Some(engine.config().audio_output.clone()),
            audio_output_device: None,
            vout_count: 0,
        };
        let core = PlayerCore {
            engine: engine.clone(),
            hub: EventHub::new(state),
        };
        let inner = HandleRef::new(native, core);
        engine.attach(&inner);
        MediaPlayer { inner }
    }

    pub fn new(engine: &Engine) -> Result<MediaPlayer> {
        let native = engine.native().player_new()?;
        Ok(Self::wrap(engine, native, None))
    }

    /// A player which starts out with `media` as its source.
    ///
    /// # Panics
    ///
    /// If the media was released.
    #[track_caller]
    pub fn with_media(engine: &Engine, media: &Media) -> Result<MediaPlayer> {
        let Some(media_lease) = media.lease() else {
            panic!("Cannot create a player for a released media");
        };
        if engine.config().apply_default_media_options {
            media.apply_default_player_options();
        }
        let native = engine.native().player_new_from_media(media_lease.native())?;
        Ok(Self::wrap(engine, native, Some(media.clone())))
    }

    fn core(&self) -> &PlayerCore {
        self.inner.resource()
    }

    fn engine(&self) -> &Engine {
        &self.core().engine
    }

    fn with_state<T>(&self, closure: impl FnOnce(&mut PlayerState) -> T) -> T {
        self.core().hub.with_state(closure)
    }

    #[track_caller]
    fn live(&self) -> Lease<'_, PlayerCore> {
        match self.inner.lease() {
            Some(l) => l,
            None => panic!("Media player was used after being released"),
        }
    }

    pub fn is_released(&self) -> bool {
        !self.inner.is_alive()
    }

    pub fn release(self) {
        self.inner.release();
    }

    /// A new reference to the current media.
    pub fn media(&self) -> Option<Media> {
        self.with_state(|s| s.media.clone())
    }

    /// Replace the current media, or clear it with `None`.
    ///
    /// # Panics
    ///
    /// If the media was released.
    #[track_caller]
    pub fn set_media(&self, media: Option<&Media>) {
        let lease = self.live();
        let media_lease = media.map(|m| match m.lease() {
            Some(l) => l,
            None => panic!("Cannot play a released media"),
        });

        if let Some(m) = media {
            if self.engine().config().apply_default_media_options {
                m.apply_default_player_options();
            }
        }

        self.engine()
            .native()
            .player_set_media(lease.native(), media_lease.as_ref().map(|l| l.native()));
        let old = self.with_state(|s| std::mem::replace(&mut s.media, media.cloned()));
        std::mem::drop(old);
    }

    pub fn play(&self) {
        let lease = self.live();
        let reapply = self.with_state(|s| {
            let mut reapply = (None, None);
            if !s.playing {
                if s.audio_reset {
                    reapply = (s.audio_output.clone(), s.audio_output_device.clone());
                    s.audio_reset = false;
                }
                s.play_requested = true;
            }
            s.playing = true;
            reapply
        });

        let native = self.engine().native();
        if let Some(output) = reapply.0 {
            native.player_set_audio_output(lease.native(), &output);
        }
        if let Some(device) = reapply.1 {
            native.player_set_audio_output_device(lease.native(), &device);
        }
        native.player_play(lease.native());
    }

    pub fn stop(&self) {
        let lease = self.live();
        self.with_state(|s| {
            s.play_requested = false;
            s.playing = false;
            s.audio_reset = true;
        });
        self.engine().native().player_stop(lease.native());
    }

    /// Toggle pause.
    pub fn pause(&self) {
        let lease = self.live();
        self.engine().native().player_pause(lease.native());
    }

    pub fn set_pause(&self, paused: bool) {
        let lease = self.live();
        self.engine()
            .native()
            .player_set_pause(lease.native(), paused);
    }

    /// Has `play` been called since the last `stop`?
    pub fn is_play_requested(&self) -> bool {
        self.with_state(|s| s.play_requested)
    }

    pub fn is_playing(&self) -> bool {
        self.inner
            .lease()
            .is_some_and(|l| self.engine().native().player_is_playing(l.native()))
    }

    pub fn is_seekable(&self) -> bool {
        self.inner
            .lease()
            .is_some_and(|l| self.engine().native().player_is_seekable(l.native()))
    }

    /// How many video outputs are active, as last reported by the engine.
    pub fn vout_count(&self) -> usize {
        self.with_state(|s| s.vout_count)
    }

    pub fn time(&self) -> Option<i64> {
        let lease = self.inner.lease()?;
        self.engine().native().player_time(lease.native())
    }

    pub fn set_time(&self, time: i64) {
        let lease = self.live();
        self.engine().native().player_set_time(lease.native(), time);
    }

    pub fn position(&self) -> Option<f32> {
        let lease = self.inner.lease()?;
        self.engine().native().player_position(lease.native())
    }

    pub fn set_position(&self, position: f32) {
        let lease = self.live();
        self.engine()
            .native()
            .player_set_position(lease.native(), position);
    }

    pub fn length(&self) -> Option<i64> {
        let lease = self.inner.lease()?;
        self.engine().native().player_length(lease.native())
    }

    pub fn rate(&self) -> f32 {
        let lease = self.live();
        self.engine().native().player_rate(lease.native())
    }

    pub fn set_rate(&self, rate: f32) -> Result<()> {
        let lease = self.live();
        check(
            self.engine().native().player_set_rate(lease.native(), rate),
            "set the playback rate",
        )
    }

    pub fn volume(&self) -> Option<i32> {
        let lease = self.inner.lease()?;
        self.engine().native().player_volume(lease.native())
    }

    pub fn set_volume(&self, volume: i32) -> Result<()> {
        let lease = self.live();
        check(
            self.engine()
                .native()
                .player_set_volume(lease.native(), volume),
            "set the volume",
        )
    }

    /// Choose the audio output module.  Remembered so it can be set again after a stop.
    pub fn set_audio_output(&self, output: &str) -> Result<()> {
        let lease = self.live();
        check(
            self.engine()
                .native()
                .player_set_audio_output(lease.native(), output),
            "set the audio output",
        )?;
        self.with_state(|s| s.audio_output = Some(output.to_string()));
        Ok(())
    }

    /// Choose the audio output device.  Remembered so it can be set again after a stop.
    pub fn set_audio_output_device(&self, device: &str) -> Result<()> {
        let lease = self.live();
        check(
            self.engine()
                .native()
                .player_set_audio_output_device(lease.native(), device),
            "set the audio output device",
        )?;
        self.with_state(|s| s.audio_output_device = Some(device.to_string()));
        Ok(())
    }

    pub fn track_count(&self, kind: PlayerTrackKind) -> usize {
        self.inner
            .lease()
            .and_then(|l| self.engine().native().player_track_count(l.native(), kind))
            .unwrap_or(0)
    }

    pub fn tracks(&self, kind: PlayerTrackKind) -> Option<Vec<TrackDescription>> {
        let lease = self.inner.lease()?;
        self.engine().native().player_tracks(lease.native(), kind)
    }

    /// The id of the selected track of a kind, if any is.
    pub fn current_track(&self, kind: PlayerTrackKind) -> Option<i32> {
        let lease = self.inner.lease()?;
        self.engine()
            .native()
            .player_current_track(lease.native(), kind)
            .filter(|id| *id != -1)
    }

    /// Select a track by id, or deselect with -1.
    pub fn set_track(&self, kind: PlayerTrackKind, id: i32) -> Result<()> {
        let lease = self.live();
        check(
            self.engine()
                .native()
                .player_set_track(lease.native(), kind, id),
            "select a track",
        )
    }

    /// Turn video on by selecting its first track, or off.
    pub fn set_video_track_enabled(&self, enabled: bool) -> Result<()> {
        if !enabled {
            return self.set_track(PlayerTrackKind::Video, -1);
        }
        if self.current_track(PlayerTrackKind::Video).is_some() {
            return Ok(());
        }

        let first = self
            .tracks(PlayerTrackKind::Video)
            .and_then(|tracks| tracks.into_iter().find(|t| t.id != -1));
        match first {
            Some(t) => self.set_track(PlayerTrackKind::Video, t.id),
            None => Ok(()),
        }
    }

    /// The current media's first video track, if video is playing.
    pub fn current_video_track(&self) -> Option<Track> {
        self.current_track(PlayerTrackKind::Video)?;
        let media = self.media()?;
        let tracks = media.tracks()?;
        tracks.iter().find(|t| t.video().is_some()).cloned()
    }

    /// In microseconds.
    pub fn audio_delay(&self) -> i64 {
        self.delay(PlayerTrackKind::Audio)
    }

    pub fn set_audio_delay(&self, delay: i64) -> Result<()> {
        self.set_delay(PlayerTrackKind::Audio, delay)
    }

    /// In microseconds.
    pub fn spu_delay(&self) -> i64 {
        self.delay(PlayerTrackKind::Spu)
    }

    pub fn set_spu_delay(&self, delay: i64) -> Result<()> {
        self.set_delay(PlayerTrackKind::Spu, delay)
    }

    fn delay(&self, kind: PlayerTrackKind) -> i64 {
        self.inner
            .lease()
            .map_or(0, |l| self.engine().native().player_delay(l.native(), kind))
    }

    fn set_delay(&self, kind: PlayerTrackKind, delay: i64) -> Result<()> {
        let lease = self.live();
        check(
            self.engine()
                .native()
                .player_set_delay(lease.native(), kind, delay),
            "set a delay",
        )
    }

    pub fn titles(&self) -> Option<Vec<Title>> {
        let lease = self.inner.lease()?;
        self.engine().native().player_titles(lease.native())
    }

    pub fn chapters(&self, title: i32) -> Option<Vec<Chapter>> {
        let lease = self.inner.lease()?;
        self.engine().native().player_chapters(lease.native(), title)
    }

    pub fn title(&self) -> i32 {
        let lease = self.live();
        self.engine().native().player_title(lease.native())
    }

    pub fn set_title(&self, title: i32) {
        let lease = self.live();
        self.engine().native().player_set_title(lease.native(), title);
    }

    pub fn chapter(&self) -> i32 {
        let lease = self.live();
        self.engine().native().player_chapter(lease.native())
    }

    pub fn set_chapter(&self, chapter: i32) {
        let lease = self.live();
        self.engine()
            .native()
            .player_set_chapter(lease.native(), chapter);
    }

    /// 0 means fit to the window.
    pub fn scale(&self) -> f32 {
        let lease = self.live();
        self.engine().native().player_scale(lease.native())
    }

    pub fn set_scale(&self, scale: f32) {
        let lease = self.live();
        self.engine().native().player_set_scale(lease.native(), scale);
    }

    pub fn aspect_ratio(&self) -> Option<String> {
        let lease = self.inner.lease()?;
        self.engine().native().player_aspect_ratio(lease.native())
    }

    /// `None` goes back to the source's own aspect ratio.
    pub fn set_aspect_ratio(&self, aspect: Option<&str>) {
        let lease = self.live();
        self.engine()
            .native()
            .player_set_aspect_ratio(lease.native(), aspect);
    }

    pub fn add_slave(&self, kind: SlaveKind, uri: &str, select: bool) -> Result<()> {
        let lease = self.live();
        check(
            self.engine()
                .native()
                .player_add_slave(lease.native(), kind, uri, select),
            "add a slave",
        )
    }

    #[track_caller]
    pub fn set_event_listener(
        &self,
        listener: impl Listener<PlayerEvent>,
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

impl std::fmt::Debug for MediaPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaPlayer")
            .field("handle", &self.inner)
            .finish_non_exhaustive()
    }
}
