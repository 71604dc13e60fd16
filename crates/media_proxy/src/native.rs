//! The boundary with the native media engine.
//!
//! Objects are identified by [NativeId]s.  Constructors hand back an id owning one native reference, which the proxy
//! gives back through the matching `*_release` call exactly once.  Attribute reads return `None` when the engine can't
//! answer, and mutations report success as a `bool`; the proxies decide what a failure means to their callers.
//!
//! Notifications go to the [EventSink] registered with [NativeEngine::attach_events], from whatever thread the engine
//! likes.  The engine must stop calling a sink once the object behind it was released, and must not call it while
//! holding locks that calls into the engine from the sink would need, except for a media list's own lock, which the
//! engine holds while reporting list changes.
use std::sync::Weak;
use std::time::Duration;

use resource_proxy::{EventSink, NativeId};

use crate::media_info::*;
use crate::player::{Chapter, PlayerTrackKind, Title, TrackDescription};
use crate::renderer::{RendererInfo, RendererService};

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum NativeError {
    #[error("Unable to create {0}")]
    CreationFailed(&'static str),

    #[error("{0} is not supported by this engine")]
    Unsupported(&'static str),
}

pub type NativeResult<T> = Result<T, NativeError>;

pub trait MediaBackend {
    fn media_new_path(&self, path: &str) -> NativeResult<NativeId>;
    fn media_new_location(&self, location: &str) -> NativeResult<NativeId>;
    fn media_new_fd(&self, fd: i32) -> NativeResult<NativeId>;

    /// A new reference to the item at `index` of a list.  Only called with the list locked.
    fn media_new_from_list(&self, list: NativeId, index: usize) -> NativeResult<NativeId>;

    fn media_release(&self, media: NativeId);

    fn media_mrl(&self, media: NativeId) -> Option<String>;
    fn media_duration(&self, media: NativeId) -> Option<i64>;
    fn media_state(&self, media: NativeId) -> Option<MediaState>;
    fn media_type(&self, media: NativeId) -> Option<MediaType>;
    fn media_meta(&self, media: NativeId, meta: Meta) -> Option<String>;
    fn media_tracks(&self, media: NativeId) -> Option<Vec<Track>>;

    /// Parse synchronously.
    fn media_parse(&self, media: NativeId, flags: ParseFlags) -> bool;

    /// Start parsing; the outcome arrives as a parsed notification.
    fn media_parse_async(
        &self,
        media: NativeId,
        flags: ParseFlags,
        timeout: Option<Duration>,
    ) -> bool;

    fn media_add_option(&self, media: NativeId, option: &str);
    fn media_add_slave(&self, media: NativeId, slave: &Slave) -> bool;
    fn media_clear_slaves(&self, media: NativeId);
    fn media_slaves(&self, media: NativeId) -> Option<Vec<Slave>>;
    fn media_stats(&self, media: NativeId) -> Option<Stats>;
}

pub trait MediaListBackend {
    fn list_new(&self) -> NativeResult<NativeId>;

    /// The list of sub-items of a media.
    fn list_from_media(&self, media: NativeId) -> NativeResult<NativeId>;

    fn list_release(&self, list: NativeId);
    fn list_count(&self, list: NativeId) -> usize;

    /// Block until no one else holds the list's lock, then take it.
    fn list_lock(&self, list: NativeId);
    fn list_unlock(&self, list: NativeId);
}

pub trait PlayerBackend {
    fn player_new(&self) -> NativeResult<NativeId>;
    fn player_new_from_media(&self, media: NativeId) -> NativeResult<NativeId>;
    fn player_release(&self, player: NativeId);

    fn player_set_media(&self, player: NativeId, media: Option<NativeId>);
    fn player_play(&self, player: NativeId);
    fn player_stop(&self, player: NativeId);
    fn player_pause(&self, player: NativeId);
    fn player_set_pause(&self, player: NativeId, paused: bool);
    fn player_is_playing(&self, player: NativeId) -> bool;
    fn player_is_seekable(&self, player: NativeId) -> bool;

    fn player_time(&self, player: NativeId) -> Option<i64>;
    fn player_set_time(&self, player: NativeId, time: i64);
    fn player_position(&self, player: NativeId) -> Option<f32>;
    fn player_set_position(&self, player: NativeId, position: f32);
    fn player_length(&self, player: NativeId) -> Option<i64>;
    fn player_rate(&self, player: NativeId) -> f32;
    fn player_set_rate(&self, player: NativeId, rate: f32) -> bool;
    fn player_volume(&self, player: NativeId) -> Option<i32>;
    fn player_set_volume(&self, player: NativeId, volume: i32) -> bool;

    fn player_set_audio_output(&self, player: NativeId, output: &str) -> bool;
    fn player_set_audio_output_device(&self, player: NativeId, device: &str) -> bool;

    fn player_track_count(&self, player: NativeId, kind: PlayerTrackKind) -> Option<usize>;
    fn player_tracks(
        &self,
        player: NativeId,
        kind: PlayerTrackKind,
    ) -> Option<Vec<TrackDescription>>;

    /// The id of the selected track, or -1 if none is.
    fn player_current_track(&self, player: NativeId, kind: PlayerTrackKind) -> Option<i32>;
    fn player_set_track(&self, player: NativeId, kind: PlayerTrackKind, id: i32) -> bool;

    /// Delays are in microseconds.  Video tracks have none.
    fn player_delay(&self, player: NativeId, kind: PlayerTrackKind) -> i64;
    fn player_set_delay(&self, player: NativeId, kind: PlayerTrackKind, delay: i64) -> bool;

    fn player_titles(&self, player: NativeId) -> Option<Vec<Title>>;
    fn player_chapters(&self, player: NativeId, title: i32) -> Option<Vec<Chapter>>;
    fn player_title(&self, player: NativeId) -> i32;
    fn player_set_title(&self, player: NativeId, title: i32);
    fn player_chapter(&self, player: NativeId) -> i32;
    fn player_set_chapter(&self, player: NativeId, chapter: i32);

    fn player_scale(&self, player: NativeId) -> f32;
    fn player_set_scale(&self, player: NativeId, scale: f32);
    fn player_aspect_ratio(&self, player: NativeId) -> Option<String>;
    fn player_set_aspect_ratio(&self, player: NativeId, aspect: Option<&str>);
    fn player_add_slave(&self, player: NativeId, kind: SlaveKind, uri: &str, select: bool)
        -> bool;
}

pub trait RendererBackend {
    fn renderer_services(&self) -> Vec<RendererService>;

    fn discoverer_new(&self, name: &str) -> NativeResult<NativeId>;
    fn discoverer_release(&self, discoverer: NativeId);
    fn discoverer_start(&self, discoverer: NativeId) -> bool;
    fn discoverer_stop(&self, discoverer: NativeId);

    /// Take a reference to the renderer a discoverer notification named, with its description.
    fn renderer_item_hold(
        &self,
        discoverer: NativeId,
        reference: i64,
    ) -> Option<(NativeId, RendererInfo)>;
    fn renderer_item_release(&self, item: NativeId);
}

/// Everything a native engine provides.
pub trait NativeEngine:
    MediaBackend + MediaListBackend + PlayerBackend + RendererBackend + Send + Sync + 'static
{
    /// Start delivering notifications for `object` to `sink`.
    fn attach_events(&self, object: NativeId, sink: Weak<dyn EventSink>);
}
