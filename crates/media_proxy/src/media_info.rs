//! Plain data describing media, as the native engine reports it.

/// Metadata a media can carry.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Meta {
    Title,
    Artist,
    Genre,
    Copyright,
    Album,
    TrackNumber,
    Description,
    Rating,
    Date,
    Setting,
    Url,
    Language,
    NowPlaying,
    Publisher,
    EncodedBy,
    ArtworkUrl,
    TrackId,
    TrackTotal,
    Director,
    Season,
    Episode,
    ShowName,
    Actors,
    AlbumArtist,
    DiscNumber,
}

impl Meta {
    pub const COUNT: usize = 25;

    /// In native id order.
    pub const ALL: [Meta; Meta::COUNT] = [
        Meta::Title,
        Meta::Artist,
        Meta::Genre,
        Meta::Copyright,
        Meta::Album,
        Meta::TrackNumber,
        Meta::Description,
        Meta::Rating,
        Meta::Date,
        Meta::Setting,
        Meta::Url,
        Meta::Language,
        Meta::NowPlaying,
        Meta::Publisher,
        Meta::EncodedBy,
        Meta::ArtworkUrl,
        Meta::TrackId,
        Meta::TrackTotal,
        Meta::Director,
        Meta::Season,
        Meta::Episode,
        Meta::ShowName,
        Meta::Actors,
        Meta::AlbumArtist,
        Meta::DiscNumber,
    ];

    pub fn from_id(id: i64) -> Option<Meta> {
        usize::try_from(id)
            .ok()
            .and_then(|i| Meta::ALL.get(i))
            .copied()
    }

    pub fn id(self) -> usize {
        self as usize
    }
}

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum MediaState {
    NothingSpecial,
    Opening,
    Playing,
    Paused,
    Stopped,
    Ended,
    Error,
}

impl MediaState {
    pub fn from_raw(raw: i64) -> Option<MediaState> {
        Some(match raw {
            0 => MediaState::NothingSpecial,
            1 => MediaState::Opening,
            3 => MediaState::Playing,
            4 => MediaState::Paused,
            5 => MediaState::Stopped,
            6 => MediaState::Ended,
            7 => MediaState::Error,
            _ => return None,
        })
    }
}

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum MediaType {
    Unknown,
    File,
    Directory,
    Disc,
    Stream,
    Playlist,
}

/// The outcome the engine reports with a parsed notification.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum ParsedStatus {
    Skipped,
    Failed,
    Timeout,
    Done,
}

impl ParsedStatus {
    pub fn from_raw(raw: i64) -> Option<ParsedStatus> {
        Some(match raw {
            1 => ParsedStatus::Skipped,
            2 => ParsedStatus::Failed,
            3 => ParsedStatus::Timeout,
            4 => ParsedStatus::Done,
            _ => return None,
        })
    }
}

/// What parsing may do.  Combine with `|`.
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq, derive_more::BitOr)]
pub struct ParseFlags(u32);

impl ParseFlags {
    pub const PARSE_LOCAL: ParseFlags = ParseFlags(0);
    pub const PARSE_NETWORK: ParseFlags = ParseFlags(0x01);
    pub const FETCH_LOCAL: ParseFlags = ParseFlags(0x02);
    pub const FETCH_NETWORK: ParseFlags = ParseFlags(0x04);
    pub const DO_INTERACT: ParseFlags = ParseFlags(0x08);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: ParseFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum TrackKind {
    Unknown,
    Audio,
    Video,
    Text,
}

impl TrackKind {
    pub fn from_raw(raw: i64) -> TrackKind {
        match raw {
            0 => TrackKind::Audio,
            1 => TrackKind::Video,
            2 => TrackKind::Text,
            _ => TrackKind::Unknown,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VideoDetails {
    pub height: u32,
    pub width: u32,
    pub sar_num: u32,
    pub sar_den: u32,
    pub frame_rate_num: u32,
    pub frame_rate_den: u32,
    pub orientation: VideoOrientation,
    pub projection: VideoProjection,
}

#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub enum VideoOrientation {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    LeftTop,
    LeftBottom,
    RightTop,
    RightBottom,
}

#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub enum VideoProjection {
    #[default]
    Rectangular,
    EquiRectangular,
    CubemapLayoutStandard,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TrackDetails {
    Audio { channels: u32, rate: u32 },
    Video(VideoDetails),
    Text { encoding: Option<String> },
    Unknown,
}

/// One elementary stream of a media.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    pub codec: String,
    pub original_codec: String,
    pub id: i32,
    pub profile: i32,
    pub level: i32,
    pub bitrate: u32,
    pub language: Option<String>,
    pub description: Option<String>,
    pub details: TrackDetails,
}

impl Track {
    pub fn kind(&self) -> TrackKind {
        match self.details {
            TrackDetails::Audio { .. } => TrackKind::Audio,
            TrackDetails::Video(_) => TrackKind::Video,
            TrackDetails::Text { .. } => TrackKind::Text,
            TrackDetails::Unknown => TrackKind::Unknown,
        }
    }

    pub fn video(&self) -> Option<&VideoDetails> {
        match &self.details {
            TrackDetails::Video(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum SlaveKind {
    Subtitle,
    Audio,
}

/// An extra input played alongside a media.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Slave {
    pub kind: SlaveKind,
    /// From 0 to 4; higher wins.
    pub priority: u32,
    pub uri: String,
}

impl Slave {
    pub fn new(kind: SlaveKind, priority: u32, uri: impl Into<String>) -> Slave {
        Slave {
            kind,
            priority,
            uri: uri.into(),
        }
    }
}

/// Counters the engine keeps while a media plays.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stats {
    pub read_bytes: u64,
    pub input_bitrate: f32,
    pub demux_read_bytes: u64,
    pub demux_bitrate: f32,
    pub demux_corrupted: u64,
    pub demux_discontinuity: u64,
    pub decoded_video: u64,
    pub decoded_audio: u64,
    pub displayed_pictures: u64,
    pub lost_pictures: u64,
    pub played_audio_buffers: u64,
    pub lost_audio_buffers: u64,
    pub sent_packets: u64,
    pub sent_bytes: u64,
    pub send_bitrate: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_ids_round_trip() {
        for (i, m) in Meta::ALL.iter().enumerate() {
            assert_eq!(m.id(), i);
            assert_eq!(Meta::from_id(i as i64), Some(*m));
        }
        assert_eq!(Meta::from_id(-1), None);
        assert_eq!(Meta::from_id(Meta::COUNT as i64), None);
    }

    #[test]
    fn parse_flags_combine() {
        let flags = ParseFlags::PARSE_NETWORK | ParseFlags::FETCH_LOCAL;
        assert_eq!(flags.bits(), 3);
        assert!(flags.contains(ParseFlags::FETCH_LOCAL));
        assert!(!flags.contains(ParseFlags::DO_INTERACT));
    }

    #[test]
    fn state_two_is_not_a_state() {
        assert_eq!(MediaState::from_raw(2), None);
        assert_eq!(MediaState::from_raw(7), Some(MediaState::Error));
    }
}
