use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;

use media_proxy::testing::FakeEngine;
use media_proxy::*;

fn setup() -> (Arc<FakeEngine>, Engine) {
    let _ = env_logger::builder().is_test(true).try_init();
    let fake = FakeEngine::new();
    let engine = fake.engine();
    (fake, engine)
}

fn listen(player: &MediaPlayer) -> Arc<Mutex<Vec<PlayerEvent>>> {
    let seen = Arc::new(Mutex::new(vec![]));
    let pushing = seen.clone();
    player.set_event_listener(
        move |e: &PlayerEvent| pushing.lock().unwrap().push(e.clone()),
        inline(),
    );
    seen
}

#[test]
fn players_hold_their_media() {
    let (fake, engine) = setup();
    let media = Media::new_path(&engine, "/music/a.ogg").unwrap();
    let media_id = media.native_id().unwrap();

    let player = MediaPlayer::with_media(&engine, &media).unwrap();
    let player_id = player.native_id().unwrap();
    assert_eq!(player.media(), Some(media.clone()));
    assert_eq!(fake.player(player_id).media, Some(media_id));
    assert_eq!(fake.refs(media_id), 2);

    std::mem::drop(media);
    assert_eq!(fake.refs(media_id), 2);

    player.set_media(None);
    assert_eq!(player.media(), None);
    assert!(fake.is_released(media_id));

    player.release();
    assert_eq!(fake.live_objects(), 0);
}

#[test]
fn replacing_the_media_releases_the_old_one() {
    let (fake, engine) = setup();
    let player = MediaPlayer::new(&engine).unwrap();
    let first = Media::new_path(&engine, "/music/a.ogg").unwrap();
    let first_id = first.native_id().unwrap();
    let second = Media::new_path(&engine, "/music/b.ogg").unwrap();

    player.set_media(Some(&first));
    std::mem::drop(first);
    player.set_media(Some(&second));
    assert!(fake.is_released(first_id));
    assert_eq!(player.media(), Some(second));

    std::mem::drop(player);
    assert_eq!(fake.live_objects(), 0);
}

#[test]
fn default_decoder_options_are_applied_once() {
    let (fake, engine) = setup();
    let media = Media::new_path(&engine, "/music/a.ogg").unwrap();
    let id = media.native_id().unwrap();

    let player = MediaPlayer::with_media(&engine, &media).unwrap();
    player.set_media(Some(&media));
    assert_eq!(fake.media(id).options, vec![":codec=all"]);

    let chosen = Media::new_path(&engine, "/music/b.ogg").unwrap();
    chosen.add_option(":codec=avcodec");
    player.set_media(Some(&chosen));
    assert_eq!(
        fake.media(chosen.native_id().unwrap()).options,
        vec![":codec=avcodec"]
    );
}

#[test]
fn default_decoder_options_can_be_turned_off() {
    let fake = FakeEngine::new();
    let engine = fake.engine_with(
        EngineConfigBuilder::default()
            .apply_default_media_options(false)
            .build()
            .unwrap(),
    );
    let media = Media::new_path(&engine, "/music/a.ogg").unwrap();
    let _player = MediaPlayer::with_media(&engine, &media).unwrap();
    assert!(fake.media(media.native_id().unwrap()).options.is_empty());
}

#[test]
fn audio_output_is_restored_after_stop() {
    let (fake, engine) = setup();
    let player = MediaPlayer::new(&engine).unwrap();
    let id = player.native_id().unwrap();

    player.play();
    assert!(player.is_play_requested());
    assert!(player.is_playing());
    assert!(fake.player(id).audio_outputs_set.is_empty());

    player.stop();
    assert!(!player.is_play_requested());
    player.play();
    // Nothing was chosen, so the configured output comes back.
    assert_eq!(fake.player(id).audio_outputs_set, vec!["default"]);
    assert!(fake.player(id).audio_devices_set.is_empty());

    player.set_audio_output("alsa").unwrap();
    player.set_audio_output_device("hw:1").unwrap();
    player.stop();
    player.play();
    player.play();
    let native = fake.player(id);
    assert_eq!(native.audio_outputs_set, vec!["default", "alsa", "alsa"]);
    assert_eq!(native.audio_devices_set, vec!["hw:1", "hw:1"]);
}

#[test]
fn refused_outputs_are_not_remembered() {
    let (fake, engine) = setup();
    let player = MediaPlayer::new(&engine).unwrap();
    let id = player.native_id().unwrap();

    fake.update_player(id, |p| p.accepts = false);
    assert!(player.set_audio_output("alsa").unwrap_err().is_operation_failed());
    fake.update_player(id, |p| p.accepts = true);

    player.play();
    player.stop();
    player.play();
    assert_eq!(fake.player(id).audio_outputs_set, vec!["default"]);
}

#[test]
fn refused_mutations_are_errors() {
    let (fake, engine) = setup();
    let player = MediaPlayer::new(&engine).unwrap();
    let id = player.native_id().unwrap();

    player.set_rate(1.5).unwrap();
    player.set_volume(80).unwrap();
    assert_eq!(player.rate(), 1.5);
    assert_eq!(player.volume(), Some(80));

    fake.update_player(id, |p| p.accepts = false);
    assert!(player.set_rate(2.0).unwrap_err().is_operation_failed());
    assert!(player.set_volume(10).unwrap_err().is_operation_failed());
    assert_eq!(player.rate(), 1.5);
}

#[test]
fn video_outputs_are_counted() {
    let (fake, engine) = setup();
    let player = MediaPlayer::new(&engine).unwrap();
    let id = player.native_id().unwrap();
    let seen = listen(&player);

    fake.emit(id, RawEvent::with_arg(PlayerEvent::VOUT, 2));
    assert_eq!(player.vout_count(), 2);
    fake.emit(id, RawEvent::new(PlayerEvent::END_REACHED));
    assert_eq!(player.vout_count(), 0);

    fake.emit(id, RawEvent::with_arg(PlayerEvent::VOUT, 1));
    fake.emit(id, RawEvent::new(PlayerEvent::MEDIA_CHANGED));
    assert_eq!(player.vout_count(), 0);

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            PlayerEvent::Vout { count: 2 },
            PlayerEvent::EndReached,
            PlayerEvent::Vout { count: 1 },
            PlayerEvent::MediaChanged,
        ]
    );
}

#[test]
fn notifications_are_translated() {
    let (fake, engine) = setup();
    let player = MediaPlayer::new(&engine).unwrap();
    let id = player.native_id().unwrap();
    let seen = listen(&player);

    fake.emit(id, RawEvent::with_float(PlayerEvent::BUFFERING, 42.0));
    fake.emit(id, RawEvent::with_arg(PlayerEvent::TIME_CHANGED, 1500));
    fake.emit(id, RawEvent::with_float(PlayerEvent::POSITION_CHANGED, 0.25));
    fake.emit(id, RawEvent::with_arg(PlayerEvent::SEEKABLE_CHANGED, 1));
    fake.emit(id, RawEvent::with_arg(PlayerEvent::PAUSABLE_CHANGED, 0));
    fake.emit(id, RawEvent::with_args(PlayerEvent::ES_ADDED, 0, 3));
    fake.emit(id, RawEvent::with_args(PlayerEvent::ES_SELECTED, 2, 4));
    fake.emit(id, RawEvent::with_args(PlayerEvent::ES_DELETED, 9, 5));
    fake.emit(id, RawEvent::new(0x1ff));

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            PlayerEvent::Buffering { cache: 42.0 },
            PlayerEvent::TimeChanged { time: 1500 },
            PlayerEvent::PositionChanged { position: 0.25 },
            PlayerEvent::SeekableChanged { seekable: true },
            PlayerEvent::PausableChanged { pausable: false },
            PlayerEvent::EsAdded {
                kind: TrackKind::Audio,
                id: 3
            },
            PlayerEvent::EsSelected {
                kind: TrackKind::Text,
                id: 4
            },
            PlayerEvent::EsDeleted {
                kind: TrackKind::Unknown,
                id: 5
            },
        ]
    );
}

#[test]
fn track_selection() {
    let (fake, engine) = setup();
    let player = MediaPlayer::new(&engine).unwrap();
    let id = player.native_id().unwrap();

    assert_eq!(player.current_track(PlayerTrackKind::Audio), None);
    assert_eq!(player.track_count(PlayerTrackKind::Audio), 0);

    fake.update_player(id, |p| {
        p.tracks.insert(
            PlayerTrackKind::Video,
            vec![
                TrackDescription {
                    id: -1,
                    name: "Disable".into(),
                },
                TrackDescription {
                    id: 7,
                    name: "Track 1".into(),
                },
            ],
        );
    });
    assert_eq!(player.track_count(PlayerTrackKind::Video), 2);

    player.set_video_track_enabled(true).unwrap();
    assert_eq!(player.current_track(PlayerTrackKind::Video), Some(7));

    player.set_video_track_enabled(false).unwrap();
    assert_eq!(player.current_track(PlayerTrackKind::Video), None);

    player.set_track(PlayerTrackKind::Spu, 3).unwrap();
    assert_eq!(player.current_track(PlayerTrackKind::Spu), Some(3));
}

#[test]
fn current_video_track_comes_from_the_media() {
    let (fake, engine) = setup();
    let media = Media::new_path(&engine, "/video/a.mkv").unwrap();
    let video = Track {
        codec: "h264".into(),
        original_codec: "avc1".into(),
        id: 1,
        profile: 100,
        level: 41,
        bitrate: 0,
        language: None,
        description: None,
        details: TrackDetails::Video(VideoDetails {
            width: 1920,
            height: 1080,
            ..Default::default()
        }),
    };
    fake.update_media(media.native_id().unwrap(), |m| {
        m.tracks = Some(vec![video.clone()])
    });

    let player = MediaPlayer::with_media(&engine, &media).unwrap();
    assert_eq!(player.current_video_track(), None);

    player.set_track(PlayerTrackKind::Video, 1).unwrap();
    assert_eq!(player.current_video_track(), Some(video));
}

#[test]
fn delays() {
    let (_fake, engine) = setup();
    let player = MediaPlayer::new(&engine).unwrap();

    player.set_audio_delay(-50_000).unwrap();
    player.set_spu_delay(1_000_000).unwrap();
    assert_eq!(player.audio_delay(), -50_000);
    assert_eq!(player.spu_delay(), 1_000_000);
}

#[test]
fn titles_and_chapters() {
    let (fake, engine) = setup();
    let player = MediaPlayer::new(&engine).unwrap();
    let id = player.native_id().unwrap();

    assert_eq!(player.chapters(0), None);
    fake.update_player(id, |p| {
        p.titles = vec![
            Title::new(1000, Some("Menu".into()), true, true),
            Title::new(90_000, None, false, false),
        ];
        p.chapters = vec![Chapter {
            time_offset: 0,
            duration: 90_000,
            name: None,
        }];
    });

    let titles = player.titles().unwrap();
    assert!(titles[0].is_menu());
    assert!(titles[0].is_interactive());
    assert!(!titles[1].is_menu());
    assert_eq!(player.chapters(1).unwrap().len(), 1);

    player.set_title(1);
    player.set_chapter(0);
    assert_eq!((player.title(), player.chapter()), (1, 0));
}

#[test]
fn video_geometry() {
    let (_fake, engine) = setup();
    let player = MediaPlayer::new(&engine).unwrap();

    player.set_scale(0.5);
    assert_eq!(player.scale(), 0.5);
    player.set_aspect_ratio(Some("16:9"));
    assert_eq!(player.aspect_ratio().as_deref(), Some("16:9"));
    player.set_aspect_ratio(None);
    assert_eq!(player.aspect_ratio(), None);
}

#[test]
fn player_slaves() {
    let (fake, engine) = setup();
    let player = MediaPlayer::new(&engine).unwrap();
    let id = player.native_id().unwrap();

    player
        .add_slave(SlaveKind::Subtitle, "file:///a.srt", true)
        .unwrap();
    assert_eq!(
        fake.player(id).slaves,
        vec![(SlaveKind::Subtitle, "file:///a.srt".to_string(), true)]
    );
}

#[test]
fn released_players_answer_neutrally() {
    let (fake, engine) = setup();
    let media = Media::new_path(&engine, "/music/a.ogg").unwrap();
    let media_id = media.native_id().unwrap();
    let player = MediaPlayer::with_media(&engine, &media).unwrap();
    let id = player.native_id().unwrap();
    let seen = listen(&player);

    let copy = player.clone();
    player.release();
    assert!(!copy.is_released());
    fake.emit(id, RawEvent::new(PlayerEvent::PLAYING));

    copy.release();
    assert!(fake.is_released(id));
    assert_eq!(fake.refs(media_id), 1);
    assert!(!fake.emit(id, RawEvent::new(PlayerEvent::PAUSED)));
    assert_eq!(*seen.lock().unwrap(), vec![PlayerEvent::Playing]);
}
