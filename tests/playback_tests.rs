// Playback controller driven on its virtual clock, from the outside.

use std::time::Duration;

use viseme_face::engine::viseme::Phoneme;
use viseme_face::{AnimationTrack, BlendWeightSet, FaceError, PlaybackController, PlaybackState, TrackDocument};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn jaw_track(values: &[f32], fps: u32) -> AnimationTrack {
    let weights = values
        .iter()
        .map(|&v| BlendWeightSet { jaw_open: v, ..BlendWeightSet::NEUTRAL });
    AnimationTrack::from_weights(weights, fps).unwrap()
}

#[test]
fn three_frames_at_30_fps_play_through_and_stop() {
    let mut c = PlaybackController::new();
    c.load_track(jaw_track(&[0.0, 0.7, 0.0], 30));
    c.toggle_play();
    assert!(c.is_playing());

    c.update(ms(32));
    assert_eq!(c.current_frame(), 0);

    c.update(ms(1));
    assert_eq!(c.clock(), ms(33));
    assert_eq!(c.current_frame(), 1);
    assert_eq!(c.active_weights(), BlendWeightSet { jaw_open: 0.7, ..BlendWeightSet::NEUTRAL });

    c.update(ms(33));
    assert_eq!(c.clock(), ms(66));
    assert_eq!(c.current_frame(), 2);
    assert!(c.is_playing());

    c.update(ms(33));
    assert_eq!(
        c.playback_state(),
        PlaybackState { current_frame: 2, total_frames: 3, is_playing: false }
    );
    assert!(!c.has_pending_tick());

    // Stays stopped on the last frame, no wrap.
    c.update(ms(1000));
    assert_eq!(c.current_frame(), 2);
}

#[test]
fn a_large_time_step_catches_up_frame_by_frame() {
    let mut c = PlaybackController::new();
    c.load_track(jaw_track(&[0.0; 10], 30));
    c.toggle_play();

    c.update(ms(33 * 4 + 10));
    assert_eq!(c.current_frame(), 4);
    assert!(c.is_playing());
}

#[test]
fn replacing_the_track_mid_play_stops_at_frame_zero() {
    let mut c = PlaybackController::new();
    c.load_track(jaw_track(&[0.1; 10], 30));
    c.toggle_play();
    c.update(ms(100));
    assert_eq!(c.current_frame(), 3);

    c.load_track(jaw_track(&[0.5; 4], 10));
    assert_eq!(c.current_frame(), 0);
    assert!(!c.is_playing());
    assert!(!c.has_pending_tick());

    // No tick from the old chain survives the swap.
    c.update(ms(1000));
    assert_eq!(c.current_frame(), 0);
    assert_eq!(c.active_weights().jaw_open, 0.5);

    c.toggle_play();
    c.update(ms(100));
    assert_eq!(c.current_frame(), 1);
}

#[test]
fn pause_then_resume_continues_from_the_held_frame() {
    let mut c = PlaybackController::new();
    c.load_track(jaw_track(&[0.0; 6], 30));
    c.toggle_play();
    c.update(ms(66));
    assert_eq!(c.current_frame(), 2);

    c.toggle_play();
    c.update(ms(500));
    assert_eq!(c.current_frame(), 2);

    c.toggle_play();
    c.update(ms(33));
    assert_eq!(c.current_frame(), 3);
}

#[test]
fn seek_while_playing_restarts_the_period_from_the_new_frame() {
    let mut c = PlaybackController::new();
    c.load_track(jaw_track(&[0.0; 10], 30));
    c.toggle_play();
    c.update(ms(20));
    c.seek(5);
    assert_eq!(c.current_frame(), 5);

    // The old tick at t=33 was replaced by one at t=53.
    c.update(ms(13));
    assert_eq!(c.current_frame(), 5);
    c.update(ms(20));
    assert_eq!(c.current_frame(), 6);
}

#[test]
fn controls_without_a_track_are_no_ops() {
    let mut c = PlaybackController::new();
    c.toggle_play();
    c.seek(4);
    c.reset();
    c.update(ms(1000));
    assert_eq!(c.playback_state(), PlaybackState::default());
    assert_eq!(c.target_weights(), None);
    assert_eq!(c.active_weights(), BlendWeightSet::NEUTRAL);
}

#[test]
fn document_with_a_gap_is_rejected_and_unloads() {
    let mut c = PlaybackController::new();
    c.load_track(jaw_track(&[0.2; 3], 30));

    let doc = TrackDocument::from_json(
        r#"{"frames": [{"frame": 0, "blendshapes": {}}, {"frame": 2, "blendshapes": {}}], "fps": 30}"#,
    )
    .unwrap();
    let err = c.load_document(doc).unwrap_err();
    assert!(matches!(err, FaceError::FrameIndexGap { expected: 1, found: 2 }));
    assert!(!c.is_loaded());
    assert_eq!(c.playback_state().total_frames, 0);
}

#[test]
fn document_weights_are_clamped_on_load() {
    let mut c = PlaybackController::new();
    let doc = TrackDocument::from_json(
        r#"{"frames": [{"frame": 0, "phoneme": "AA", "blendshapes": {"jawOpen": 3.0, "mouthSmile": -1.0}}], "fps": 30, "total_frames": 1}"#,
    )
    .unwrap();
    c.load_document(doc).unwrap();

    let w = c.active_weights();
    assert_eq!(w.jaw_open, 0.7);
    assert_eq!(w.mouth_smile, 0.0);
}

fn load_single_frame(phoneme: &str) -> PlaybackController {
    let json = format!(
        r#"{{"frames": [{{"frame": 0, "phoneme": "{phoneme}", "blendshapes": {{"jawOpen": 0.3}}}}], "fps": 30, "total_frames": 1}}"#
    );
    let mut c = PlaybackController::new();
    c.load_document(TrackDocument::from_json(&json).unwrap()).unwrap();
    c
}

#[test]
fn unknown_phoneme_label_still_loads_as_silence() {
    let c = load_single_frame("HH");
    assert!(c.is_loaded());
    let frame = c.track().unwrap().frame(0).unwrap();
    assert_eq!(frame.phoneme, Some(Phoneme::Sil));
    // The label is informational: weights come from the document, not the viseme table.
    assert_eq!(c.active_weights().jaw_open, 0.3);
}

#[test]
fn lower_case_phoneme_label_is_accepted() {
    let c = load_single_frame("aa");
    assert!(c.is_loaded());
    assert_eq!(c.track().unwrap().frame(0).unwrap().phoneme, Some(Phoneme::Aa));
}
