// Playback controller: frame index + play/pause state over one AnimationTrack.
//
// State machine:
//   Stopped --toggle_play--> Playing --toggle_play/reset/end of track--> Stopped
//
// While Playing exactly one tick is pending on the TickTimer. Each tick either
// increments the frame and re-arms the timer, or (at the last frame) stops
// without wrapping. Every path into Stopped cancels the pending tick, and loading
// or unloading a track always lands in Stopped at frame 0.

use std::time::Duration;

use bevy_ecs::prelude::*;
use log::{debug, info, warn};

use super::blendshape::BlendWeightSet;
use super::timer::{FiredTick, TickTimer};
use super::track::{AnimationTrack, TrackDocument};
use crate::error::Result;

/// Snapshot for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackState {
    pub current_frame: usize,
    /// 0 when no track is loaded.
    pub total_frames: usize,
    pub is_playing: bool,
}

#[derive(Resource, Debug, Default)]
pub struct PlaybackController {
    track: Option<AnimationTrack>,
    current_frame: usize,
    is_playing: bool,
    timer: TickTimer,
}

impl PlaybackController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the loaded track. Any in-flight playback is discarded.
    pub fn load_track(&mut self, track: AnimationTrack) {
        self.stop_and_rewind();
        self.timer.set_period(track.frame_period());
        info!(
            "Loaded track: {} frames @ {} fps ({:.2}s)",
            track.total_frames(),
            track.fps(),
            track.duration()
        );
        self.track = Some(track);
    }

    /// Validate and load a provider document. An invalid document leaves the
    /// controller with no track loaded; the error is returned for reporting.
    pub fn load_document(&mut self, doc: TrackDocument) -> Result<()> {
        match AnimationTrack::try_from(doc) {
            Ok(track) => {
                self.load_track(track);
                Ok(())
            }
            Err(e) => {
                warn!("Rejected animation track: {e}");
                self.unload();
                Err(e)
            }
        }
    }

    /// Drop the track (teardown). Cancels any pending tick.
    pub fn unload(&mut self) {
        self.stop_and_rewind();
        self.track = None;
    }

    pub fn track(&self) -> Option<&AnimationTrack> {
        self.track.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.track.is_some()
    }

    pub fn toggle_play(&mut self) {
        if self.track.is_none() {
            debug!("toggle_play ignored: no track loaded");
            return;
        }
        if self.is_playing {
            self.pause();
        } else {
            self.is_playing = true;
            self.timer.start();
        }
    }

    /// Stop and keep the current frame.
    pub fn pause(&mut self) {
        self.is_playing = false;
        self.timer.cancel();
    }

    /// Stop and rewind to frame 0. Idempotent.
    pub fn reset(&mut self) {
        self.stop_and_rewind();
    }

    /// Jump to `frame`, clamped to the track. While playing, the tick chain
    /// restarts from here.
    pub fn seek(&mut self, frame: usize) {
        let Some(track) = &self.track else {
            debug!("seek ignored: no track loaded");
            return;
        };
        let last = track.total_frames() - 1;
        if frame > last {
            debug!("seek to {frame} clamped to {last}");
        }
        self.current_frame = frame.min(last);
        if self.is_playing {
            self.timer.start();
        }
    }

    /// Advance the controller's clock by `dt`, running every tick that comes due.
    pub fn update(&mut self, dt: Duration) {
        self.timer.advance(dt);
        while let Some(fired) = self.timer.poll() {
            self.tick(fired);
        }
    }

    fn tick(&mut self, fired: FiredTick) {
        let Some(track) = &self.track else {
            self.pause();
            return;
        };
        if self.current_frame + 1 >= track.total_frames() {
            debug!("Reached last frame {}, stopping", self.current_frame);
            self.is_playing = false;
            return;
        }
        self.current_frame += 1;
        self.timer.reschedule(fired);
    }

    fn stop_and_rewind(&mut self) {
        self.is_playing = false;
        self.current_frame = 0;
        self.timer.cancel();
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// True while a tick is scheduled.
    pub fn has_pending_tick(&self) -> bool {
        self.timer.is_pending()
    }

    /// Elapsed time on the controller's own clock.
    pub fn clock(&self) -> Duration {
        self.timer.now()
    }

    pub fn playback_state(&self) -> PlaybackState {
        PlaybackState {
            current_frame: self.current_frame,
            total_frames: self.track.as_ref().map_or(0, AnimationTrack::total_frames),
            is_playing: self.is_playing,
        }
    }

    /// Weights of the current frame, or `None` with no track loaded.
    pub fn target_weights(&self) -> Option<BlendWeightSet> {
        self.track
            .as_ref()
            .and_then(|t| t.frame(self.current_frame))
            .map(|f| f.blendshapes)
    }

    /// Weights of the current frame, neutral if there is none.
    pub fn active_weights(&self) -> BlendWeightSet {
        self.target_weights().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaceError;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn jaw(v: f32) -> BlendWeightSet {
        BlendWeightSet { jaw_open: v, ..BlendWeightSet::NEUTRAL }
    }

    fn ramp(n: usize, fps: u32) -> AnimationTrack {
        AnimationTrack::from_weights((0..n).map(|i| jaw(i as f32 * 0.01)), fps).unwrap()
    }

    #[test]
    fn starts_stopped_at_zero() {
        let c = PlaybackController::new();
        assert_eq!(c.playback_state(), PlaybackState::default());
        assert_eq!(c.active_weights(), BlendWeightSet::NEUTRAL);
    }

    #[test]
    fn plays_every_frame_in_order_then_stops() {
        let mut c = PlaybackController::new();
        c.load_track(ramp(10, 30));
        c.toggle_play();

        let mut seen = vec![c.current_frame()];
        for _ in 0..20 {
            c.update(ms(33));
            if seen.last() != Some(&c.current_frame()) {
                seen.push(c.current_frame());
            }
        }
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        assert!(!c.is_playing());
        assert_eq!(c.current_frame(), 9);
        assert!(!c.has_pending_tick());
    }

    #[test]
    fn one_increment_per_period() {
        let mut c = PlaybackController::new();
        c.load_track(ramp(10, 10));
        c.toggle_play();
        c.update(ms(99));
        assert_eq!(c.current_frame(), 0);
        c.update(ms(1));
        assert_eq!(c.current_frame(), 1);
        // a long stall catches up without skipping any increment
        c.update(ms(300));
        assert_eq!(c.current_frame(), 4);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut c = PlaybackController::new();
        c.load_track(ramp(5, 30));
        c.toggle_play();
        c.update(ms(70));
        c.reset();
        let once = c.playback_state();
        c.reset();
        assert_eq!(c.playback_state(), once);
        assert_eq!(once, PlaybackState { current_frame: 0, total_frames: 5, is_playing: false });
        c.update(ms(1000));
        assert_eq!(c.current_frame(), 0);
    }

    #[test]
    fn seek_returns_exact_frame_weights() {
        let track = ramp(8, 30);
        let mut c = PlaybackController::new();
        c.load_track(track.clone());
        for k in 0..8 {
            c.seek(k);
            assert_eq!(c.active_weights(), track.frame(k).unwrap().blendshapes);
        }
    }

    #[test]
    fn seek_is_clamped() {
        let mut c = PlaybackController::new();
        c.load_track(ramp(4, 30));
        c.seek(100);
        assert_eq!(c.current_frame(), 3);
    }

    #[test]
    fn seek_while_playing_restarts_chain() {
        let mut c = PlaybackController::new();
        c.load_track(ramp(10, 10));
        c.toggle_play();
        c.update(ms(90));
        c.seek(5);
        c.update(ms(90));
        assert_eq!(c.current_frame(), 5);
        c.update(ms(10));
        assert_eq!(c.current_frame(), 6);
    }

    #[test]
    fn pause_keeps_frame_and_cancels_tick() {
        let mut c = PlaybackController::new();
        c.load_track(ramp(10, 10));
        c.toggle_play();
        c.update(ms(200));
        c.toggle_play();
        assert!(!c.has_pending_tick());
        c.update(ms(1000));
        assert_eq!(c.current_frame(), 2);
    }

    #[test]
    fn loading_new_track_cancels_old_chain() {
        let mut c = PlaybackController::new();
        c.load_track(ramp(10, 30));
        c.toggle_play();
        c.update(ms(66));
        assert_eq!(c.current_frame(), 2);

        c.load_track(ramp(6, 30));
        assert_eq!(c.playback_state(), PlaybackState { current_frame: 0, total_frames: 6, is_playing: false });
        c.update(ms(1000));
        assert_eq!(c.current_frame(), 0);
        assert!(!c.is_playing());
    }

    #[test]
    fn invalid_document_unloads() {
        let mut c = PlaybackController::new();
        c.load_track(ramp(3, 30));
        let doc = TrackDocument { frames: vec![], duration: 0.0, fps: 30, total_frames: 0 };
        assert!(matches!(c.load_document(doc), Err(FaceError::EmptyTrack)));
        assert!(!c.is_loaded());
        assert_eq!(c.target_weights(), None);
        c.toggle_play();
        assert!(!c.is_playing());
    }

    #[test]
    fn toggle_at_last_frame_stops_without_wrapping() {
        let mut c = PlaybackController::new();
        c.load_track(ramp(3, 30));
        c.seek(2);
        c.toggle_play();
        assert!(c.is_playing());
        c.update(ms(33));
        assert!(!c.is_playing());
        assert_eq!(c.current_frame(), 2);
    }
}
