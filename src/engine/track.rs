// Animation tracks: the ordered per-frame weight sequence produced by a provider.
//
// TrackDocument is the wire shape (JSON). AnimationTrack is the validated,
// immutable form the playback controller owns:
//   - at least one frame
//   - fps > 0
//   - frame indices are 0, 1, 2, ... with no gaps
//   - every weight clamped into its documented range

use std::path::Path;
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::blendshape::BlendWeightSet;
use super::viseme::Phoneme;
use crate::error::{FaceError, Result};

/// One keyframe of a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationFrame {
    /// 0-based position in the track.
    #[serde(rename = "frame")]
    pub index: usize,
    /// Timestamp in seconds. Informational; playback is driven by index and fps.
    #[serde(default)]
    pub time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phoneme: Option<Phoneme>,
    /// RMS energy of the analysis window (audio-derived tracks only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<f32>,
    #[serde(default)]
    pub blendshapes: BlendWeightSet,
}

impl AnimationFrame {
    pub fn new(index: usize, blendshapes: BlendWeightSet) -> Self {
        Self { index, time: 0.0, phoneme: None, energy: None, blendshapes }
    }
}

/// Provider response as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackDocument {
    pub frames: Vec<AnimationFrame>,
    #[serde(default)]
    pub duration: f64,
    pub fps: u32,
    #[serde(default)]
    pub total_frames: usize,
}

impl TrackDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

/// Validated, immutable animation track.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationTrack {
    frames: Vec<AnimationFrame>,
    fps: u32,
    duration: f64,
}

impl AnimationTrack {
    /// Validate `frames` and build a track. Weights are clamped into range.
    pub fn new(mut frames: Vec<AnimationFrame>, fps: u32, duration: f64) -> Result<Self> {
        if frames.is_empty() {
            return Err(FaceError::EmptyTrack);
        }
        if fps == 0 {
            return Err(FaceError::InvalidFps(fps));
        }

        let mut clamped = 0usize;
        for (expected, frame) in frames.iter_mut().enumerate() {
            if frame.index != expected {
                return Err(FaceError::FrameIndexGap { expected, found: frame.index });
            }
            if !frame.blendshapes.is_in_range() {
                frame.blendshapes = frame.blendshapes.clamped();
                clamped += 1;
            }
        }
        if clamped > 0 {
            debug!("Clamped out-of-range weights in {clamped} frame(s)");
        }

        Ok(Self { frames, fps, duration })
    }

    /// Build a track where frame i holds `weights[i]`, timestamped at i/fps.
    pub fn from_weights(weights: impl IntoIterator<Item = BlendWeightSet>, fps: u32) -> Result<Self> {
        let frames: Vec<AnimationFrame> = weights
            .into_iter()
            .enumerate()
            .map(|(i, w)| AnimationFrame {
                time: i as f64 / f64::from(fps.max(1)),
                ..AnimationFrame::new(i, w)
            })
            .collect();
        let duration = frames.last().map_or(0.0, |f| f.time);
        Self::new(frames, fps, duration)
    }

    pub fn frames(&self) -> &[AnimationFrame] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&AnimationFrame> {
        self.frames.get(index)
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Number of frames. Always at least 1.
    pub fn total_frames(&self) -> usize {
        self.frames.len()
    }

    /// Declared duration in seconds. Informational only.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Time between frame increments: `floor(1000 / fps)` ms, at least 1 ms.
    pub fn frame_period(&self) -> Duration {
        Duration::from_millis(u64::from((1000 / self.fps).max(1)))
    }
}

impl TryFrom<TrackDocument> for AnimationTrack {
    type Error = FaceError;

    fn try_from(doc: TrackDocument) -> Result<Self> {
        if doc.total_frames != doc.frames.len() {
            warn!(
                "Track declares {} frames but carries {}; using the frame count",
                doc.total_frames,
                doc.frames.len()
            );
        }
        Self::new(doc.frames, doc.fps, doc.duration)
    }
}
