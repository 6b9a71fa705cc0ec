// Viseme-driven face animation.
//
// A playback controller steps through a precomputed blend-weight track at the
// track's fps; a deformation engine eases toward the active frame every render
// tick and displaces a procedural face mesh from its rest pose.

pub mod config;
pub mod engine;
pub mod error;

pub use config::AppConfig;
pub use engine::blendshape::{BlendWeightSet, Blendshape};
pub use engine::deform::DeformationEngine;
pub use engine::playback::{PlaybackController, PlaybackState};
pub use engine::track::{AnimationFrame, AnimationTrack, TrackDocument};
pub use error::{FaceError, Result};
