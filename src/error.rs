// Crate-wide error type.
// Everything fallible in the library returns crate::Result; the playback and
// deformation paths themselves degrade silently and only log.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FaceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("animation track has no frames")]
    EmptyTrack,

    #[error("invalid frame rate: {0} (must be positive)")]
    InvalidFps(u32),

    #[error("frame index gap: expected {expected}, found {found}")]
    FrameIndexGap { expected: usize, found: usize },

    #[error("audio error: {0}")]
    Audio(String),

    #[error("mesh topology changed: baseline has {baseline} vertices, mesh has {mesh}")]
    TopologyMismatch { baseline: usize, mesh: usize },
}

pub type Result<T> = std::result::Result<T, FaceError>;
