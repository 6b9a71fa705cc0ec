// Viewer configuration.
// Every section is #[serde(default)], so a JSON file only needs the fields it
// wants to override.

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::engine::deform::DEFAULT_SMOOTHING;
use crate::engine::face::FaceParams;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub animation: AnimationConfig,
    pub face: FaceParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Viseme Face".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Frame rate requested from the provider.
    pub fps: u32,
    /// Per-render-tick smoothing factor of the deformation engine.
    pub smoothing: f32,
    /// Sample rate assumed for raw PCM input.
    pub sample_rate: u32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            smoothing: DEFAULT_SMOOTHING,
            sample_rate: 16000,
        }
    }
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = Self::from_json(&std::fs::read_to_string(path)?)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
