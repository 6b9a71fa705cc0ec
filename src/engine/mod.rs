// Engine module - face rig, playback and the viewer's rendering helpers

pub mod blendshape;
pub mod camera;
pub mod components;
pub mod debug_overlay;
pub mod deform;
pub mod face;
pub mod input;
pub mod mesh;
pub mod playback;
pub mod provider;
pub mod systems;
pub mod timer;
pub mod track;
pub mod viseme;

// Re-export commonly used items
pub use components::*;
pub use systems::frame_update;
