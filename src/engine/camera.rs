// Orbit camera around the face.
//
// Camera model:
//   - Looks at a fixed target point (the head centre)
//   - Yaw/pitch orbit driven by left-mouse drag
//   - Zoom by adjusting distance with the mouse wheel
//   - Arrow keys are left to playback, so the camera only reads the mouse

use glam::{Mat4, Vec3};
use super::input::InputState;
use winit::event::MouseButton;

pub struct OrbitCamera {
    pub target: Vec3,

    /// Distance from target. Always clamped to [min_distance, max_distance] in update().
    distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,

    /// Elevation angle in radians (0 = level with target)
    pitch: f32,
    pub max_pitch: f32,

    /// Horizontal rotation in radians (0 = looking at the face from +Z)
    yaw: f32,

    /// Vertical field of view in radians
    pub fov: f32,
    pub near: f32,
    pub far: f32,

    /// Radians of rotation per pixel of drag
    pub orbit_speed: f32,

    /// Zoom change (in distance units) per scroll line
    pub zoom_speed: f32,
}

impl OrbitCamera {
    pub fn new() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 4.0,
            min_distance: 1.8,
            max_distance: 12.0,
            pitch: 0.0,
            max_pitch: 80.0_f32.to_radians(),
            yaw: 0.0,
            fov: 40.0_f32.to_radians(),
            near: 0.05,
            far: 100.0,
            orbit_speed: 0.008,
            zoom_speed: 0.4,
        }
    }

    /// Update orbit and zoom from input. Call once per frame before rendering.
    pub fn update(&mut self, input: &InputState) {
        if input.is_button_held(MouseButton::Left) {
            let (dx, dy) = input.mouse_delta;
            self.yaw -= dx * self.orbit_speed;
            self.pitch += dy * self.orbit_speed;
        }
        self.pitch = self.pitch.clamp(-self.max_pitch, self.max_pitch);

        // Zoom: scroll up (positive delta) zooms in (decreases distance)
        self.distance -= input.scroll_delta * self.zoom_speed;
        self.distance = self.distance.clamp(self.min_distance, self.max_distance);
    }

    /// World-space position of the camera eye.
    pub fn camera_position(&self) -> Vec3 {
        self.target + self.eye_offset()
    }

    /// View matrix: looks from the camera eye toward the target.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.camera_position(), self.target, Vec3::Y)
    }

    /// Perspective projection matrix.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
    }

    /// Combined view-projection matrix ready to upload to the GPU.
    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    pub fn distance(&self) -> f32 { self.distance }
    pub fn yaw(&self) -> f32 { self.yaw }
    pub fn pitch(&self) -> f32 { self.pitch }

    // Offset from target to camera eye based on pitch, yaw, and distance.
    fn eye_offset(&self) -> Vec3 {
        Vec3::new(
            self.yaw.sin() * self.pitch.cos() * self.distance,
            self.pitch.sin() * self.distance,
            self.yaw.cos() * self.pitch.cos() * self.distance,
        )
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new()
    }
}
