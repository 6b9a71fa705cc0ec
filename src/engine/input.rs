// Input state tracking for keyboard and mouse
// Abstracts winit events into a queryable per-frame snapshot

use std::collections::HashSet;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

pub struct InputState {
    // Keyboard: pressed this frame (edge-triggered), cleared in end_frame()
    keys_pressed: HashSet<KeyCode>,

    // Mouse
    pub mouse_position: (f32, f32),
    mouse_prev_position: (f32, f32),
    pub mouse_delta: (f32, f32),
    buttons_held: HashSet<MouseButton>,

    // Scroll: accumulated vertical scroll this frame, reset in end_frame()
    pub scroll_delta: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            keys_pressed: HashSet::new(),
            mouse_position: (0.0, 0.0),
            mouse_prev_position: (0.0, 0.0),
            mouse_delta: (0.0, 0.0),
            buttons_held: HashSet::new(),
            scroll_delta: 0.0,
        }
    }

    /// Feed a winit WindowEvent into the input state.
    pub fn process_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    if event.state == ElementState::Pressed && !event.repeat {
                        self.keys_pressed.insert(key);
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                match state {
                    ElementState::Pressed => { self.buttons_held.insert(*button); }
                    ElementState::Released => { self.buttons_held.remove(button); }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse_position = (position.x as f32, position.y as f32);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
                self.scroll_delta += y;
            }
            WindowEvent::Focused(false) => {
                self.buttons_held.clear();
            }
            _ => {}
        }
    }

    /// Feed an event the UI has already seen. Events the UI consumed are
    /// dropped, except button releases and focus loss, so a drag that ends
    /// over a panel still lets go of the button.
    pub fn process_event_behind_ui(&mut self, event: &WindowEvent, consumed: bool) {
        let always = matches!(
            event,
            WindowEvent::MouseInput { state: ElementState::Released, .. } | WindowEvent::Focused(false)
        );
        if !consumed || always {
            self.process_event(event);
        }
    }

    /// Call once per frame after update() and render() have consumed input.
    /// Resets per-frame accumulators.
    pub fn end_frame(&mut self) {
        self.scroll_delta = 0.0;
        self.keys_pressed.clear();
        self.mouse_delta = (
            self.mouse_position.0 - self.mouse_prev_position.0,
            self.mouse_position.1 - self.mouse_prev_position.1,
        );
        self.mouse_prev_position = self.mouse_position;
    }

    pub fn was_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn is_button_held(&self, button: MouseButton) -> bool {
        self.buttons_held.contains(&button)
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}
