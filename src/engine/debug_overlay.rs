use egui::epaint::Shadow;

use super::blendshape::{BlendWeightSet, Blendshape};
use super::playback::PlaybackState;
use super::viseme::Phoneme;

pub struct DebugStats {
    pub fps: u32,
    pub frame_time_avg_ms: f32,
    pub frame_time_min_ms: f32,
    pub frame_time_max_ms: f32,
    /// Time spent in the last deformation pass (ms).
    pub deform_ms: f32,
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub resolution: (u32, u32),
    pub camera_distance: f32,
}

/// Read-only playback data shown by the panel, gathered before the egui pass.
pub struct PanelView {
    pub state: PlaybackState,
    pub track_fps: u32,
    pub phoneme: Option<Phoneme>,
    /// Weights of the current frame.
    pub active: BlendWeightSet,
    /// Weights the engine is actually displaying.
    pub smoothed: BlendWeightSet,
}

/// What the user asked for this frame. Applied by the caller after rendering.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PanelActions {
    pub toggle_play: bool,
    pub reset: bool,
    pub seek: Option<usize>,
    pub animate_text: Option<String>,
}

pub struct DebugOverlay {
    /// F3 stats panel.
    pub stats_visible: bool,
    text_input: String,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl DebugOverlay {
    pub fn new(
        window: &winit::window::Window,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        initial_text: &str,
    ) -> Self {
        let egui_ctx = egui::Context::default();

        // Style: dark, semi-transparent, small monospace white font
        let mut visuals = egui::Visuals::dark();
        visuals.window_fill = egui::Color32::from_rgba_premultiplied(0, 0, 0, 180);
        visuals.window_stroke = egui::Stroke::NONE;
        visuals.window_shadow = Shadow::NONE;
        visuals.override_text_color = Some(egui::Color32::WHITE);
        egui_ctx.set_visuals(visuals);

        let mut style = (*egui_ctx.style()).clone();
        style.override_font_id = Some(egui::FontId::monospace(13.0));
        egui_ctx.set_style(style);

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let egui_renderer = egui_wgpu::Renderer::new(
            device,
            surface_format,
            None,  // no depth
            1,     // msaa samples
            false, // no dithering
        );

        Self {
            stats_visible: false,
            text_input: initial_text.to_string(),
            egui_ctx,
            egui_state,
            egui_renderer,
        }
    }

    pub fn toggle_stats(&mut self) {
        self.stats_visible = !self.stats_visible;
    }

    /// True while a text field has focus; keyboard shortcuts should stand down.
    pub fn wants_keyboard(&self) -> bool {
        self.egui_ctx.wants_keyboard_input()
    }

    pub fn handle_window_event(
        &mut self,
        window: &winit::window::Window,
        event: &winit::event::WindowEvent,
    ) -> egui_winit::EventResponse {
        self.egui_state.on_window_event(window, event)
    }

    /// Render one egui frame: the playback panel, plus the stats panel when
    /// `stats` is `Some`. Returns the actions the user triggered.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        window: &winit::window::Window,
        view: &wgpu::TextureView,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
        panel: &PanelView,
        stats: Option<&DebugStats>,
    ) -> PanelActions {
        let raw_input = self.egui_state.take_egui_input(window);
        let mut actions = PanelActions::default();
        let text_input = &mut self.text_input;

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            // ── Playback panel ───────────────────────────────────────────────
            egui::Window::new("Playback")
                .anchor(egui::Align2::LEFT_BOTTOM, [10.0, -10.0])
                .resizable(false)
                .collapsible(false)
                .show(ctx, |ui| {
                    let loaded = panel.state.total_frames > 0;

                    ui.horizontal(|ui| {
                        let label = if panel.state.is_playing { "Pause" } else { "Play" };
                        if ui.add_enabled(loaded, egui::Button::new(label)).clicked() {
                            actions.toggle_play = true;
                        }
                        if ui.add_enabled(loaded, egui::Button::new("Reset")).clicked() {
                            actions.reset = true;
                        }
                        ui.label(format!(
                            "{} / {} @ {} fps",
                            panel.state.current_frame,
                            panel.state.total_frames.saturating_sub(1),
                            panel.track_fps
                        ));
                    });

                    let mut frame = panel.state.current_frame;
                    let last = panel.state.total_frames.saturating_sub(1);
                    let slider = egui::Slider::new(&mut frame, 0..=last).text("frame");
                    if ui.add_enabled(loaded, slider).changed() {
                        actions.seek = Some(frame);
                    }

                    if let Some(phoneme) = panel.phoneme {
                        ui.label(format!("Phoneme: {phoneme:?}"));
                    }

                    ui.separator();
                    for (shape, target) in panel.active.channels() {
                        let shown = panel.smoothed.get(shape);
                        ui.add(
                            egui::ProgressBar::new(shown / Blendshape::max_weight(shape))
                                .desired_width(240.0)
                                .text(format!("{:<12} {:.2} → {:.2}", shape.name(), shown, target)),
                        );
                    }

                    ui.separator();
                    ui.horizontal(|ui| {
                        let response = ui.text_edit_singleline(&mut *text_input);
                        let submitted = response.lost_focus()
                            && ui.input(|i| i.key_pressed(egui::Key::Enter));
                        if ui.button("Animate").clicked() || submitted {
                            actions.animate_text = Some(text_input.clone());
                        }
                    });
                });

            // ── F3: stats panel ──────────────────────────────────────────────
            if let Some(stats) = stats {
                egui::Area::new(egui::Id::new("debug_overlay"))
                    .fixed_pos(egui::pos2(10.0, 10.0))
                    .show(ctx, |ui| {
                        egui::Frame::none()
                            .fill(egui::Color32::from_rgba_premultiplied(0, 0, 0, 180))
                            .inner_margin(egui::Margin::same(8.0))
                            .rounding(4.0)
                            .show(ui, |ui: &mut egui::Ui| {
                                ui.label(format!("FPS: {}", stats.fps));
                                ui.label(format!(
                                    "Frame: {:.2} ms (min: {:.1} | max: {:.1})",
                                    stats.frame_time_avg_ms,
                                    stats.frame_time_min_ms,
                                    stats.frame_time_max_ms
                                ));
                                ui.label(format!("Deform: {:.2} ms", stats.deform_ms));
                                ui.label(format!(
                                    "Mesh: {} verts | {} tris",
                                    stats.vertex_count, stats.triangle_count
                                ));
                                ui.label(format!(
                                    "Resolution: {} x {}",
                                    stats.resolution.0, stats.resolution.1
                                ));
                                ui.label(format!("Camera dist: {:.1}", stats.camera_distance));
                            });
                    });
            }
        });

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let tris = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, &tris, screen_descriptor);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            self.egui_renderer
                .render(&mut render_pass.forget_lifetime(), &tris, screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        actions
    }
}
