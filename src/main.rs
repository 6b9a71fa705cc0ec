// Viseme face viewer
// Plays a blend-weight track on a procedural face: playback steps frames at the
// track's fps, the deformation engine eases toward them every redraw.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use argh::FromArgs;
use bevy_ecs::prelude::*;
use glam::Vec3;
use log::{error, info, warn};
use wgpu::util::DeviceExt;
use winit::{
    event::{ElementState, Event as WinitEvent, KeyEvent, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use viseme_face::engine::camera::OrbitCamera;
use viseme_face::engine::debug_overlay::{DebugOverlay, DebugStats, PanelActions, PanelView};
use viseme_face::engine::input::InputState;
use viseme_face::engine::mesh::{FaceMesh, GpuVertex};
use viseme_face::engine::provider::{AnimationProvider, AnimationRequest, RuleBasedProvider};
use viseme_face::engine::{frame_update, spawn_face};
use viseme_face::{AnimationTrack, AppConfig, DeformationEngine, PlaybackController, TrackDocument};

const DEFAULT_TEXT: &str = "hello world";
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

// ============================================================================
// COMMAND LINE
// ============================================================================

/// Play viseme blend-weight animation on a procedural face.
#[derive(FromArgs, Debug)]
struct Args {
    /// text to animate on startup
    #[argh(option, short = 't')]
    text: Option<String>,

    /// animation track JSON to load instead of generating one
    #[argh(option)]
    track: Option<PathBuf>,

    /// raw mono 16-bit little-endian PCM to animate
    #[argh(option)]
    audio: Option<PathBuf>,

    /// sample rate of --audio (defaults to the configured rate)
    #[argh(option)]
    sample_rate: Option<u32>,

    /// frame rate to request from the provider
    #[argh(option)]
    fps: Option<u32>,

    /// JSON config file
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// log debug output
    #[argh(switch, short = 'v')]
    verbose: bool,

    /// only log errors
    #[argh(switch, short = 'q')]
    quiet: bool,
}

impl Args {
    fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

// ============================================================================
// UNIFORM DATA
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    light_dir: [f32; 4],
    base_color: [f32; 4],
}

impl Uniforms {
    fn new(view_proj: glam::Mat4) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            light_dir: Vec3::new(0.4, 0.6, 1.0).extend(0.0).to_array(),
            base_color: [0.86, 0.68, 0.58, 1.0],
        }
    }
}

// ============================================================================
// FRAME STATS
// ============================================================================

/// Frame times over the last second, flushed into `DebugStats` once per second.
struct FrameTimer {
    window_start: Instant,
    frames: u32,
    sum_ms: f32,
    min_ms: f32,
    max_ms: f32,
    last: (u32, f32, f32, f32),
}

impl FrameTimer {
    fn new() -> Self {
        Self {
            window_start: Instant::now(),
            frames: 0,
            sum_ms: 0.0,
            min_ms: f32::MAX,
            max_ms: 0.0,
            last: (0, 0.0, 0.0, 0.0),
        }
    }

    fn record(&mut self, dt: Duration) {
        let ms = dt.as_secs_f32() * 1000.0;
        self.frames += 1;
        self.sum_ms += ms;
        self.min_ms = self.min_ms.min(ms);
        self.max_ms = self.max_ms.max(ms);

        if self.window_start.elapsed() >= Duration::from_secs(1) {
            self.last = (self.frames, self.sum_ms / self.frames as f32, self.min_ms, self.max_ms);
            self.window_start = Instant::now();
            self.frames = 0;
            self.sum_ms = 0.0;
            self.min_ms = f32::MAX;
            self.max_ms = 0.0;
        }
    }
}

// ============================================================================
// APPLICATION STATE
// ============================================================================

struct State {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    render_pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_indices: u32,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    depth_view: wgpu::TextureView,
    overlay: DebugOverlay,

    // ECS World: PlaybackController resource + one face entity
    world: World,
    face: Entity,
    provider: RuleBasedProvider,
    fps: u32,

    camera: OrbitCamera,
    input: InputState,
    last_update: Instant,
    frame_timer: FrameTimer,
    deform_ms: f32,
}

impl State {
    async fn new(window: Arc<Window>, app_config: &AppConfig, fps: u32, track: Option<AnimationTrack>, text: &str) -> Self {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .expect("failed to create surface");

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .expect("no suitable GPU adapter");

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .expect("failed to create device");

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Face Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("face.wgsl").into()),
        });

        let uniforms = Uniforms::new(glam::Mat4::IDENTITY);

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&[uniforms]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("uniform_bind_group_layout"),
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("uniform_bind_group"),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                push_constant_ranges: &[],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Face Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[GpuVertex::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        // ECS world: controller resource, then the face entity
        let mut world = World::new();
        let mut controller = PlaybackController::new();
        if let Some(track) = track {
            controller.load_track(track);
            controller.toggle_play();
        }
        world.insert_resource(controller);
        let face = spawn_face(&mut world, &app_config.face, app_config.animation.smoothing);

        // Vertex buffer is rewritten whenever the deformation engine touches the mesh
        let (vertex_buffer, index_buffer, num_indices) = {
            let mesh = world
                .get::<FaceMesh>(face)
                .expect("face entity spawned without a mesh");
            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Buffer"),
                contents: bytemuck::cast_slice(&mesh.gpu_vertices()),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Index Buffer"),
                contents: mesh.index_bytes(),
                usage: wgpu::BufferUsages::INDEX,
            });
            (vertex_buffer, index_buffer, mesh.index_count() as u32)
        };

        let overlay = DebugOverlay::new(&window, &device, config.format, text);

        Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            render_pipeline,
            vertex_buffer,
            index_buffer,
            num_indices,
            uniform_buffer,
            uniform_bind_group,
            depth_view,
            overlay,
            world,
            face,
            provider: RuleBasedProvider,
            fps,
            camera: OrbitCamera::new(),
            input: InputState::new(),
            last_update: Instant::now(),
            frame_timer: FrameTimer::new(),
            deform_ms: 0.0,
        }
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, &self.config);
        }
    }

    fn controller(&mut self) -> Mut<'_, PlaybackController> {
        self.world.resource_mut::<PlaybackController>()
    }

    /// Generate a track for `text` and play it from the start.
    fn animate_text(&mut self, text: &str) {
        let request = AnimationRequest::text(text, self.fps);
        match self.provider.animate(&request) {
            Ok(track) => {
                info!("Animating {:?}: {} frames", text, track.total_frames());
                let mut controller = self.controller();
                controller.load_track(track);
                controller.toggle_play();
            }
            Err(e) => {
                warn!("Could not animate {:?}: {}", text, e);
                self.controller().unload();
            }
        }
    }

    fn handle_shortcuts(&mut self) {
        if self.overlay.wants_keyboard() {
            return;
        }
        if self.input.was_key_pressed(KeyCode::F3) {
            self.overlay.toggle_stats();
        }
        if self.input.was_key_pressed(KeyCode::Space) {
            self.controller().toggle_play();
        }
        if self.input.was_key_pressed(KeyCode::KeyR) {
            self.controller().reset();
        }
        if self.input.was_key_pressed(KeyCode::ArrowLeft) {
            let mut controller = self.controller();
            let frame = controller.current_frame().saturating_sub(1);
            controller.seek(frame);
        }
        if self.input.was_key_pressed(KeyCode::ArrowRight) {
            let mut controller = self.controller();
            let frame = controller.current_frame() + 1;
            controller.seek(frame);
        }
    }

    fn apply_actions(&mut self, actions: PanelActions) {
        if let Some(text) = actions.animate_text {
            self.animate_text(&text);
        }
        let mut controller = self.controller();
        if actions.reset {
            controller.reset();
        }
        if let Some(frame) = actions.seek {
            controller.seek(frame);
        }
        if actions.toggle_play {
            controller.toggle_play();
        }
    }

    fn update(&mut self) {
        let now = Instant::now();
        let dt = now - self.last_update;
        self.last_update = now;
        self.frame_timer.record(dt);

        self.handle_shortcuts();
        self.camera.update(&self.input);

        let start = Instant::now();
        frame_update(&mut self.world, dt);
        self.deform_ms = start.elapsed().as_secs_f32() * 1000.0;

        // Re-upload only if the engine rewrote the mesh
        if let Some(mut mesh) = self.world.get_mut::<FaceMesh>(self.face) {
            if mesh.take_changed() {
                self.queue.write_buffer(
                    &self.vertex_buffer,
                    0,
                    bytemuck::cast_slice(&mesh.gpu_vertices()),
                );
            }
        }
    }

    fn panel_view(&self) -> PanelView {
        let controller = self.world.resource::<PlaybackController>();
        let state = controller.playback_state();
        PanelView {
            state,
            track_fps: controller.track().map_or(0, AnimationTrack::fps),
            phoneme: controller
                .track()
                .and_then(|track| track.frame(state.current_frame))
                .and_then(|frame| frame.phoneme),
            active: controller.active_weights(),
            smoothed: self
                .world
                .get::<DeformationEngine>(self.face)
                .map(DeformationEngine::smoothed)
                .unwrap_or_default(),
        }
    }

    fn debug_stats(&self) -> DebugStats {
        let (fps, avg, min, max) = self.frame_timer.last;
        let (vertex_count, triangle_count) = self
            .world
            .get::<FaceMesh>(self.face)
            .map_or((0, 0), |mesh| (mesh.vertex_count(), mesh.index_count() / 3));
        DebugStats {
            fps,
            frame_time_avg_ms: avg,
            frame_time_min_ms: min,
            frame_time_max_ms: max,
            deform_ms: self.deform_ms,
            vertex_count,
            triangle_count,
            resolution: (self.size.width, self.size.height),
            camera_distance: self.camera.distance(),
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let aspect = self.size.width as f32 / self.size.height.max(1) as f32;
        let uniforms = Uniforms::new(self.camera.view_projection(aspect));
        self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Face Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.05,
                            g: 0.05,
                            b: 0.1,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..self.num_indices, 0, 0..1);
        }

        let panel = self.panel_view();
        let stats = self.overlay.stats_visible.then(|| self.debug_stats());
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: self.window.scale_factor() as f32,
        };
        let actions = self.overlay.render(
            &self.device,
            &self.queue,
            &mut encoder,
            &self.window,
            &view,
            &screen_descriptor,
            &panel,
            stats.as_ref(),
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        self.apply_actions(actions);
        Ok(())
    }
}

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

// ============================================================================
// STARTUP TRACK
// ============================================================================

/// Pick the startup track: --track, then --audio, then text.
/// A source that fails to load leaves the viewer without a track.
fn initial_track(args: &Args, app_config: &AppConfig, fps: u32, text: &str) -> Option<AnimationTrack> {
    let result = if let Some(path) = &args.track {
        TrackDocument::load(path).and_then(AnimationTrack::try_from)
    } else if let Some(path) = &args.audio {
        let sample_rate = args.sample_rate.unwrap_or(app_config.animation.sample_rate);
        std::fs::read(path)
            .map_err(Into::into)
            .and_then(|pcm| RuleBasedProvider.animate(&AnimationRequest::Audio { pcm, sample_rate, fps }))
    } else {
        RuleBasedProvider.animate(&AnimationRequest::text(text, fps))
    };

    match result {
        Ok(track) => Some(track),
        Err(e) => {
            error!("No track loaded: {}", e);
            None
        }
    }
}

// ============================================================================
// MAIN
// ============================================================================

fn main() {
    let args: Args = argh::from_env();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level())).init();

    let app_config = match &args.config {
        Some(path) => AppConfig::load(path).unwrap_or_else(|e| {
            warn!("Ignoring config {}: {}", path.display(), e);
            AppConfig::default()
        }),
        None => AppConfig::default(),
    };
    let fps = args.fps.unwrap_or(app_config.animation.fps);
    let text = args.text.clone().unwrap_or_else(|| DEFAULT_TEXT.to_string());
    let track = initial_track(&args, &app_config, fps, &text);

    let event_loop = EventLoop::new().expect("failed to create event loop");

    let window_attributes = Window::default_attributes()
        .with_title(app_config.window.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(
            app_config.window.width,
            app_config.window.height,
        ));

    let window = Arc::new(
        event_loop
            .create_window(window_attributes)
            .expect("failed to create window"),
    );

    let mut state = pollster::block_on(State::new(window.clone(), &app_config, fps, track, &text));

    let result = event_loop.run(move |event, control_flow| {
        match event {
            WinitEvent::WindowEvent {
                ref event,
                window_id,
            } if window_id == window.id() => {
                let response = state.overlay.handle_window_event(&window, event);
                state.input.process_event_behind_ui(event, response.consumed);

                match event {
                    WindowEvent::CloseRequested
                    | WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(KeyCode::Escape),
                                ..
                            },
                        ..
                    } => control_flow.exit(),
                    WindowEvent::Resized(physical_size) => {
                        state.resize(*physical_size);
                    }
                    WindowEvent::RedrawRequested => {
                        state.update();
                        match state.render() {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost) => state.resize(state.size),
                            Err(wgpu::SurfaceError::OutOfMemory) => control_flow.exit(),
                            Err(e) => warn!("{:?}", e),
                        }
                        state.input.end_frame();
                    }
                    _ => {}
                }
            }
            WinitEvent::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    });

    if let Err(e) = result {
        error!("Event loop terminated: {}", e);
    }
}
