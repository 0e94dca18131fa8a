//! GPU Particle Simulation
//!
//! A grid of particles falls under gravity, bounces on the floor, and is pushed
//! away from the pointer wherever it moves over the ground.

mod gui;

use glam::Vec2;
use gui::{Gui, UiState};
use particle_physics::GridLayout;
use particle_renderer::{Camera, GroundPlane, ParticleRenderer};
use particle_simulation::{
    Dispatcher, KernelQueue, ParticleSimulation, SimulationConfig, SimulationError,
};
use std::collections::VecDeque;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

/// Frames averaged for the FPS readout.
const FRAME_WINDOW: usize = 100;

#[derive(Error, Debug)]
enum AppError {
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error("failed to acquire frame: {0}")]
    Frame(#[from] wgpu::SurfaceError),
}

struct GpuState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,

    dispatcher: Dispatcher<ParticleSimulation>,
    renderer: ParticleRenderer,
    camera: Camera,
    ground: GroundPlane,

    gui: Gui,
    ui_state: UiState,

    frame_times: VecDeque<f32>,
    last_frame_time: Instant,
}

impl GpuState {
    async fn new(window: Arc<Window>, sim_config: &SimulationConfig) -> Result<Self, AppError> {
        let size = window.inner_size();

        // Create wgpu instance
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        // Request adapter
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| SimulationError::AdapterUnavailable(e.to_string()))?;

        log::info!("✓ Using GPU: {}", adapter.get_info().name);

        // Create device and queue
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| SimulationError::DeviceRequest(e.to_string()))?;

        // Configure surface
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoNoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        // Create simulation
        let tunables = sim_config.initial_tunables();
        let grid = GridLayout::new(sim_config.particle_count, sim_config.grid_spacing);
        let simulation =
            ParticleSimulation::new(device.clone(), queue.clone(), grid, &tunables).await?;
        log::info!("✓ Simulation created");

        // Create renderer
        let renderer = ParticleRenderer::new(
            &device,
            &config,
            simulation.position_buffer(),
            simulation.color_buffer(),
        );
        log::info!("✓ Renderer initialized");

        let mut dispatcher = Dispatcher::new(simulation, tunables);
        dispatcher.initialize()?;

        // Create camera
        let camera = Camera::new(config.width, config.height);

        // Create GUI
        let gui = Gui::new(&device, config.format, &window);
        let ui_state = UiState::new(tunables, sim_config.particle_count);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            dispatcher,
            renderer,
            camera,
            ground: GroundPlane::default(),
            gui,
            ui_state,
            frame_times: VecDeque::with_capacity(FRAME_WINDOW),
            last_frame_time: Instant::now(),
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.renderer.resize(&self.device, &self.config);
            self.camera.resize(new_size.width, new_size.height);
        }
    }

    fn viewport(&self) -> Vec2 {
        Vec2::new(self.config.width as f32, self.config.height as f32)
    }

    /// Forward slider changes to the dispatcher.
    fn apply_ui_tunables(&mut self) {
        let wanted = self.ui_state.tunables;
        let current = *self.dispatcher.tunables();
        if wanted.gravity != current.gravity {
            self.dispatcher.set_gravity(wanted.gravity);
        }
        if wanted.bounce != current.bounce {
            self.dispatcher.set_bounce(wanted.bounce);
        }
        if wanted.friction != current.friction {
            self.dispatcher.set_friction(wanted.friction);
        }
        if wanted.size != current.size {
            self.dispatcher.set_size(wanted.size);
        }
    }

    fn render(&mut self, window: &Window) -> Result<(f32, f32), AppError> {
        // Track frame time
        let now = Instant::now();
        let frame_time = (now - self.last_frame_time).as_secs_f32() * 1000.0;
        self.last_frame_time = now;

        self.frame_times.push_back(frame_time);
        if self.frame_times.len() > FRAME_WINDOW {
            self.frame_times.pop_front();
        }

        let avg_frame_time = self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32;
        let fps = 1000.0 / avg_frame_time;

        self.apply_ui_tunables();

        // Step simulation; returns once the integration kernel has finished.
        self.dispatcher.frame()?;

        // Update UI state
        self.ui_state.fps = fps;
        self.ui_state.frame_time = avg_frame_time;
        self.ui_state.impulse_count = self.dispatcher.impulses();

        // Render
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        self.renderer.render(
            &self.queue,
            &mut encoder,
            &view,
            &self.camera,
            self.dispatcher.queue().particle_count(),
            self.dispatcher.tunables().size,
        );

        self.gui.render(
            &self.device,
            &self.queue,
            &mut encoder,
            window,
            &view,
            &mut self.ui_state,
        );

        let submission = self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        // The next frame's integration starts only after this pass has read the store.
        self.dispatcher.queue().wait_for(Some(submission))?;

        Ok((fps, avg_frame_time))
    }

    /// Dispatch an impulse under the cursor unless the camera is being dragged.
    fn pointer_moved(&mut self, cursor: Vec2, camera_gesture_active: bool) {
        let hit = self.ground.pick(&self.camera, cursor, self.viewport());
        self.dispatcher.pointer_moved(hit, camera_gesture_active);
    }
}

struct App {
    sim_config: SimulationConfig,
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    mouse_pressed: bool,
    last_mouse_pos: Option<(f64, f64)>,
    error: Option<AppError>,
}

impl App {
    fn new(sim_config: SimulationConfig) -> Self {
        Self {
            sim_config,
            window: None,
            gpu_state: None,
            mouse_pressed: false,
            last_mouse_pos: None,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: AppError) {
        log::error!("{error}");
        self.error = Some(error);
        event_loop.exit();
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let window_attributes = Window::default_attributes()
            .with_title("Particle Simulation")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        self.window = Some(window.clone());
        self.gpu_state = Some(pollster::block_on(GpuState::new(
            window,
            &self.sim_config,
        ))?);
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(error) = self.create_window(event_loop) {
                self.fail(event_loop, error);
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        // Handle GUI events
        if let (Some(gpu_state), Some(window)) = (&mut self.gpu_state, &self.window) {
            if gpu_state.gui.handle_event(window, &event) {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => event_loop.exit(),

            WindowEvent::Resized(physical_size) => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.resize(physical_size);
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Right {
                    self.mouse_pressed = state == ElementState::Pressed;
                    if !self.mouse_pressed {
                        self.last_mouse_pos = None;
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                let Some(gpu_state) = &mut self.gpu_state else {
                    return;
                };

                if self.mouse_pressed {
                    if let Some(last_pos) = self.last_mouse_pos {
                        let delta_x = (position.x - last_pos.0) as f32;
                        let delta_y = (position.y - last_pos.1) as f32;
                        gpu_state.camera.rotate(delta_x * 0.005, delta_y * 0.005);
                    }
                    self.last_mouse_pos = Some((position.x, position.y));
                }

                if !gpu_state.gui.wants_pointer() {
                    let cursor = Vec2::new(position.x as f32, position.y as f32);
                    gpu_state.pointer_moved(cursor, self.mouse_pressed);
                }
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_x, y) => y * 10.0,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.1,
                };

                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state
                        .camera
                        .zoom(-scroll * gpu_state.camera.distance / 100.0);
                }
            }

            WindowEvent::RedrawRequested => {
                let (Some(window), Some(gpu_state)) = (&self.window, &mut self.gpu_state) else {
                    return;
                };
                match gpu_state.render(window) {
                    Ok((fps, frame_time)) => {
                        window.set_title(&format!(
                            "Particle Simulation - {:.0} FPS ({:.2}ms) - {} particles",
                            fps, frame_time, self.sim_config.particle_count
                        ));
                    }
                    Err(AppError::Frame(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                        gpu_state.resize(window.inner_size())
                    }
                    Err(AppError::Frame(wgpu::SurfaceError::Timeout)) => {
                        log::warn!("Surface timeout, skipping frame");
                    }
                    Err(e) => {
                        self.fail(event_loop, e);
                        return;
                    }
                }
            }

            _ => {}
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> ExitCode {
    // Initialize logger (RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting particle simulation...");

    let sim_config = match SimulationConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Failed to create event loop: {e}");
            return ExitCode::FAILURE;
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(sim_config);

    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {e}");
        return ExitCode::FAILURE;
    }

    match app.error {
        Some(_) => ExitCode::FAILURE,
        None => ExitCode::SUCCESS,
    }
}
