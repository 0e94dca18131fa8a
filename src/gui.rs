use egui::Context;
use egui_wgpu::Renderer;
use egui_winit::State;
use particle_physics::{Tunables, BOUNCE_RANGE, FRICTION_RANGE, GRAVITY_RANGE, SIZE_RANGE};
use wgpu::{Device, TextureFormat};
use winit::{event::WindowEvent, window::Window};

pub struct UiState {
    pub fps: f32,
    pub frame_time: f32,
    pub particle_count: u32,
    pub impulse_count: u64,
    /// Slider values; compared against the simulation's tunables each frame.
    pub tunables: Tunables,
}

impl UiState {
    pub fn new(tunables: Tunables, particle_count: u32) -> Self {
        Self {
            fps: 0.0,
            frame_time: 0.0,
            particle_count,
            impulse_count: 0,
            tunables,
        }
    }
}

pub struct Gui {
    context: Context,
    state: State,
    renderer: Renderer,
}

impl Gui {
    pub fn new(device: &Device, output_color_format: TextureFormat, window: &Window) -> Self {
        let context = Context::default();
        let id = context.viewport_id();

        let state = State::new(
            context.clone(),
            id,
            window,
            Some(window.scale_factor() as f32),
            None,
            Some(device.limits().max_texture_dimension_2d as usize),
        );

        let renderer = Renderer::new(
            device,
            output_color_format,
            egui_wgpu::RendererOptions {
                msaa_samples: 1,
                depth_stencil_format: None,
                dithering: false,
                ..Default::default()
            },
        );

        Self {
            context,
            state,
            renderer,
        }
    }

    /// Feed a window event to egui. Returns true when the panel consumed it.
    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let response = self.state.on_window_event(window, event);
        response.consumed
    }

    /// Whether the pointer is currently over a panel.
    pub fn wants_pointer(&self) -> bool {
        self.context.wants_pointer_input() || self.context.is_pointer_over_area()
    }

    pub fn render(
        &mut self,
        device: &Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        window: &Window,
        view: &wgpu::TextureView,
        ui_state: &mut UiState,
    ) {
        let raw_input = self.state.take_egui_input(window);

        let full_output = self.context.run(raw_input, |ctx| {
            Self::ui(ctx, ui_state);
        });

        self.state
            .handle_platform_output(window, full_output.platform_output);

        let clipped_primitives = self
            .context
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let size = window.inner_size();
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [size.width, size.height],
            pixels_per_point: window.scale_factor() as f32,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            self.renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.renderer.update_buffers(
            device,
            queue,
            encoder,
            &clipped_primitives,
            &screen_descriptor,
        );

        let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Egui Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let mut render_pass = render_pass.forget_lifetime();
        self.renderer
            .render(&mut render_pass, &clipped_primitives, &screen_descriptor);
        drop(render_pass);

        for id in &full_output.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }

    fn ui(ctx: &Context, state: &mut UiState) {
        // Statistics (Top Left)
        egui::Window::new("Statistics")
            .anchor(egui::Align2::LEFT_TOP, [10.0, 10.0])
            .resizable(false)
            .collapsible(true)
            .show(ctx, |ui| {
                ui.label(format!("FPS: {:.1}", state.fps));
                ui.label(format!("Frame Time: {:.2} ms", state.frame_time));
                ui.separator();
                ui.label(format!("Particles: {}", state.particle_count));
                ui.label(format!("Impulses: {}", state.impulse_count));
            });

        // Tunables (Top Right)
        egui::Window::new("Settings")
            .anchor(egui::Align2::RIGHT_TOP, [-10.0, 10.0])
            .resizable(false)
            .collapsible(true)
            .show(ctx, |ui| {
                let (min, max, step) = GRAVITY_RANGE;
                ui.add(
                    egui::Slider::new(&mut state.tunables.gravity, min..=max)
                        .step_by(step as f64)
                        .text("gravity"),
                );
                let (min, max, step) = BOUNCE_RANGE;
                ui.add(
                    egui::Slider::new(&mut state.tunables.bounce, min..=max)
                        .step_by(step as f64)
                        .text("bounce"),
                );
                let (min, max, step) = FRICTION_RANGE;
                ui.add(
                    egui::Slider::new(&mut state.tunables.friction, min..=max)
                        .step_by(step as f64)
                        .text("friction"),
                );
                let (min, max, step) = SIZE_RANGE;
                ui.add(
                    egui::Slider::new(&mut state.tunables.size, min..=max)
                        .step_by(step as f64)
                        .text("size"),
                );
            });
    }
}
