//! GPU-based particle simulation manager
//!
//! Owns the particle store (three `array<vec4<f32>>` storage buffers indexed by
//! particle), the params uniform, and one compute pipeline per kernel. All three
//! kernels share a single bind group; each invocation touches only its own index.

use crate::error::{SimulationError, SimulationResult};
use crate::queue::{Kernel, KernelQueue};
use crate::SimParams;
use particle_physics::{GridLayout, PackedVec3, ParticleStore, Tunables};
use std::borrow::Cow;
use std::sync::mpsc;
use wgpu::util::DeviceExt;

const WORKGROUP_SIZE: u32 = crate::config::WORKGROUP_SIZE;

const COMMON_WGSL: &str = include_str!("shaders/common.wgsl");

/// GPU-based particle simulation
pub struct ParticleSimulation {
    device: wgpu::Device,
    queue: wgpu::Queue,

    // Particle store
    position_buffer: wgpu::Buffer,
    velocity_buffer: wgpu::Buffer,
    color_buffer: wgpu::Buffer,
    params_buffer: wgpu::Buffer,

    // Compute pipelines
    init_pipeline: wgpu::ComputePipeline,
    integrate_pipeline: wgpu::ComputePipeline,
    impulse_pipeline: wgpu::ComputePipeline,

    bind_group: wgpu::BindGroup,

    grid: GridLayout,
    workgroup_count: u32,
    last_submission: Option<wgpu::SubmissionIndex>,
}

impl ParticleSimulation {
    /// Allocate the store and compile the kernels.
    ///
    /// Shader or pipeline validation failures are returned rather than left to
    /// the device's uncaptured error handler.
    pub async fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        grid: GridLayout,
        tunables: &Tunables,
    ) -> SimulationResult<Self> {
        log::info!("Initializing ParticleSimulation...");
        if grid.particle_count == 0 {
            return Err(SimulationError::EmptyStore);
        }

        let store_size = grid.particle_count as u64 * std::mem::size_of::<PackedVec3>() as u64;
        let limits = device.limits();
        let max_array_size = limits
            .max_buffer_size
            .min(limits.max_storage_buffer_binding_size as u64);
        if store_size > max_array_size {
            return Err(SimulationError::Allocation(format!(
                "{} particles need {} bytes per array, device allows {}",
                grid.particle_count, store_size, max_array_size
            )));
        }

        // Scopes are popped in reverse: validation first, then out-of-memory.
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let store_usage = wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_DST
            | wgpu::BufferUsages::COPY_SRC;

        // Store buffers start zeroed; the init kernel is the only writer of
        // initial positions and colors.
        let position_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Position Buffer"),
            size: store_size,
            usage: store_usage,
            mapped_at_creation: false,
        });
        let velocity_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Velocity Buffer"),
            size: store_size,
            usage: store_usage,
            mapped_at_creation: false,
        });
        let color_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Color Buffer"),
            size: store_size,
            usage: store_usage,
            mapped_at_creation: false,
        });

        let params = SimParams::new(tunables, &grid);
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sim Params Buffer"),
            contents: bytemuck::cast_slice(&[params]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        log::info!("Buffers created ({} bytes per array)", store_size);

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Simulation Bind Group Layout"),
            entries: &[
                // Positions (Storage) - Binding 0
                storage_entry(0),
                // Velocities (Storage) - Binding 1
                storage_entry(1),
                // Colors (Storage) - Binding 2
                storage_entry(2),
                // Params (Uniform) - Binding 3
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<SimParams>() as u64,
                        ),
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Simulation Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        log::info!("Creating init pipeline...");
        let init_pipeline = create_kernel_pipeline(
            &device,
            &pipeline_layout,
            "Init",
            include_str!("shaders/init.wgsl"),
        );

        log::info!("Creating integrate pipeline...");
        let integrate_pipeline = create_kernel_pipeline(
            &device,
            &pipeline_layout,
            "Integration",
            include_str!("shaders/integrate.wgsl"),
        );

        log::info!("Creating impulse pipeline...");
        let impulse_pipeline = create_kernel_pipeline(
            &device,
            &pipeline_layout,
            "Impulse",
            include_str!("shaders/impulse.wgsl"),
        );

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Simulation Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: position_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: velocity_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: color_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        let validation = device.pop_error_scope().await;
        let out_of_memory = device.pop_error_scope().await;
        if let Some(error) = out_of_memory {
            return Err(SimulationError::Allocation(error.to_string()));
        }
        if let Some(error) = validation {
            return Err(SimulationError::Pipeline {
                stage: "simulation pipelines",
                message: error.to_string(),
            });
        }

        log::info!("Pipelines created");

        let workgroup_count = grid.particle_count.div_ceil(WORKGROUP_SIZE);

        Ok(Self {
            device,
            queue,
            position_buffer,
            velocity_buffer,
            color_buffer,
            params_buffer,
            init_pipeline,
            integrate_pipeline,
            impulse_pipeline,
            bind_group,
            grid,
            workgroup_count,
            last_submission: None,
        })
    }

    /// Record one kernel dispatch into `encoder`.
    pub fn encode_kernel(&self, encoder: &mut wgpu::CommandEncoder, kernel: Kernel) {
        let pipeline = match kernel {
            Kernel::Init => &self.init_pipeline,
            Kernel::Integrate => &self.integrate_pipeline,
            Kernel::Impulse => &self.impulse_pipeline,
        };

        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(kernel.label()),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(pipeline);
        compute_pass.set_bind_group(0, &self.bind_group, &[]);
        compute_pass.dispatch_workgroups(self.workgroup_count, 1, 1);
    }

    /// Block until `submission` (or everything, if `None`) has completed.
    pub fn wait_for(&self, submission: Option<wgpu::SubmissionIndex>) -> SimulationResult<()> {
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: submission,
                timeout: None,
            })
            .map_err(|e| SimulationError::Poll(e.to_string()))?;
        Ok(())
    }

    /// Copy the whole store back to the host.
    ///
    /// Waits for all prior submissions; meant for diagnostics and tests. Arrays
    /// are staged one at a time so the staging buffer never exceeds one array.
    pub fn read_back(&self) -> SimulationResult<ParticleStore> {
        let array_size = self.grid.particle_count as u64 * std::mem::size_of::<PackedVec3>() as u64;
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Readback Buffer"),
            size: array_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let positions = self.read_array(&self.position_buffer, &staging, array_size)?;
        let velocities = self.read_array(&self.velocity_buffer, &staging, array_size)?;
        let colors = self.read_array(&self.color_buffer, &staging, array_size)?;

        Ok(ParticleStore::from_packed(&positions, &velocities, &colors))
    }

    fn read_array(
        &self,
        source: &wgpu::Buffer,
        staging: &wgpu::Buffer,
        size: u64,
    ) -> SimulationResult<Vec<PackedVec3>> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_buffer_to_buffer(source, 0, staging, 0, size);
        let submission = self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.wait_for(Some(submission))?;

        rx.recv()
            .map_err(|e| SimulationError::BufferMap(e.to_string()))?
            .map_err(|e| SimulationError::BufferMap(e.to_string()))?;

        let slots = {
            let data = slice.get_mapped_range();
            bytemuck::cast_slice::<u8, PackedVec3>(&data).to_vec()
        };
        staging.unmap();

        Ok(slots)
    }

    /// Per-particle positions (`array<vec4<f32>>`, xyz used) for the renderer.
    pub fn position_buffer(&self) -> &wgpu::Buffer {
        &self.position_buffer
    }

    /// Per-particle colors (`array<vec4<f32>>`, xyz used) for the renderer.
    pub fn color_buffer(&self) -> &wgpu::Buffer {
        &self.color_buffer
    }

    pub fn grid(&self) -> &GridLayout {
        &self.grid
    }
}

impl KernelQueue for ParticleSimulation {
    fn write_tunables(&mut self, tunables: &Tunables) {
        // Queued writes are applied before the next submit, which gives the
        // "write, then submit" ordering the kernels rely on.
        let params = SimParams::new(tunables, &self.grid);
        self.queue
            .write_buffer(&self.params_buffer, 0, bytemuck::cast_slice(&[params]));
    }

    fn submit(&mut self, kernel: Kernel) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Simulation Encoder"),
            });
        self.encode_kernel(&mut encoder, kernel);
        self.last_submission = Some(self.queue.submit(std::iter::once(encoder.finish())));
    }

    fn wait_idle(&mut self) -> SimulationResult<()> {
        let submission = self.last_submission.take();
        self.wait_for(submission)
    }

    fn particle_count(&self) -> u32 {
        self.grid.particle_count
    }
}

fn storage_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn create_kernel_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    name: &str,
    kernel_source: &str,
) -> wgpu::ComputePipeline {
    let source = format!("{COMMON_WGSL}\n{kernel_source}");
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("{name} Compute Shader")),
        source: wgpu::ShaderSource::Wgsl(Cow::Owned(source)),
    });

    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(&format!("{name} Pipeline")),
        layout: Some(layout),
        module: &shader,
        entry_point: Some("main"),
        compilation_options: Default::default(),
        cache: None,
    })
}
