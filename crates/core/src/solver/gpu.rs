//! GPU-based erosion solver implementation
//!
//! This module provides a GPU implementation of the `ErosionSolver` trait using
//! wgpu compute shaders and storage buffers. This backend is only available when
//! the `gpu` feature is enabled.
//!
//! # Shader Files
//!
//! Compute shaders are located in `shaders/`; `common.wgsl` (parameter block,
//! buffer layout, helpers) is prepended to each stage:
//! - `water_increment.wgsl` - Rainfall
//! - `outflow_flux.wgsl` - Virtual pipe flux with outflow scaling
//! - `water_velocity.wgsl` - Water depth update and velocity field
//! - `erosion_deposition.wgsl` - Capacity-driven bedrock/sediment exchange
//! - `transportation.wgsl` - Semi-Lagrangian sediment advection
//! - `evaporation.wgsl` - Water loss
//!
//! # Implementation
//!
//! Every field lives in two storage buffers (ping-pong). Bind group layouts and
//! bind groups are derived from each stage's [`StageDescriptor`]: committed
//! inputs first, write targets next, the parameter uniform last. A stage is
//! recorded, submitted without waiting for completion, and its write targets are
//! committed once wgpu has accepted the submission.

use super::context::GpuContext;
use super::fields::{
    validate_grid_width, BufferId, FluxCell, HeightCell, VelocityCell, WORKGROUP_SIZE,
};
use super::stages::{Stage, StageDescriptor};
use super::view::ViewMode;
use super::ErosionSolver;
use crate::error::ErosionError;
use crate::params::ErosionParams;
use bytemuck::{Pod, Zeroable};
use std::borrow::Cow;
use tracing::debug;
use wgpu::util::DeviceExt;

const COMMON_WGSL: &str = include_str!("shaders/common.wgsl");

fn stage_source(stage: Stage) -> &'static str {
    match stage {
        Stage::WaterIncrement => include_str!("shaders/water_increment.wgsl"),
        Stage::OutflowFlux => include_str!("shaders/outflow_flux.wgsl"),
        Stage::WaterVelocity => include_str!("shaders/water_velocity.wgsl"),
        Stage::ErosionDeposition => include_str!("shaders/erosion_deposition.wgsl"),
        Stage::Transportation => include_str!("shaders/transportation.wgsl"),
        Stage::Evaporation => include_str!("shaders/evaporation.wgsl"),
    }
}

/// Parameter block as seen by the shaders (must match `Params` in common.wgsl)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct GpuParams {
    width: u32,
    height: u32,
    cell_size: f32,
    dt: f32,
    rainfall: f32,
    gravity: f32,
    pipe_area: f32,
    kc: f32,
    ks: f32,
    kd: f32,
    ke: f32,
    max_capacity: f32,
}

impl GpuParams {
    fn new(width: u32, params: &ErosionParams) -> Self {
        Self {
            width,
            height: width,
            cell_size: params.cell_size,
            dt: params.dt,
            rainfall: params.rainfall,
            gravity: params.gravity,
            pipe_area: params.pipe_area,
            kc: params.kc,
            ks: params.ks,
            kd: params.kd,
            ke: params.ke,
            max_capacity: params.max_capacity,
        }
    }
}

/// View uniform for an external renderer (16 bytes for uniform alignment)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct ViewUniform {
    mode: u32,
    _padding: [u32; 3],
}

/// Two storage buffers of one field plus the committed index
struct BufferPair {
    slots: [wgpu::Buffer; 2],
    current: usize,
}

impl BufferPair {
    fn new(device: &wgpu::Device, label: &str, contents: &[u8]) -> Self {
        let usage =
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST;
        let make = |suffix: &str| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} {suffix}")),
                contents,
                usage,
            })
        };
        Self {
            slots: [make("A"), make("B")],
            current: 0,
        }
    }

    fn read(&self) -> &wgpu::Buffer {
        &self.slots[self.current]
    }

    fn write_target(&self) -> &wgpu::Buffer {
        &self.slots[self.current ^ 1]
    }

    fn commit(&mut self) {
        self.current ^= 1;
    }
}

/// Compute pipeline of one stage with the layout its bind groups must follow
struct StagePipeline {
    descriptor: StageDescriptor,
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

fn storage_entry(
    binding: u32,
    read_only: bool,
    visibility: wgpu::ShaderStages,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_entry<T>(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<T>() as u64),
        },
        count: None,
    }
}

impl StagePipeline {
    fn new(device: &wgpu::Device, stage: Stage) -> Self {
        let descriptor = stage.descriptor();

        let mut entries: Vec<wgpu::BindGroupLayoutEntry> = descriptor
            .reads
            .iter()
            .map(|_| true)
            .chain(descriptor.writes.iter().map(|_| false))
            .enumerate()
            .map(|(binding, read_only)| {
                storage_entry(binding as u32, read_only, wgpu::ShaderStages::COMPUTE)
            })
            .collect();
        entries.push(uniform_entry::<GpuParams>(
            entries.len() as u32,
            wgpu::ShaderStages::COMPUTE,
        ));

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{stage} Bind Group Layout")),
            entries: &entries,
        });

        let source = format!("{COMMON_WGSL}\n{}", stage_source(stage));
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(stage.name()),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(source)),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{stage} Pipeline Layout")),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&format!("{stage} Pipeline")),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some("main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        Self {
            descriptor,
            layout,
            pipeline,
        }
    }
}

/// GPU erosion solver using wgpu compute shaders
pub struct GpuErosionSolver {
    context: GpuContext,
    width: u32,
    params: ErosionParams,

    height: BufferPair,
    flux: BufferPair,
    velocity: BufferPair,

    params_buffer: wgpu::Buffer,
    view_buffer: wgpu::Buffer,
    view_layout: wgpu::BindGroupLayout,

    // Indexed by stage, in `Stage::ORDER`
    pipelines: Vec<StagePipeline>,
}

impl GpuErosionSolver {
    /// Create a GPU solver and upload the initial heightfield
    ///
    /// # Arguments
    ///
    /// * `context` - Device and queue; owned by the solver from here on
    /// * `width` - Grid width (and height) in cells, a multiple of 16
    /// * `bedrock` - Row-major bedrock heights, `width * width` samples
    /// * `params` - Initial parameter block
    ///
    /// # Errors
    ///
    /// `InvalidGridSize` or `HeightfieldMismatch`.
    pub fn new(
        context: GpuContext,
        width: usize,
        bedrock: &[f32],
        params: ErosionParams,
    ) -> Result<Self, ErosionError> {
        validate_grid_width(width)?;
        let cells = width * width;
        if bedrock.len() != cells {
            return Err(ErosionError::HeightfieldMismatch {
                expected: cells,
                actual: bedrock.len(),
            });
        }

        let device = context.device();
        let height_cells: Vec<HeightCell> = bedrock.iter().copied().map(HeightCell::dry).collect();
        let height = BufferPair::new(device, "Height", bytemuck::cast_slice(&height_cells));
        let flux = BufferPair::new(
            device,
            "Flux",
            bytemuck::cast_slice(&vec![FluxCell::default(); cells]),
        );
        let velocity = BufferPair::new(
            device,
            "Velocity",
            bytemuck::cast_slice(&vec![VelocityCell::default(); cells]),
        );

        let width_u32 = width as u32;
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Erosion Params"),
            contents: bytemuck::bytes_of(&GpuParams::new(width_u32, &params)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let view_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("View Mode"),
            contents: bytemuck::bytes_of(&ViewUniform {
                mode: ViewMode::default().as_u32(),
                _padding: [0; 3],
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let render = wgpu::ShaderStages::VERTEX_FRAGMENT;
        let view_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("View Bind Group Layout"),
            entries: &[
                storage_entry(0, true, render),
                storage_entry(1, true, render),
                storage_entry(2, true, render),
                uniform_entry::<ViewUniform>(3, render),
            ],
        });

        let pipelines = Stage::ORDER
            .iter()
            .map(|stage| StagePipeline::new(device, *stage))
            .collect();

        debug!("GPU erosion solver ready ({}x{} grid)", width, width);

        Ok(Self {
            context,
            width: width_u32,
            params,
            height,
            flux,
            velocity,
            params_buffer,
            view_buffer,
            view_layout,
            pipelines,
        })
    }

    /// Number of workgroups along each axis
    fn workgroup_count(&self) -> (u32, u32) {
        let groups = self.width / WORKGROUP_SIZE as u32;
        (groups, groups)
    }

    fn pair(&self, buffer: BufferId) -> &BufferPair {
        match buffer {
            BufferId::Height => &self.height,
            BufferId::Flux => &self.flux,
            BufferId::Velocity => &self.velocity,
        }
    }

    fn pair_mut(&mut self, buffer: BufferId) -> &mut BufferPair {
        match buffer {
            BufferId::Height => &mut self.height,
            BufferId::Flux => &mut self.flux,
            BufferId::Velocity => &mut self.velocity,
        }
    }

    fn pipeline(&self, stage: Stage) -> &StagePipeline {
        // Declaration order of `Stage` is execution order
        &self.pipelines[stage as usize]
    }

    /// Bind the committed inputs and write targets of a stage as they are right now
    fn stage_bind_group(&self, stage: &StagePipeline) -> wgpu::BindGroup {
        let descriptor = &stage.descriptor;
        let buffers = descriptor
            .reads
            .iter()
            .map(|id| self.pair(*id).read())
            .chain(descriptor.writes.iter().map(|id| self.pair(*id).write_target()))
            .chain(std::iter::once(&self.params_buffer));

        let entries: Vec<wgpu::BindGroupEntry> = buffers
            .enumerate()
            .map(|(binding, buffer)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: buffer.as_entire_binding(),
            })
            .collect();

        self.context
            .device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{} Bind Group", descriptor.stage)),
                layout: &stage.layout,
                entries: &entries,
            })
    }

    /// Record one stage dispatch into `encoder` without committing
    fn encode_stage(&self, encoder: &mut wgpu::CommandEncoder, stage: Stage) {
        let pipeline = self.pipeline(stage);
        let bind_group = self.stage_bind_group(pipeline);
        let (wg_x, wg_y) = self.workgroup_count();

        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(stage.name()),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(&pipeline.pipeline);
        compute_pass.set_bind_group(0, &bind_group, &[]);
        compute_pass.dispatch_workgroups(wg_x, wg_y, 1);
    }

    fn commit_writes(&mut self, stage: Stage) {
        for buffer in stage.descriptor().writes {
            self.pair_mut(*buffer).commit();
        }
    }

    /// Dispatch one stage in its own submission and commit its outputs
    ///
    /// Validation errors raised while recording or submitting abort the stage
    /// before anything is committed.
    fn launch(&mut self, stage: Stage) -> Result<(), ErosionError> {
        let device = self.context.device();
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Erosion Stage Encoder"),
        });
        self.encode_stage(&mut encoder, stage);
        self.context.queue().submit(std::iter::once(encoder.finish()));

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(ErosionError::StageFailed {
                stage,
                reason: error.to_string(),
            });
        }

        self.commit_writes(stage);
        Ok(())
    }

    /// Record the whole six-stage chain into a caller-owned encoder
    ///
    /// Lets a renderer put one simulation tick and its draw calls into a single
    /// submission. Generations are committed as each stage is recorded, so the
    /// caller must submit `encoder` before reading any buffer back.
    pub fn encode_tick(&mut self, encoder: &mut wgpu::CommandEncoder) {
        for stage in Stage::ORDER {
            self.encode_stage(encoder, stage);
            self.commit_writes(stage);
        }
    }

    /// Layout of [`view_bind_group`](Self::view_bind_group) for building a render pipeline
    ///
    /// Bindings: 0 height, 1 flux, 2 velocity (read-only storage), 3 view mode uniform.
    pub fn view_bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.view_layout
    }

    /// Bind group exposing the committed generations to a renderer
    ///
    /// Generations change with every stage, so build this after the tick it
    /// should show has been recorded.
    pub fn view_bind_group(&self) -> wgpu::BindGroup {
        self.context
            .device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("View Bind Group"),
                layout: &self.view_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self.height.read().as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: self.flux.read().as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: self.velocity.read().as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: self.view_buffer.as_entire_binding(),
                    },
                ],
            })
    }

    /// GPU context owned by this solver
    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    /// Copy a buffer into host memory, blocking until the copy is done
    fn read_buffer<T: Pod>(
        &self,
        source: &wgpu::Buffer,
        label: &str,
    ) -> Result<Vec<T>, ErosionError> {
        let device = self.context.device();
        let size = source.size();

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label} Staging")),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(&format!("{label} Readback Encoder")),
        });
        encoder.copy_buffer_to_buffer(source, 0, &staging, 0, size);
        self.context.queue().submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        let _ = device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| ErosionError::Readback(e.to_string()))?
            .map_err(|e| ErosionError::Readback(e.to_string()))?;

        let data = buffer_slice.get_mapped_range();
        let result = bytemuck::cast_slice::<u8, T>(&data).to_vec();
        drop(data);
        staging.unmap();

        Ok(result)
    }
}

impl ErosionSolver for GpuErosionSolver {
    fn set_params(&mut self, params: &ErosionParams) {
        self.params = *params;
        self.context.queue().write_buffer(
            &self.params_buffer,
            0,
            bytemuck::bytes_of(&GpuParams::new(self.width, params)),
        );
    }

    fn params(&self) -> &ErosionParams {
        &self.params
    }

    fn water_increment(&mut self) -> Result<(), ErosionError> {
        self.launch(Stage::WaterIncrement)
    }

    fn outflow_flux(&mut self) -> Result<(), ErosionError> {
        self.launch(Stage::OutflowFlux)
    }

    fn water_velocity(&mut self) -> Result<(), ErosionError> {
        self.launch(Stage::WaterVelocity)
    }

    fn erosion_deposition(&mut self) -> Result<(), ErosionError> {
        self.launch(Stage::ErosionDeposition)
    }

    fn transportation(&mut self) -> Result<(), ErosionError> {
        self.launch(Stage::Transportation)
    }

    fn evaporation(&mut self) -> Result<(), ErosionError> {
        self.launch(Stage::Evaporation)
    }

    fn read_height(&self) -> Result<Cow<'_, [HeightCell]>, ErosionError> {
        Ok(Cow::Owned(self.read_buffer(self.height.read(), "Height")?))
    }

    fn read_flux(&self) -> Result<Cow<'_, [FluxCell]>, ErosionError> {
        Ok(Cow::Owned(self.read_buffer(self.flux.read(), "Flux")?))
    }

    fn read_velocity(&self) -> Result<Cow<'_, [VelocityCell]>, ErosionError> {
        Ok(Cow::Owned(self.read_buffer(self.velocity.read(), "Velocity")?))
    }

    fn write_height(&mut self, cells: &[HeightCell]) -> Result<(), ErosionError> {
        let expected = (self.width as usize) * (self.width as usize);
        if cells.len() != expected {
            return Err(ErosionError::HeightfieldMismatch {
                expected,
                actual: cells.len(),
            });
        }
        self.context
            .queue()
            .write_buffer(self.height.read(), 0, bytemuck::cast_slice(cells));
        Ok(())
    }

    fn reseed(&mut self, bedrock: &[f32]) -> Result<(), ErosionError> {
        let cells: Vec<HeightCell> = bedrock.iter().copied().map(HeightCell::dry).collect();
        self.write_height(&cells)?;

        let queue = self.context.queue();
        let count = cells.len();
        queue.write_buffer(
            self.flux.read(),
            0,
            bytemuck::cast_slice(&vec![FluxCell::default(); count]),
        );
        queue.write_buffer(
            self.velocity.read(),
            0,
            bytemuck::cast_slice(&vec![VelocityCell::default(); count]),
        );
        Ok(())
    }

    fn dimensions(&self) -> (usize, usize) {
        (self.width as usize, self.width as usize)
    }

    fn is_gpu_accelerated(&self) -> bool {
        true
    }

    fn set_view_mode(&mut self, mode: ViewMode) {
        let uniform = ViewUniform {
            mode: mode.as_u32(),
            _padding: [0; 3],
        };
        self.context
            .queue()
            .write_buffer(&self.view_buffer, 0, bytemuck::bytes_of(&uniform));
    }
}
