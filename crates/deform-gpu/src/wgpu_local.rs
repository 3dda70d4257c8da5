//! GPU local step via a wgpu compute shader.
//!
//! `prepare` uploads the incidence layout once; every `project` call
//! uploads positions, dispatches one invocation per vertex, copies the
//! result into a staging buffer and blocks until it is mapped.

#![allow(clippy::cast_possible_truncation)] // usize→u32 vertex counts

use std::mem::size_of;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use tracing::debug;
use wgpu::util::DeviceExt;
use wgpu::BufferUsages;

use deform_types::{DeformError, DeformResult};

use crate::backend::{check_project_args, LocalSolver};
use crate::context::GpuContext;
use crate::layout::{GpuIncidence, ProjectionLayout};

/// WGSL shader source, loaded at compile time.
const LOCAL_STEP_SHADER: &str = include_str!("shaders/local_step.wgsl");

const WORKGROUP_SIZE: u32 = 64;

/// Shader parameters matching the WGSL `Params` struct layout.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct GpuParams {
    vertex_count: u32,
    _pad: [u32; 3],
}

/// Device buffers for one prepared layout.
struct LayoutBuffers {
    vertex_count: u32,
    positions: wgpu::Buffer,
    rhs: wgpu::Buffer,
    staging: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Local-step executor running on the GPU.
pub struct WgpuLocalSolver {
    ctx: &'static GpuContext,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    buffers: Option<LayoutBuffers>,
}

impl std::fmt::Debug for WgpuLocalSolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuLocalSolver")
            .field("adapter", &self.ctx.adapter_info().name)
            .field("vertex_count", &self.buffers.as_ref().map(|b| b.vertex_count))
            .finish_non_exhaustive()
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Byte contents padded to at least `min_len` bytes (wgpu requires size > 0).
fn padded_bytes(bytes: &[u8], min_len: usize) -> Vec<u8> {
    let mut out = bytes.to_vec();
    if out.len() < min_len {
        out.resize(min_len, 0);
    }
    out
}

impl WgpuLocalSolver {
    /// Compiles the local-step pipeline on the global GPU context.
    ///
    /// # Errors
    ///
    /// Returns [`DeformError::Gpu`] if no compatible GPU is available.
    pub fn new() -> DeformResult<Self> {
        let ctx = GpuContext::get()
            .ok_or_else(|| DeformError::Gpu("no compatible GPU available".into()))?;

        let shader_module = ctx
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("local_step"),
                source: wgpu::ShaderSource::Wgsl(LOCAL_STEP_SHADER.into()),
            });

        let bind_group_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("local_step_bgl"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                        storage_entry(1, true),
                        storage_entry(2, true),
                        storage_entry(3, true),
                        storage_entry(4, false),
                    ],
                });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("local_step_pl"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let pipeline = ctx
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("local_step"),
                layout: Some(&pipeline_layout),
                module: &shader_module,
                entry_point: Some("local_step"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            });

        Ok(Self {
            ctx,
            pipeline,
            bind_group_layout,
            buffers: None,
        })
    }

    fn check_size(&self, what: &str, bytes: usize) -> DeformResult<()> {
        let limit = u64::from(self.ctx.limits.max_storage_buffer_binding_size);
        if bytes as u64 > limit {
            return Err(DeformError::Gpu(format!(
                "{what} buffer needs {bytes}B, limit: {limit}B"
            )));
        }
        Ok(())
    }
}

impl LocalSolver for WgpuLocalSolver {
    fn name(&self) -> &str {
        "wgpu"
    }

    fn is_gpu(&self) -> bool {
        true
    }

    fn prepare(&mut self, layout: &ProjectionLayout) -> DeformResult<()> {
        self.buffers = None;

        let device = &self.ctx.device;
        let vertex_count = layout.vertex_count() as u32;
        let vec_bytes = layout.vertex_count() * 3 * size_of::<f32>();
        let incidence_bytes: &[u8] = bytemuck::cast_slice(layout.incidences());
        self.check_size("position", vec_bytes)?;
        self.check_size("incidence", incidence_bytes.len())?;

        let params = GpuParams {
            vertex_count,
            _pad: [0; 3],
        };
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("local_step_params"),
            contents: bytemuck::cast_slice(&[params]),
            usage: BufferUsages::UNIFORM,
        });
        let offsets = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("local_step_offsets"),
            contents: &padded_bytes(bytemuck::cast_slice(layout.offsets()), size_of::<u32>()),
            usage: BufferUsages::STORAGE,
        });
        let incidences = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("local_step_incidences"),
            contents: &padded_bytes(incidence_bytes, size_of::<GpuIncidence>()),
            usage: BufferUsages::STORAGE,
        });

        let buf_size = (vec_bytes as u64).max(4);
        let positions = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("local_step_positions"),
            size: buf_size,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let rhs = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("local_step_rhs"),
            size: buf_size,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("local_step_staging"),
            size: buf_size,
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("local_step_bg"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: positions.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: offsets.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: incidences.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: rhs.as_entire_binding(),
                },
            ],
        });

        debug!(
            vertex_count,
            incidences = layout.incidences().len(),
            "GPU local step prepared"
        );

        self.buffers = Some(LayoutBuffers {
            vertex_count,
            positions,
            rhs,
            staging,
            bind_group,
        });
        Ok(())
    }

    fn is_prepared(&self) -> bool {
        self.buffers.is_some()
    }

    fn project(&mut self, q: &[Vec3], b: &mut [Vec3]) -> DeformResult<()> {
        let buffers = self
            .buffers
            .as_ref()
            .ok_or_else(|| DeformError::NotPrecomputed("GPU local step not prepared".into()))?;
        check_project_args(buffers.vertex_count as usize, q, b)?;
        if q.is_empty() {
            return Ok(());
        }

        let ctx = self.ctx;
        let flat: Vec<f32> = q.iter().flat_map(|p| p.to_array()).collect();
        ctx.queue
            .write_buffer(&buffers.positions, 0, bytemuck::cast_slice(&flat));

        let byte_len = (flat.len() * size_of::<f32>()) as u64;
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("local_step_encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("local_step_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &buffers.bind_group, &[]);
            pass.dispatch_workgroups(buffers.vertex_count.div_ceil(WORKGROUP_SIZE), 1, 1);
        }
        encoder.copy_buffer_to_buffer(&buffers.rhs, 0, &buffers.staging, 0, byte_len);
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let staging_slice = buffers.staging.slice(..byte_len);
        let (sender, receiver) = std::sync::mpsc::channel();
        staging_slice.map_async(wgpu::MapMode::Read, move |result| {
            drop(sender.send(result));
        });
        ctx.device.poll(wgpu::Maintain::Wait);

        receiver
            .recv()
            .map_err(|e| DeformError::Gpu(format!("channel recv failed: {e}")))?
            .map_err(|e| DeformError::Gpu(format!("buffer mapping failed: {e}")))?;

        {
            let mapped = staging_slice.get_mapped_range();
            let values: &[f32] = bytemuck::cast_slice(&mapped);
            for (bi, chunk) in b.iter_mut().zip(values.chunks_exact(3)) {
                *bi = Vec3::new(chunk[0], chunk[1], chunk[2]);
            }
        }
        buffers.staging.unmap();
        Ok(())
    }
}
