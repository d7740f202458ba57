//! The five compute kernels and their dispatch contract.
//!
//! Each kernel binds the shared [`KernelParams`] uniform at binding 0 and a
//! fixed list of storage buffers from binding 1 on. A dispatch runs one
//! invocation per output slot (neuron or weight); every invocation writes a
//! disjoint slot, so invocations never conflict within a dispatch.

use log::debug;
use pollster::FutureExt;

use crate::errors::{EngineError, EngineResult};
use crate::gpu::context::GpuContext;
use crate::gpu::shaders::kernel_wgsl;

/// Identifies one of the compiled kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// Fills a weight buffer with seeded values in (0, 1).
    WeightInit,
    /// Weighted sum plus bias, then activation, per neuron.
    Forward,
    /// Output-layer error from a target vector.
    ErrorGen,
    /// Hidden-layer error from the downstream layer's error and weights.
    Backprop,
    /// Per-weight gradient step.
    WeightUpdate,
}

impl Kernel {
    pub const ALL: [Kernel; 5] = [
        Kernel::WeightInit,
        Kernel::Forward,
        Kernel::ErrorGen,
        Kernel::Backprop,
        Kernel::WeightUpdate,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Kernel::WeightInit => "weight_init",
            Kernel::Forward => "forward",
            Kernel::ErrorGen => "error_gen",
            Kernel::Backprop => "backprop",
            Kernel::WeightUpdate => "weight_update",
        }
    }

    /// Storage bindings after the uniform, as `read_only` flags.
    fn storage_bindings(self) -> &'static [bool] {
        match self {
            Kernel::WeightInit => &[false],
            Kernel::ErrorGen => &[false, true],
            Kernel::Forward | Kernel::Backprop | Kernel::WeightUpdate => &[false, true, true],
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Scalar uniforms shared by every kernel (32 bytes, mirrors `KernelParams`
/// in `common.wgsl`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct KernelParams {
    /// Number of invocations that do work.
    pub count: u32,
    /// Neurons feeding the weight matrix the kernel works on.
    pub prev_size: u32,
    /// Neurons owning that weight matrix.
    pub layer_size: u32,
    pub activation: u32,
    pub seed: u32,
    pub learning_rate: f32,
    pub pad0: u32,
    pub pad1: u32,
}

impl KernelParams {
    pub const SIZE_BYTES: usize = 32;
}

/// Split `count` invocations into a 2D workgroup grid that respects the
/// per-dimension limit. Returns `(x, y)` workgroup counts.
pub fn workgroup_grid(count: u32, workgroup_size: u32, max_per_dimension: u32) -> (u32, u32) {
    let groups = count.div_ceil(workgroup_size.max(1)).max(1);
    let x = groups.min(max_per_dimension.max(1));
    let y = groups.div_ceil(x);
    (x, y)
}

struct CompiledKernel {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

/// All kernels compiled against one device.
pub struct KernelSet {
    kernels: Vec<CompiledKernel>,
    workgroup_size: u32,
}

impl KernelSet {
    /// Compile every kernel. Validation errors (bad WGSL, layout mismatch) are
    /// captured and reported instead of reaching the device's panic handler.
    pub fn compile(context: &GpuContext, workgroup_size: u32) -> EngineResult<Self> {
        let device = context.device();
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let kernels = Kernel::ALL
            .iter()
            .map(|&kernel| Self::compile_one(device, kernel, workgroup_size))
            .collect();

        if let Some(error) = device.pop_error_scope().block_on() {
            return Err(EngineError::ShaderCompilationFailed {
                message: error.to_string(),
            });
        }

        Ok(Self {
            kernels,
            workgroup_size,
        })
    }

    fn compile_one(device: &wgpu::Device, kernel: Kernel, workgroup_size: u32) -> CompiledKernel {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(kernel.label()),
            source: wgpu::ShaderSource::Wgsl(kernel_wgsl(kernel, workgroup_size).into()),
        });

        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }];
        for (offset, &read_only) in kernel.storage_bindings().iter().enumerate() {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: offset as u32 + 1,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(kernel.label()),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(kernel.label()),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(kernel.label()),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        CompiledKernel { layout, pipeline }
    }

    pub fn workgroup_size(&self) -> u32 {
        self.workgroup_size
    }

    /// Run one kernel and wait for it to finish.
    ///
    /// The dispatch is encoded in its own compute pass and submission, and the
    /// host blocks on the device before returning. That wait is the memory
    /// barrier between this dispatch and whichever dispatch reads its output.
    pub fn dispatch(
        &self,
        context: &GpuContext,
        params_buffer: &wgpu::Buffer,
        kernel: Kernel,
        params: KernelParams,
        storage: &[&wgpu::Buffer],
    ) -> EngineResult<()> {
        debug_assert_eq!(storage.len(), kernel.storage_bindings().len());
        if params.count == 0 {
            return Ok(());
        }

        let device = context.device();
        let queue = context.queue();
        let compiled = &self.kernels[kernel.index()];
        let (x, y) = workgroup_grid(
            params.count,
            self.workgroup_size,
            context.max_workgroups_per_dimension(),
        );
        debug!(
            "dispatch {} over {} invocations ({}x{} workgroups)",
            kernel.label(),
            params.count,
            x,
            y
        );

        queue.write_buffer(params_buffer, 0, bytemuck::bytes_of(&params));

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: params_buffer.as_entire_binding(),
        }];
        for (offset, buffer) in storage.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: offset as u32 + 1,
                resource: buffer.as_entire_binding(),
            });
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(kernel.label()),
            layout: &compiled.layout,
            entries: &entries,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(kernel.label()),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(kernel.label()),
                timestamp_writes: None,
            });
            pass.set_pipeline(&compiled.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(x, y, 1);
        }
        queue.submit(Some(encoder.finish()));

        if let Some(error) = device.pop_error_scope().block_on() {
            return Err(EngineError::DispatchFailed {
                kernel: kernel.label(),
                message: error.to_string(),
            });
        }

        context.wait_idle();
        Ok(())
    }
}
