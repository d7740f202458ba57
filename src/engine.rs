//! The engine context threaded through every network operation.

use std::cell::RefCell;

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::EngineConfig;
use crate::errors::EngineResult;
use crate::gpu::{GpuContext, Kernel, KernelParams, KernelSet};

/// Compiled kernels, device handles and shared scratch state.
///
/// Several engines may live in one process; networks must only be used with
/// the engine that created them.
pub struct Engine {
    context: GpuContext,
    kernels: KernelSet,
    params_buffer: wgpu::Buffer,
    seeds: RefCell<StdRng>,
    config: EngineConfig,
}

impl Engine {
    /// Acquire a device and compile every kernel.
    ///
    /// Fails as a whole: if any kernel does not compile no engine is returned.
    pub fn init(config: EngineConfig) -> EngineResult<Self> {
        let context = GpuContext::new(&config)?;
        let kernels = KernelSet::compile(&context, config.workgroup_size())?;

        let params_buffer = context.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("Kernel Params"),
            size: KernelParams::SIZE_BYTES as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let seeds = match config.seed() {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        info!(
            "Engine ready: {} kernels, workgroup size {}",
            Kernel::ALL.len(),
            kernels.workgroup_size()
        );

        Ok(Self {
            context,
            kernels,
            params_buffer,
            seeds: RefCell::new(seeds),
            config,
        })
    }

    /// Engine with the default configuration.
    pub fn new() -> EngineResult<Self> {
        Self::init(EngineConfig::default())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    pub fn device(&self) -> &wgpu::Device {
        self.context.device()
    }

    pub fn queue(&self) -> &wgpu::Queue {
        self.context.queue()
    }

    /// Fresh seed for one weight-initializer dispatch.
    pub(crate) fn next_seed(&self) -> u32 {
        self.seeds.borrow_mut().r#gen()
    }

    /// Dispatch `kernel` and wait for it; see [`KernelSet::dispatch`].
    pub(crate) fn dispatch(
        &self,
        kernel: Kernel,
        params: KernelParams,
        storage: &[&wgpu::Buffer],
    ) -> EngineResult<()> {
        self.kernels
            .dispatch(&self.context, &self.params_buffer, kernel, params, storage)
    }
}
