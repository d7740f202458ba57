//! Headless wgpu device bootstrap.

use log::info;
use pollster::FutureExt;

use crate::config::EngineConfig;
use crate::errors::{EngineError, EngineResult};

/// Adapter, device and queue the engine dispatches on.
pub struct GpuContext {
    adapter_info: wgpu::AdapterInfo,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl GpuContext {
    /// Request an adapter and a device without any surface.
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        Self::new_async(config).block_on()
    }

    pub async fn new_async(config: &EngineConfig) -> EngineResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: config.power_preference().into(),
                force_fallback_adapter: config.force_fallback_adapter(),
                compatible_surface: None,
            })
            .await
            .ok_or_else(|| EngineError::DeviceNotAvailable {
                message: "no compatible adapter found".to_string(),
            })?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("gpu-ffnet device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| EngineError::DeviceNotAvailable {
                message: e.to_string(),
            })?;

        let adapter_info = adapter.get_info();
        info!(
            "Using adapter '{}' ({:?} backend)",
            adapter_info.name, adapter_info.backend
        );

        Ok(Self {
            adapter_info,
            device,
            queue,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    /// Largest workgroup count the device accepts along one dimension.
    pub fn max_workgroups_per_dimension(&self) -> u32 {
        self.device.limits().max_compute_workgroups_per_dimension
    }

    /// Block until every submitted command has finished executing.
    pub fn wait_idle(&self) {
        self.device.poll(wgpu::Maintain::Wait);
    }
}
