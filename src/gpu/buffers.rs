//! Device buffers holding neuron and weight slots.
//!
//! Every buffer is a 1×N array of 4-lane [`Slot`]s. Lane 0 carries the value
//! (activation, weight or bias) and lane 2 the backpropagated error; the other
//! two lanes are reserved and always written as `0` and `1`.

use std::sync::mpsc;

use wgpu::util::DeviceExt;

use crate::errors::{EngineError, EngineResult};
use crate::gpu::context::GpuContext;

/// One neuron or weight as laid out in device memory (16 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Slot {
    pub value: f32,
    pub reserved: f32,
    pub error: f32,
    pub alpha: f32,
}

impl Slot {
    pub const SIZE_BYTES: usize = 16;

    pub fn from_value(value: f32) -> Self {
        Self {
            value,
            reserved: 0.0,
            error: 0.0,
            alpha: 1.0,
        }
    }
}

/// Byte size of `len` slots, provided a storage buffer that large can be
/// created and bound whole on a device with `limits`.
pub fn checked_size(label: &str, len: usize, limits: &wgpu::Limits) -> EngineResult<u64> {
    let limit = limits
        .max_buffer_size
        .min(u64::from(limits.max_storage_buffer_binding_size));
    let bytes = (len as u64).saturating_mul(Slot::SIZE_BYTES as u64);
    if bytes > limit {
        return Err(EngineError::BufferTooLarge {
            label: label.to_string(),
            bytes,
            limit,
        });
    }
    Ok(bytes)
}

/// A storage buffer of `len` slots, exclusively owned by one layer.
#[derive(Debug)]
pub struct DeviceBuffer {
    buffer: wgpu::Buffer,
    len: usize,
    label: String,
}

impl DeviceBuffer {
    const USAGE: wgpu::BufferUsages = wgpu::BufferUsages::STORAGE
        .union(wgpu::BufferUsages::COPY_SRC)
        .union(wgpu::BufferUsages::COPY_DST);

    /// Allocate a zeroed buffer of `len` slots.
    pub fn new(device: &wgpu::Device, label: &str, len: usize) -> EngineResult<Self> {
        if len == 0 {
            return Err(EngineError::InvalidLayerSize);
        }
        let size = checked_size(label, len, &device.limits())?;
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: Self::USAGE,
            mapped_at_creation: false,
        });
        Ok(Self {
            buffer,
            len,
            label: label.to_string(),
        })
    }

    /// Allocate a buffer initialized with `slots`.
    pub fn from_slots(device: &wgpu::Device, label: &str, slots: &[Slot]) -> EngineResult<Self> {
        if slots.is_empty() {
            return Err(EngineError::InvalidLayerSize);
        }
        checked_size(label, slots.len(), &device.limits())?;
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(slots),
            usage: Self::USAGE,
        });
        Ok(Self {
            buffer,
            len: slots.len(),
            label: label.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn size_bytes(&self) -> wgpu::BufferAddress {
        (self.len * Slot::SIZE_BYTES) as wgpu::BufferAddress
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Overwrite the whole buffer. The write lands before the next submission.
    pub fn write_slots(&self, queue: &wgpu::Queue, slots: &[Slot]) {
        debug_assert_eq!(slots.len(), self.len);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(slots));
    }

    /// Overwrite lane 0 of every slot, clearing the error lane.
    pub fn write_values(&self, queue: &wgpu::Queue, values: &[f32]) {
        let slots: Vec<Slot> = values.iter().copied().map(Slot::from_value).collect();
        self.write_slots(queue, &slots);
    }

    /// Copy the buffer into a mappable staging buffer and read it on the host.
    pub fn read_slots(&self, context: &GpuContext) -> EngineResult<Vec<Slot>> {
        let device = context.device();
        let size = self.size_bytes();

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Staging Buffer"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        encoder.copy_buffer_to_buffer(&self.buffer, 0, &staging, 0, size);
        context.queue().submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        context.wait_idle();

        let mapped = receiver.recv().map_err(|e| EngineError::BufferMapFailed {
            label: self.label.clone(),
            message: e.to_string(),
        })?;
        mapped.map_err(|e| EngineError::BufferMapFailed {
            label: self.label.clone(),
            message: e.to_string(),
        })?;

        let data = slice.get_mapped_range();
        let slots: Vec<Slot> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        staging.unmap();

        Ok(slots)
    }

    /// Lane 0 of every slot.
    pub fn read_values(&self, context: &GpuContext) -> EngineResult<Vec<f32>> {
        Ok(self
            .read_slots(context)?
            .into_iter()
            .map(|slot| slot.value)
            .collect())
    }

    /// Lane 2 of every slot.
    pub fn read_errors(&self, context: &GpuContext) -> EngineResult<Vec<f32>> {
        Ok(self
            .read_slots(context)?
            .into_iter()
            .map(|slot| slot.error)
            .collect())
    }
}
