//! Device side of the engine: wgpu bootstrap, slot buffers and kernels.
//!
//! # Memory Layout
//!
//! Neuron and weight storage share one format, a 1×N array of 4-lane
//! [`Slot`]s:
//! - lane 0: value (activation, weight, or bias)
//! - lane 1: reserved, always 0
//! - lane 2: backpropagated error (neuron buffers only)
//! - lane 3: reserved, always 1
//!
//! A layer with `n` neurons fed by a layer with `p` neurons stores its weights
//! neuron-major with stride `p + 1`: slot `i * (p + 1) + j` connects input `j`
//! to neuron `i`, and slot `i * (p + 1) + p` is the bias of neuron `i`.

pub mod buffers;
pub mod context;
pub mod kernels;
pub mod shaders;

pub use buffers::{DeviceBuffer, Slot};
pub use context::GpuContext;
pub use kernels::{Kernel, KernelParams, KernelSet};
pub use shaders::kernel_wgsl;
