//! Error types for device setup, kernel dispatch and network topology.

use thiserror::Error;

/// Errors raised by the engine and by network operations.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("GPU device not available: {message}")]
    DeviceNotAvailable { message: String },

    #[error("Shader compilation failed: {message}")]
    ShaderCompilationFailed { message: String },

    #[error("Dispatch of {kernel} failed: {message}")]
    DispatchFailed {
        kernel: &'static str,
        message: String,
    },

    #[error("Mapping {label} for readback failed: {message}")]
    BufferMapFailed { label: String, message: String },

    #[error("Buffer {label} needs {bytes} bytes but the device allows at most {limit}")]
    BufferTooLarge { label: String, bytes: u64, limit: u64 },

    #[error("The size of the layer must be greater than 0")]
    InvalidLayerSize,

    #[error("Layer depth {depth} is out of range for a network of {layer_count} layers")]
    LayerDepthOutOfRange { depth: usize, layer_count: usize },

    #[error(
        "Layer at depth {depth} holds {actual} weights but its predecessor requires {expected}; connect it first"
    )]
    LayerNotConnected {
        depth: usize,
        expected: usize,
        actual: usize,
    },

    #[error("The input layer has no weights")]
    InputLayerHasNoWeights,

    #[error("Input vector has {actual} values but the input layer has {expected} neurons")]
    InputSizeMismatch { expected: usize, actual: usize },

    #[error("Target vector has {actual} values but the output layer has {expected} neurons")]
    OutputSizeMismatch { expected: usize, actual: usize },

    #[error("Weight vector has {actual} values but layer {depth} holds {expected}")]
    WeightCountMismatch {
        depth: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Training step at depth {depth} is invalid: {reason}")]
    InvalidTrainingStep { depth: usize, reason: &'static str },

    #[error("A network needs at least 2 layers, got {layer_count}")]
    TooFewLayers { layer_count: usize },
}
