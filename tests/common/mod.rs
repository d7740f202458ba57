//! Shared helpers for device-backed tests.

#![allow(dead_code)]

use gpu_ffnet::{Engine, EngineConfig, EngineError};

pub const TOLERANCE: f32 = 1e-5;

/// A seeded engine, or `None` when the machine exposes no adapter.
pub fn engine() -> Option<Engine> {
    engine_with(EngineConfig::new().with_seed(1234))
}

pub fn engine_with(config: EngineConfig) -> Option<Engine> {
    match Engine::init(config) {
        Ok(engine) => Some(engine),
        Err(EngineError::DeviceNotAvailable { message }) => {
            eprintln!("skipping device test: {}", message);
            None
        }
        Err(e) => panic!("engine initialization failed: {}", e),
    }
}

pub fn assert_close(actual: &[f32], expected: &[f32], tolerance: f32) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() < tolerance,
            "index {}: device {} vs host {}",
            i,
            a,
            e
        );
    }
}
