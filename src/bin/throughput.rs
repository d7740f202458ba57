//! Throughput benchmark for device forward and training passes.
//!
//! Builds a wide network, checks that the device agrees with the host
//! implementation, then times forward passes and full training steps on both.
//! An optional first argument names a JSON engine configuration file.

use gpu_ffnet::{Engine, EngineConfig, HostNetwork, Network};
use log::{error, info};
use std::time::Instant;

const INPUT_SIZE: usize = 32;
const HIDDEN_SIZES: [usize; 2] = [1024, 256];
const OUTPUT_SIZE: usize = 10;
const LEARNING_RATE: f32 = 0.05;

struct ThroughputResult {
    method: String,
    total_time_ns: u128,
    num_executions: u32,
}

impl ThroughputResult {
    fn average_time_ms(&self) -> f64 {
        self.total_time_ns as f64 / self.num_executions as f64 / 1_000_000.0
    }

    fn per_second(&self) -> f64 {
        1000.0 / self.average_time_ms()
    }
}

fn benchmark_method<F>(name: &str, num_executions: u32, mut benchmark_fn: F) -> ThroughputResult
where
    F: FnMut(),
{
    info!("Benchmarking {} ({} executions)...", name, num_executions);

    for _ in 0..5 {
        benchmark_fn();
    }

    let start = Instant::now();
    for _ in 0..num_executions {
        benchmark_fn();
    }

    ThroughputResult {
        method: name.to_string(),
        total_time_ns: start.elapsed().as_nanos(),
        num_executions,
    }
}

fn outputs_match(host: &[f32], device: &[f32]) -> bool {
    const EPSILON: f32 = 1e-4;
    host.len() == device.len()
        && host
            .iter()
            .zip(device)
            .all(|(h, d)| (h - d).abs() <= EPSILON)
}

fn main() {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => match EngineConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                error!("{}", e);
                return;
            }
        },
        None => EngineConfig::default(),
    };

    let engine = match Engine::init(config) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Cannot start engine: {}", e);
            return;
        }
    };
    info!("Adapter: {:?}", engine.context().adapter_info().name);

    let mut network = match Network::builder(&engine, INPUT_SIZE, &HIDDEN_SIZES, OUTPUT_SIZE) {
        Ok(network) => network,
        Err(e) => {
            error!("Cannot build network: {}", e);
            return;
        }
    };
    let mut host = match network.to_record(&engine) {
        Ok(record) => HostNetwork::from_record(&record),
        Err(e) => {
            error!("Cannot read weights back: {}", e);
            return;
        }
    };

    let inputs: Vec<f32> = (0..INPUT_SIZE).map(|i| (i as f32 * 0.37).sin()).collect();
    let target: Vec<f32> = (0..OUTPUT_SIZE).map(|i| (i % 2) as f32).collect();

    let verified = network
        .send_inputs(&engine, &inputs)
        .and_then(|_| network.trigger_network(&engine))
        .and_then(|_| network.fetch_output_layer_data(&engine).map(<[f32]>::to_vec));
    match verified {
        Ok(device) if outputs_match(&host.predict(&inputs), &device) => {
            info!("Device and host outputs match: {:?}", &device[..3]);
        }
        Ok(device) => {
            error!("Device output {:?} disagrees with host", &device[..3]);
            return;
        }
        Err(e) => {
            error!("Forward pass failed: {}", e);
            return;
        }
    }

    let num_executions = 200;
    let mut failure = None;
    let results = [
        benchmark_method("Host forward", num_executions, || {
            host.predict(&inputs);
        }),
        benchmark_method("Device forward", num_executions, || {
            if let Err(e) = network
                .send_inputs(&engine, &inputs)
                .and_then(|_| network.trigger_network(&engine))
            {
                failure.get_or_insert(e);
            }
        }),
        benchmark_method("Device training step", num_executions, || {
            if let Err(e) = network
                .trigger_network(&engine)
                .and_then(|_| network.train_network(&engine, &target, LEARNING_RATE))
            {
                failure.get_or_insert(e);
            }
        }),
    ];
    if let Some(e) = failure {
        error!("Dispatch failed during benchmark: {}", e);
        return;
    }

    info!("{}", "=".repeat(60));
    info!("Network {:?}", network.layer_sizes());
    for result in &results {
        info!(
            "{:<24} {:>10.3} ms  {:>10.1} /s",
            result.method,
            result.average_time_ms(),
            result.per_second()
        );
    }
}
