//! Forward and training passes: sequencing kernel dispatches over the chain.

use log::debug;
use wgpu::util::DeviceExt;

use crate::engine::Engine;
use crate::errors::{EngineError, EngineResult};
use crate::gpu::{Kernel, KernelParams};
use crate::network::graph::Network;

/// One dispatch of a training step, addressed by layer depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingStep {
    /// Output-layer error from the target vector.
    GenerateError { depth: usize },
    /// Error of the hidden layer at `depth` from the layer at `depth + 1`.
    Backpropagate { depth: usize },
    /// Gradient step on the weights feeding the layer at `depth`.
    UpdateWeights { depth: usize },
}

/// Dispatch order of one training step for a chain of `layer_count` layers.
///
/// Every backpropagation reads downstream weights, so all of them run before
/// the first weight update.
pub fn training_schedule(layer_count: usize) -> Vec<TrainingStep> {
    if layer_count < 2 {
        return Vec::new();
    }
    let output = layer_count - 1;
    let mut steps = Vec::with_capacity(2 * output);

    steps.push(TrainingStep::GenerateError { depth: output });
    steps.extend((1..output).rev().map(|depth| TrainingStep::Backpropagate { depth }));
    steps.push(TrainingStep::UpdateWeights { depth: output });
    steps.extend((1..output).rev().map(|depth| TrainingStep::UpdateWeights { depth }));
    steps
}

impl Network {
    /// Upload a new input vector. Does not propagate.
    pub fn send_inputs(&self, engine: &Engine, inputs: &[f32]) -> EngineResult<()> {
        if inputs.len() != self.input_size() {
            return Err(EngineError::InputSizeMismatch {
                expected: self.input_size(),
                actual: inputs.len(),
            });
        }
        self.layer(0).neurons().write_values(engine.queue(), inputs);
        Ok(())
    }

    /// Run forward propagation for the layer at `depth`. Depth 0 is the input
    /// layer and has nothing to compute.
    pub fn trigger_layer(&self, engine: &Engine, depth: usize) -> EngineResult<()> {
        self.check_depth(depth)?;
        if depth == 0 {
            return Ok(());
        }

        let (prev, layer) = self.connected_pair(depth)?;
        let weights = layer.weights().ok_or(EngineError::InputLayerHasNoWeights)?;
        engine.dispatch(
            Kernel::Forward,
            KernelParams {
                count: layer.neuron_count() as u32,
                prev_size: prev.neuron_count() as u32,
                layer_size: layer.neuron_count() as u32,
                activation: layer.activation().id(),
                ..Default::default()
            },
            &[layer.neurons().buffer(), prev.neurons().buffer(), weights.buffer()],
        )
    }

    /// Propagate through every non-input layer, front to back.
    pub fn trigger_network(&self, engine: &Engine) -> EngineResult<()> {
        for depth in 1..self.layer_count() {
            self.trigger_layer(engine, depth)?;
        }
        Ok(())
    }

    /// Refresh [`Network::cached_output`] from the device.
    pub fn fetch_output_layer_data(&mut self, engine: &Engine) -> EngineResult<&[f32]> {
        let output = self.layer_count() - 1;
        let values = self.layer(output).neurons().read_values(engine.context())?;
        self.set_cached_output(values);
        Ok(self.cached_output())
    }

    /// One stochastic gradient step towards `target` for the most recently
    /// propagated input.
    pub fn train_network(
        &self,
        engine: &Engine,
        target: &[f32],
        learning_rate: f32,
    ) -> EngineResult<()> {
        self.train_with_steps(
            engine,
            target,
            learning_rate,
            &training_schedule(self.layer_count()),
        )
    }

    /// Run a training step with an explicit dispatch order.
    ///
    /// Only [`training_schedule`] yields a true gradient step; other orders
    /// let backpropagation read weights that were already updated.
    pub fn train_with_steps(
        &self,
        engine: &Engine,
        target: &[f32],
        learning_rate: f32,
        steps: &[TrainingStep],
    ) -> EngineResult<()> {
        if self.layer_count() < 2 {
            return Err(EngineError::TooFewLayers {
                layer_count: self.layer_count(),
            });
        }
        if target.len() != self.output_size() {
            return Err(EngineError::OutputSizeMismatch {
                expected: self.output_size(),
                actual: target.len(),
            });
        }
        for depth in 1..self.layer_count() {
            self.connected_pair(depth)?;
        }
        for &step in steps {
            self.check_training_step(step)?;
        }

        let target_buffer = engine
            .device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Target Buffer"),
                contents: bytemuck::cast_slice(target),
                usage: wgpu::BufferUsages::STORAGE,
            });

        for &step in steps {
            debug!("training step {:?}", step);
            self.run_training_step(engine, step, &target_buffer, learning_rate)?;
        }
        Ok(())
    }

    /// Reject steps addressing a layer they cannot run on, before anything is
    /// dispatched.
    fn check_training_step(&self, step: TrainingStep) -> EngineResult<()> {
        let output = self.layer_count() - 1;
        match step {
            TrainingStep::GenerateError { depth } => {
                self.check_depth(depth)?;
                if depth != output {
                    return Err(EngineError::InvalidTrainingStep {
                        depth,
                        reason: "errors are generated only for the output layer",
                    });
                }
            }
            TrainingStep::Backpropagate { depth } => {
                self.check_depth(depth)?;
                if depth == 0 || depth == output {
                    return Err(EngineError::InvalidTrainingStep {
                        depth,
                        reason: "errors are backpropagated only into hidden layers",
                    });
                }
            }
            TrainingStep::UpdateWeights { depth } => {
                self.check_depth(depth)?;
                if depth == 0 {
                    return Err(EngineError::InvalidTrainingStep {
                        depth,
                        reason: "the input layer has no weights to update",
                    });
                }
            }
        }
        Ok(())
    }

    fn run_training_step(
        &self,
        engine: &Engine,
        step: TrainingStep,
        target_buffer: &wgpu::Buffer,
        learning_rate: f32,
    ) -> EngineResult<()> {
        match step {
            TrainingStep::GenerateError { depth } => {
                let layer = self.layer(depth);
                engine.dispatch(
                    Kernel::ErrorGen,
                    KernelParams {
                        count: layer.neuron_count() as u32,
                        layer_size: layer.neuron_count() as u32,
                        activation: layer.activation().id(),
                        ..Default::default()
                    },
                    &[layer.neurons().buffer(), target_buffer],
                )
            }
            TrainingStep::Backpropagate { depth } => {
                let layer = self.layer(depth);
                let (_, downstream) = self.connected_pair(depth + 1)?;
                let downstream_weights = downstream
                    .weights()
                    .ok_or(EngineError::InputLayerHasNoWeights)?;
                engine.dispatch(
                    Kernel::Backprop,
                    KernelParams {
                        count: layer.neuron_count() as u32,
                        prev_size: layer.neuron_count() as u32,
                        layer_size: downstream.neuron_count() as u32,
                        activation: layer.activation().id(),
                        ..Default::default()
                    },
                    &[
                        layer.neurons().buffer(),
                        downstream.neurons().buffer(),
                        downstream_weights.buffer(),
                    ],
                )
            }
            TrainingStep::UpdateWeights { depth } => {
                let (prev, layer) = self.connected_pair(depth)?;
                let weights = layer.weights().ok_or(EngineError::InputLayerHasNoWeights)?;
                engine.dispatch(
                    Kernel::WeightUpdate,
                    KernelParams {
                        count: layer.weight_count() as u32,
                        prev_size: prev.neuron_count() as u32,
                        layer_size: layer.neuron_count() as u32,
                        learning_rate,
                        ..Default::default()
                    },
                    &[weights.buffer(), layer.neurons().buffer(), prev.neurons().buffer()],
                )
            }
        }
    }
}
