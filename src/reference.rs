//! Host implementation of the kernel math.
//!
//! [`HostNetwork`] runs the same forward, error, backpropagation and update
//! formulas as the WGSL kernels, slot for slot, on plain vectors. It is the
//! baseline device results are compared against and it executes the same
//! [`TrainingStep`] schedules as [`Network`](crate::Network).

use crate::activation::ActivationKind;
use crate::network::{NetworkRecord, TrainingStep, training_schedule};

#[derive(Debug, Clone, PartialEq)]
struct HostLayer {
    activation: ActivationKind,
    values: Vec<f32>,
    errors: Vec<f32>,
    /// Neuron-major with stride `prev + 1`; empty for the input layer.
    weights: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostNetwork {
    layers: Vec<HostLayer>,
}

impl HostNetwork {
    /// A network with the given layer sizes and weights for every non-input
    /// layer, in forward order.
    ///
    /// # Panics
    /// If a weight vector does not match `(prev + 1) * size`.
    pub fn new(sizes: &[usize], weights: Vec<Vec<f32>>) -> Self {
        assert!(sizes.len() >= 2, "a network needs at least 2 layers");
        assert_eq!(weights.len(), sizes.len() - 1);

        let mut layers = vec![HostLayer {
            activation: ActivationKind::default(),
            values: vec![0.0; sizes[0]],
            errors: vec![0.0; sizes[0]],
            weights: Vec::new(),
        }];
        for (depth, layer_weights) in weights.into_iter().enumerate() {
            let prev = sizes[depth];
            let size = sizes[depth + 1];
            assert_eq!(
                layer_weights.len(),
                (prev + 1) * size,
                "weights of layer {} do not match its topology",
                depth + 1
            );
            layers.push(HostLayer {
                activation: ActivationKind::default(),
                values: vec![0.0; size],
                errors: vec![0.0; size],
                weights: layer_weights,
            });
        }
        Self { layers }
    }

    pub fn from_record(record: &NetworkRecord) -> Self {
        let mut weights: Vec<Vec<f32>> = record.hidden.iter().map(|h| h.weights.clone()).collect();
        weights.push(record.output_weights.clone());
        Self::new(&record.layer_sizes(), weights)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn set_activations(&mut self, hidden: ActivationKind, output: ActivationKind) {
        let last = self.layers.len() - 1;
        for (depth, layer) in self.layers.iter_mut().enumerate().skip(1) {
            layer.activation = if depth == last { output } else { hidden };
        }
    }

    pub fn weights(&self, depth: usize) -> &[f32] {
        &self.layers[depth].weights
    }

    pub fn errors(&self, depth: usize) -> &[f32] {
        &self.layers[depth].errors
    }

    pub fn output(&self) -> &[f32] {
        &self.layers[self.layers.len() - 1].values
    }

    /// Set the inputs and propagate through every layer.
    pub fn predict(&mut self, inputs: &[f32]) -> Vec<f32> {
        assert_eq!(inputs.len(), self.layers[0].values.len());
        self.layers[0].values.copy_from_slice(inputs);
        for depth in 1..self.layers.len() {
            self.forward(depth);
        }
        self.output().to_vec()
    }

    fn forward(&mut self, depth: usize) {
        let (before, after) = self.layers.split_at_mut(depth);
        let prev = &before[depth - 1];
        let layer = &mut after[0];
        let stride = prev.values.len() + 1;

        for (neuron, value) in layer.values.iter_mut().enumerate() {
            let start = neuron * stride;
            let mut sum = 0.0f32;
            for (j, &x) in prev.values.iter().enumerate() {
                sum += x * layer.weights[start + j];
            }
            sum += layer.weights[start + stride - 1];
            *value = layer.activation.apply(sum);
        }
    }

    /// One training step with the standard two-phase schedule.
    pub fn train(&mut self, target: &[f32], learning_rate: f32) {
        let steps = training_schedule(self.layers.len());
        self.train_with_steps(target, learning_rate, &steps);
    }

    /// One training step with an explicit dispatch order.
    pub fn train_with_steps(&mut self, target: &[f32], learning_rate: f32, steps: &[TrainingStep]) {
        for &step in steps {
            match step {
                TrainingStep::GenerateError { depth } => self.generate_error(depth, target),
                TrainingStep::Backpropagate { depth } => self.backpropagate(depth),
                TrainingStep::UpdateWeights { depth } => self.update_weights(depth, learning_rate),
            }
        }
    }

    fn generate_error(&mut self, depth: usize, target: &[f32]) {
        let layer = &mut self.layers[depth];
        assert_eq!(target.len(), layer.values.len());
        for ((error, &y), &t) in layer.errors.iter_mut().zip(&layer.values).zip(target) {
            *error = (t - y) * layer.activation.derivative(y);
        }
    }

    fn backpropagate(&mut self, depth: usize) {
        let (before, after) = self.layers.split_at_mut(depth + 1);
        let layer = &mut before[depth];
        let downstream = &after[0];
        let stride = layer.values.len() + 1;

        for (neuron, (error, &y)) in layer.errors.iter_mut().zip(&layer.values).enumerate() {
            let mut acc = 0.0f32;
            for (k, &downstream_error) in downstream.errors.iter().enumerate() {
                acc += downstream_error * downstream.weights[k * stride + neuron];
            }
            *error = acc * layer.activation.derivative(y);
        }
    }

    fn update_weights(&mut self, depth: usize, learning_rate: f32) {
        let (before, after) = self.layers.split_at_mut(depth);
        let prev = &before[depth - 1];
        let layer = &mut after[0];
        let stride = prev.values.len() + 1;

        for (index, weight) in layer.weights.iter_mut().enumerate() {
            let neuron = index / stride;
            let input = index % stride;
            let x = if input < prev.values.len() {
                prev.values[input]
            } else {
                1.0
            };
            *weight += layer.errors[neuron] * x * learning_rate;
        }
    }
}

/// A schedule that updates each layer's weights right after its error is
/// known, so backpropagation reads already-updated weights.
pub fn interleaved_schedule(layer_count: usize) -> Vec<TrainingStep> {
    if layer_count < 2 {
        return Vec::new();
    }
    let output = layer_count - 1;
    let mut steps = vec![
        TrainingStep::GenerateError { depth: output },
        TrainingStep::UpdateWeights { depth: output },
    ];
    for depth in (1..output).rev() {
        steps.push(TrainingStep::Backpropagate { depth });
        steps.push(TrainingStep::UpdateWeights { depth });
    }
    steps
}
