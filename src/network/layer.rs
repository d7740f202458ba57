//! A single layer of the feed-forward chain.

use log::debug;

use crate::activation::ActivationKind;
use crate::engine::Engine;
use crate::errors::{EngineError, EngineResult};
use crate::gpu::buffers::checked_size;
use crate::gpu::{DeviceBuffer, Kernel, KernelParams, Slot};

/// Index of a layer in its network's arena. Stable across topology edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Input,
    Hidden,
    Output,
}

impl LayerKind {
    fn label(self) -> &'static str {
        match self {
            LayerKind::Input => "input",
            LayerKind::Hidden => "hidden",
            LayerKind::Output => "output",
        }
    }
}

/// Neurons at one depth plus, for non-input layers, the weights feeding them.
#[derive(Debug)]
pub struct Layer {
    kind: LayerKind,
    neuron_count: usize,
    activation: ActivationKind,
    neurons: DeviceBuffer,
    weights: Option<DeviceBuffer>,
}

impl Layer {
    pub(crate) fn new(engine: &Engine, kind: LayerKind, neuron_count: usize) -> EngineResult<Self> {
        if neuron_count == 0 {
            return Err(EngineError::InvalidLayerSize);
        }
        let label = format!("{} layer neurons", kind.label());
        checked_size(&label, neuron_count, &engine.device().limits())?;
        let slots = vec![Slot::from_value(0.0); neuron_count];
        let neurons = DeviceBuffer::from_slots(engine.device(), &label, &slots)?;

        Ok(Self {
            kind,
            neuron_count,
            activation: ActivationKind::default(),
            neurons,
            weights: None,
        })
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn neuron_count(&self) -> usize {
        self.neuron_count
    }

    pub fn activation(&self) -> ActivationKind {
        self.activation
    }

    /// Number of weight slots, biases included. 0 until connected.
    pub fn weight_count(&self) -> usize {
        self.weights.as_ref().map_or(0, DeviceBuffer::len)
    }

    /// Weight slots this layer needs when fed by `prev_neuron_count` neurons.
    pub fn expected_weight_count(&self, prev_neuron_count: usize) -> usize {
        prev_neuron_count
            .saturating_add(1)
            .saturating_mul(self.neuron_count)
    }

    pub fn is_connected_to(&self, prev_neuron_count: usize) -> bool {
        self.kind != LayerKind::Input
            && self.weight_count() == self.expected_weight_count(prev_neuron_count)
    }

    pub(crate) fn set_activation(&mut self, activation: ActivationKind) {
        self.activation = activation;
    }

    pub(crate) fn neurons(&self) -> &DeviceBuffer {
        &self.neurons
    }

    pub(crate) fn weights(&self) -> Option<&DeviceBuffer> {
        self.weights.as_ref()
    }

    /// Replace the weight buffer with a freshly initialized one sized for
    /// `prev_neuron_count` inputs. The old buffer is released first.
    pub(crate) fn connect(&mut self, engine: &Engine, prev_neuron_count: usize) -> EngineResult<()> {
        if self.kind == LayerKind::Input {
            return Err(EngineError::InputLayerHasNoWeights);
        }

        self.weights = None;
        let weight_count = self.expected_weight_count(prev_neuron_count);
        let weights = DeviceBuffer::new(
            engine.device(),
            &format!("{} layer weights", self.kind.label()),
            weight_count,
        )?;

        let seed = engine.next_seed();
        debug!(
            "connecting {} layer: {} inputs -> {} neurons, {} weights, seed {}",
            self.kind.label(),
            prev_neuron_count,
            self.neuron_count,
            weight_count,
            seed
        );
        engine.dispatch(
            Kernel::WeightInit,
            KernelParams {
                count: weight_count as u32,
                prev_size: prev_neuron_count as u32,
                layer_size: self.neuron_count as u32,
                seed,
                ..Default::default()
            },
            &[weights.buffer()],
        )?;

        self.weights = Some(weights);
        Ok(())
    }
}
