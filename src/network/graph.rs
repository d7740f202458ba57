//! Network topology: a layer arena plus the forward order of its layers.

use log::{debug, info};

use crate::activation::ActivationKind;
use crate::engine::Engine;
use crate::errors::{EngineError, EngineResult};
use crate::network::layer::{Layer, LayerId, LayerKind};

/// A feed-forward chain of layers living on one engine's device.
///
/// Depth 0 is the input layer and depth `layer_count() - 1` the output layer.
#[derive(Debug)]
pub struct Network {
    layers: Vec<Layer>,
    order: Vec<LayerId>,
    input_size: usize,
    output_size: usize,
    cached_output: Vec<f32>,
}

impl Network {
    /// Input and output layers only, not connected yet.
    pub fn create(engine: &Engine, input_size: usize, output_size: usize) -> EngineResult<Self> {
        let layers = vec![
            Layer::new(engine, LayerKind::Input, input_size)?,
            Layer::new(engine, LayerKind::Output, output_size)?,
        ];

        Ok(Self {
            layers,
            order: vec![LayerId(0), LayerId(1)],
            input_size,
            output_size,
            cached_output: vec![0.0; output_size],
        })
    }

    /// Build a fully connected network: input, `hidden_sizes` in order, output.
    pub fn builder(
        engine: &Engine,
        input_size: usize,
        hidden_sizes: &[usize],
        output_size: usize,
    ) -> EngineResult<Self> {
        let mut network = Self::create(engine, input_size, output_size)?;
        for &size in hidden_sizes {
            network.append_hidden_layer(engine, size)?;
        }
        for depth in 1..network.layer_count() {
            network.connect_layer(engine, depth)?;
        }
        network.fetch_output_layer_data(engine)?;

        info!("Built network with layer sizes {:?}", network.layer_sizes());
        Ok(network)
    }

    /// Insert a hidden layer right before the output layer.
    ///
    /// Neither the new layer nor the output layer is connected afterwards;
    /// call [`Network::connect_layer`] for both before propagating.
    pub fn append_hidden_layer(&mut self, engine: &Engine, size: usize) -> EngineResult<()> {
        let layer = Layer::new(engine, LayerKind::Hidden, size)?;
        let id = LayerId(self.layers.len());
        self.layers.push(layer);

        let output_position = self.order.len() - 1;
        self.order.insert(output_position, id);
        debug!(
            "appended hidden layer of {} neurons at depth {}",
            size, output_position
        );
        Ok(())
    }

    /// (Re)allocate and initialize the weights feeding the layer at `depth`
    /// from the layer at `depth - 1`.
    pub fn connect_layer(&mut self, engine: &Engine, depth: usize) -> EngineResult<()> {
        self.check_depth(depth)?;
        if depth == 0 {
            return Err(EngineError::InputLayerHasNoWeights);
        }
        let prev_neuron_count = self.layer(depth - 1).neuron_count();
        let id = self.order[depth];
        self.layers[id.0].connect(engine, prev_neuron_count)
    }

    pub fn layer_count(&self) -> usize {
        self.order.len()
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    /// Neuron counts in forward order.
    pub fn layer_sizes(&self) -> Vec<usize> {
        self.layers_in_order().map(Layer::neuron_count).collect()
    }

    /// Output values as of the last [`Network::fetch_output_layer_data`].
    pub fn cached_output(&self) -> &[f32] {
        &self.cached_output
    }

    pub(crate) fn set_cached_output(&mut self, values: Vec<f32>) {
        self.cached_output = values;
    }

    pub fn layers_in_order(&self) -> impl Iterator<Item = &Layer> {
        self.order.iter().map(|id| &self.layers[id.0])
    }

    /// Layer at `depth`, or `LayerDepthOutOfRange`.
    pub fn layer_at(&self, depth: usize) -> EngineResult<&Layer> {
        self.check_depth(depth)?;
        Ok(self.layer(depth))
    }

    pub(crate) fn layer(&self, depth: usize) -> &Layer {
        &self.layers[self.order[depth].0]
    }

    pub(crate) fn check_depth(&self, depth: usize) -> EngineResult<()> {
        if depth >= self.layer_count() {
            return Err(EngineError::LayerDepthOutOfRange {
                depth,
                layer_count: self.layer_count(),
            });
        }
        Ok(())
    }

    /// The layer at `depth` and its predecessor, provided the layer's weight
    /// buffer matches the predecessor's width.
    pub(crate) fn connected_pair(&self, depth: usize) -> EngineResult<(&Layer, &Layer)> {
        self.check_depth(depth)?;
        if depth == 0 {
            return Err(EngineError::InputLayerHasNoWeights);
        }
        let prev = self.layer(depth - 1);
        let layer = self.layer(depth);
        if !layer.is_connected_to(prev.neuron_count()) {
            return Err(EngineError::LayerNotConnected {
                depth,
                expected: layer.expected_weight_count(prev.neuron_count()),
                actual: layer.weight_count(),
            });
        }
        Ok((prev, layer))
    }

    /// Use `kind` for every hidden and output layer. Takes effect on the next
    /// trigger.
    pub fn set_activation(&mut self, kind: ActivationKind) {
        self.set_activations(kind, kind);
    }

    /// Use `hidden` for every hidden layer and `output` for the output layer.
    pub fn set_activations(&mut self, hidden: ActivationKind, output: ActivationKind) {
        let last = self.layer_count() - 1;
        for depth in 1..self.layer_count() {
            let kind = if depth == last { output } else { hidden };
            let id = self.order[depth];
            self.layers[id.0].set_activation(kind);
        }
    }

    pub fn set_layer_activation(&mut self, depth: usize, kind: ActivationKind) -> EngineResult<()> {
        self.check_depth(depth)?;
        let id = self.order[depth];
        self.layers[id.0].set_activation(kind);
        Ok(())
    }

    /// Lane 0 of the layer at `depth`.
    pub fn fetch_layer_values(&self, engine: &Engine, depth: usize) -> EngineResult<Vec<f32>> {
        self.layer_at(depth)?.neurons().read_values(engine.context())
    }

    /// Lane 2 (backpropagated error) of the layer at `depth`.
    pub fn fetch_layer_errors(&self, engine: &Engine, depth: usize) -> EngineResult<Vec<f32>> {
        self.layer_at(depth)?.neurons().read_errors(engine.context())
    }

    /// Weights and biases of the layer at `depth`, neuron-major.
    pub fn fetch_layer_weights(&self, engine: &Engine, depth: usize) -> EngineResult<Vec<f32>> {
        let weights = self
            .layer_at(depth)?
            .weights()
            .ok_or(EngineError::InputLayerHasNoWeights)?;
        weights.read_values(engine.context())
    }

    /// Overwrite the weights of the connected layer at `depth`.
    pub fn upload_layer_weights(
        &self,
        engine: &Engine,
        depth: usize,
        weights: &[f32],
    ) -> EngineResult<()> {
        let (_, layer) = self.connected_pair(depth)?;
        if weights.len() != layer.weight_count() {
            return Err(EngineError::WeightCountMismatch {
                depth,
                expected: layer.weight_count(),
                actual: weights.len(),
            });
        }
        if let Some(buffer) = layer.weights() {
            buffer.write_values(engine.queue(), weights);
        }
        Ok(())
    }
}
