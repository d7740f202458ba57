//! Binary save/load of a network's topology and weights.
//!
//! # Format
//!
//! No magic, no version, host-native byte order:
//!
//! ```text
//! i32 layer_count
//! i32 input_size
//! i32 output_size
//! repeat layer_count - 2 times:
//!     i32 hidden_neuron_count
//!     f32[(prev_neuron_count + 1) * hidden_neuron_count] weights
//! f32[(prev_neuron_count + 1) * output_size] output_weights
//! ```
//!
//! Weight counts are derived from the topology read so far, so the output
//! block carries no length prefix.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::{info, warn};

use crate::engine::Engine;
use crate::errors::{EngineResult, PersistenceError, PersistenceResult};
use crate::network::graph::Network;

const INT_BYTES: usize = std::mem::size_of::<i32>();
const FLOAT_BYTES: usize = std::mem::size_of::<f32>();

/// A hidden layer as stored on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct HiddenLayerRecord {
    pub neuron_count: usize,
    pub weights: Vec<f32>,
}

/// Host-side image of a persisted network.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkRecord {
    pub input_size: usize,
    pub output_size: usize,
    pub hidden: Vec<HiddenLayerRecord>,
    pub output_weights: Vec<f32>,
}

impl NetworkRecord {
    pub fn layer_count(&self) -> usize {
        self.hidden.len() + 2
    }

    /// Neuron counts in forward order.
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(self.layer_count());
        sizes.push(self.input_size);
        sizes.extend(self.hidden.iter().map(|h| h.neuron_count));
        sizes.push(self.output_size);
        sizes
    }

    pub fn encode(&self) -> PersistenceResult<Vec<u8>> {
        let weight_total: usize = self.hidden.iter().map(|h| h.weights.len()).sum::<usize>()
            + self.output_weights.len();
        let mut bytes =
            Vec::with_capacity((3 + self.hidden.len()) * INT_BYTES + weight_total * FLOAT_BYTES);

        for (value, section) in [
            (self.layer_count(), "layer count"),
            (self.input_size, "input size"),
            (self.output_size, "output size"),
        ] {
            bytes.extend_from_slice(bytemuck::bytes_of(&encode_count(value, section)?));
        }
        for hidden in &self.hidden {
            let neuron_count = encode_count(hidden.neuron_count, "hidden layer size")?;
            bytes.extend_from_slice(bytemuck::bytes_of(&neuron_count));
            bytes.extend_from_slice(bytemuck::cast_slice(&hidden.weights));
        }
        bytes.extend_from_slice(bytemuck::cast_slice(&self.output_weights));
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> PersistenceResult<Self> {
        let mut reader = ByteReader::new(bytes);

        let layer_count = reader.read_count("layer count")?;
        let input_size = reader.read_count("input size")?;
        let output_size = reader.read_count("output size")?;
        if layer_count < 2 {
            return Err(PersistenceError::InvalidHeader {
                reason: format!("layer count {} is below 2", layer_count),
            });
        }
        if input_size == 0 || output_size == 0 {
            return Err(PersistenceError::InvalidHeader {
                reason: format!(
                    "input size {} and output size {} must be positive",
                    input_size, output_size
                ),
            });
        }

        // Every hidden layer needs at least its size field, which bounds the
        // count a header can claim.
        let hidden_count = layer_count - 2;
        if hidden_count > reader.remaining() / INT_BYTES {
            return Err(PersistenceError::Truncated {
                section: "hidden layers".to_string(),
                needed: hidden_count.saturating_mul(INT_BYTES),
                available: reader.remaining(),
            });
        }
        let mut hidden = Vec::with_capacity(hidden_count);
        let mut prev_neuron_count = input_size;
        for index in 0..hidden_count {
            let neuron_count = reader.read_count("hidden layer size")?;
            if neuron_count == 0 {
                return Err(PersistenceError::InvalidHeader {
                    reason: format!("hidden layer {} has no neurons", index),
                });
            }
            let weights = reader.read_floats(
                (prev_neuron_count + 1) * neuron_count,
                "hidden layer weights",
            )?;
            hidden.push(HiddenLayerRecord {
                neuron_count,
                weights,
            });
            prev_neuron_count = neuron_count;
        }

        let output_weights =
            reader.read_floats((prev_neuron_count + 1) * output_size, "output weights")?;

        if reader.remaining() > 0 {
            warn!(
                "Ignoring {} trailing bytes after network data",
                reader.remaining()
            );
        }

        Ok(Self {
            input_size,
            output_size,
            hidden,
            output_weights,
        })
    }
}

fn encode_count(value: usize, section: &str) -> PersistenceResult<i32> {
    i32::try_from(value).map_err(|_| PersistenceError::InvalidHeader {
        reason: format!("{} {} does not fit in an i32", section, value),
    })
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    fn take(&mut self, needed: usize, section: &str) -> PersistenceResult<&'a [u8]> {
        if needed > self.remaining() {
            return Err(PersistenceError::Truncated {
                section: section.to_string(),
                needed,
                available: self.remaining(),
            });
        }
        let slice = &self.bytes[self.position..self.position + needed];
        self.position += needed;
        Ok(slice)
    }

    fn read_count(&mut self, section: &str) -> PersistenceResult<usize> {
        let value: i32 = bytemuck::pod_read_unaligned(self.take(INT_BYTES, section)?);
        usize::try_from(value).map_err(|_| PersistenceError::InvalidHeader {
            reason: format!("{} is negative: {}", section, value),
        })
    }

    fn read_floats(&mut self, count: usize, section: &str) -> PersistenceResult<Vec<f32>> {
        let needed = count
            .checked_mul(FLOAT_BYTES)
            .ok_or_else(|| PersistenceError::InvalidHeader {
                reason: format!("{} of {} values overflows", section, count),
            })?;
        Ok(self
            .take(needed, section)?
            .chunks_exact(FLOAT_BYTES)
            .map(bytemuck::pod_read_unaligned::<f32>)
            .collect())
    }
}

impl Network {
    /// Read every weight buffer back into a [`NetworkRecord`].
    pub fn to_record(&self, engine: &Engine) -> EngineResult<NetworkRecord> {
        let output = self.layer_count() - 1;
        let hidden = (1..output)
            .map(|depth| {
                Ok(HiddenLayerRecord {
                    neuron_count: self.layer(depth).neuron_count(),
                    weights: self.fetch_layer_weights(engine, depth)?,
                })
            })
            .collect::<EngineResult<Vec<_>>>()?;

        Ok(NetworkRecord {
            input_size: self.input_size(),
            output_size: self.output_size(),
            hidden,
            output_weights: self.fetch_layer_weights(engine, output)?,
        })
    }

    /// Rebuild a network from a record. Each layer is connected as usual and
    /// its initialized weights are then overwritten with the stored ones.
    pub fn from_record(engine: &Engine, record: &NetworkRecord) -> EngineResult<Self> {
        let mut network = Network::create(engine, record.input_size, record.output_size)?;

        for (index, hidden) in record.hidden.iter().enumerate() {
            let depth = index + 1;
            network.append_hidden_layer(engine, hidden.neuron_count)?;
            network.connect_layer(engine, depth)?;
            network.upload_layer_weights(engine, depth, &hidden.weights)?;
        }

        let output = network.layer_count() - 1;
        network.connect_layer(engine, output)?;
        network.upload_layer_weights(engine, output, &record.output_weights)?;
        network.fetch_output_layer_data(engine)?;
        Ok(network)
    }
}

/// Write `network` to `path`, replacing any existing file.
pub fn save_network(
    engine: &Engine,
    network: &Network,
    path: impl AsRef<Path>,
) -> PersistenceResult<()> {
    let path = path.as_ref();
    let bytes = network.to_record(engine)?.encode()?;
    std::fs::write(path, &bytes).map_err(|e| PersistenceError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    info!(
        "Saved network {:?} to {} ({} bytes)",
        network.layer_sizes(),
        path.display(),
        bytes.len()
    );
    Ok(())
}

/// Load a network saved by [`save_network`].
///
/// Returns `Ok(None)` when the file cannot be opened; a file that opens but
/// does not hold a valid network is an error.
pub fn load_network(engine: &Engine, path: impl AsRef<Path>) -> PersistenceResult<Option<Network>> {
    let path = path.as_ref();
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            warn!("Cannot open network file {}: {}", path.display(), e);
            return Ok(None);
        }
    };

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| PersistenceError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

    let record = NetworkRecord::decode(&bytes)?;
    let network = Network::from_record(engine, &record)?;
    info!(
        "Loaded network {:?} from {}",
        network.layer_sizes(),
        path.display()
    );
    Ok(Some(network))
}
