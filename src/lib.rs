//! GPU-resident feed-forward neural networks.
//!
//! Every layer lives in device memory as an array of four-lane slots and all
//! arithmetic runs in five compute kernels: weight initialization, forward
//! propagation, output error generation, backpropagation and weight update.
//! The host only sequences dispatches and moves inputs, targets and outputs.
//!
//! ```no_run
//! use gpu_ffnet::{Engine, EngineConfig, Network};
//!
//! let engine = Engine::init(EngineConfig::default())?;
//! let mut network = Network::builder(&engine, 2, &[3], 1)?;
//! network.send_inputs(&engine, &[0.0, 1.0])?;
//! network.trigger_network(&engine)?;
//! network.train_network(&engine, &[1.0], 0.5)?;
//! let output = network.fetch_output_layer_data(&engine)?;
//! # let _ = output;
//! # Ok::<(), gpu_ffnet::errors::EngineError>(())
//! ```

pub mod activation;
pub mod config;
pub mod engine;
pub mod errors;
pub mod gpu;
pub mod network;
pub mod reference;

pub use activation::ActivationKind;
pub use config::{EngineConfig, PowerPreference};
pub use engine::Engine;
pub use errors::{ConfigError, EngineError, PersistenceError};
pub use network::{Network, NetworkRecord, load_network, save_network};
pub use reference::HostNetwork;
