//! Layer graph and the host-side operations over it.
//!
//! A [`Network`] keeps its layers in an arena and their forward order as a
//! sequence of [`LayerId`]s, so inserting a hidden layer is a splice of that
//! sequence. Every operation takes the [`Engine`](crate::Engine) the network
//! was built on.

pub mod graph;
pub mod layer;
pub mod persistence;
pub mod propagation;

pub use graph::Network;
pub use layer::{Layer, LayerId, LayerKind};
pub use persistence::{HiddenLayerRecord, NetworkRecord, load_network, save_network};
pub use propagation::{TrainingStep, training_schedule};
