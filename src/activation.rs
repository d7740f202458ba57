//! Activation functions selectable per layer.
//!
//! The device kernels select activation math by an integer id (see
//! `gpu/shaders/activations.wgsl`). This module owns those ids and carries a
//! host mirror of the same formulas, which the reference network and the tests
//! use to cross-check device results.
//!
//! Derivatives are expressed in terms of the *activated* value `y`, because the
//! neuron buffers only keep post-activation values.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Activation function applied by a layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActivationKind {
    /// Logistic sigmoid: f(x) = 1 / (1 + exp(-x)).
    #[default]
    Sigmoid,
    /// Hyperbolic tangent: f(x) = 2 / (1 + exp(-2x)) - 1.
    Tanh,
    /// Rectified Linear Unit: f(x) = max(0, x).
    Relu,
}

impl ActivationKind {
    pub const ALL: [ActivationKind; 3] = [
        ActivationKind::Sigmoid,
        ActivationKind::Tanh,
        ActivationKind::Relu,
    ];

    /// Integer id understood by the WGSL `activate`/`derivative` functions.
    pub fn id(self) -> u32 {
        match self {
            ActivationKind::Sigmoid => 0,
            ActivationKind::Tanh => 1,
            ActivationKind::Relu => 2,
        }
    }

    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(ActivationKind::Sigmoid),
            1 => Some(ActivationKind::Tanh),
            2 => Some(ActivationKind::Relu),
            _ => None,
        }
    }

    /// Get activation by string name.
    pub fn get_by_name(type_name: &str) -> Option<Self> {
        let map: HashMap<&str, ActivationKind> = [
            ("SIGMOID", ActivationKind::Sigmoid),
            ("TANH", ActivationKind::Tanh),
            ("RELU", ActivationKind::Relu),
        ]
        .iter()
        .cloned()
        .collect();

        map.get(type_name.to_ascii_uppercase().as_str()).copied()
    }

    /// Apply the activation function to a pre-activation sum.
    pub fn apply(self, x: f32) -> f32 {
        match self {
            ActivationKind::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            ActivationKind::Tanh => 2.0 / (1.0 + (-2.0 * x).exp()) - 1.0,
            ActivationKind::Relu => x.max(0.0),
        }
    }

    /// Derivative evaluated at an activated value `y = apply(x)`.
    pub fn derivative(self, y: f32) -> f32 {
        match self {
            ActivationKind::Sigmoid => y * (1.0 - y),
            ActivationKind::Tanh => 1.0 - y * y,
            ActivationKind::Relu => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELTA: f32 = 0.00005;

    #[test]
    fn test_sigmoid() {
        assert!((ActivationKind::Sigmoid.apply(1.0) - 0.7311).abs() < DELTA);
        assert!((ActivationKind::Sigmoid.apply(0.0) - 0.5).abs() < DELTA);
        assert!((ActivationKind::Sigmoid.apply(-0.5) - 0.3775).abs() < DELTA);
        assert!((ActivationKind::Sigmoid.derivative(0.5) - 0.25).abs() < DELTA);
    }

    #[test]
    fn test_tanh_matches_std() {
        for x in [-3.0f32, -1.0, 0.0, 0.25, 2.0] {
            assert!((ActivationKind::Tanh.apply(x) - x.tanh()).abs() < DELTA);
        }
        assert!((ActivationKind::Tanh.derivative(0.0) - 1.0).abs() < DELTA);
    }

    #[test]
    fn test_tanh_saturates_without_nan() {
        assert_eq!(ActivationKind::Tanh.apply(-200.0), -1.0);
        assert_eq!(ActivationKind::Tanh.apply(200.0), 1.0);
    }

    #[test]
    fn test_relu() {
        assert_eq!(ActivationKind::Relu.apply(1.5), 1.5);
        assert_eq!(ActivationKind::Relu.apply(-1.0), 0.0);
        assert_eq!(ActivationKind::Relu.derivative(1.5), 1.0);
        assert_eq!(ActivationKind::Relu.derivative(0.0), 0.0);
    }

    #[test]
    fn test_ids_round_trip() {
        for kind in ActivationKind::ALL {
            assert_eq!(ActivationKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(ActivationKind::from_id(3), None);
    }

    #[test]
    fn test_get_by_name() {
        assert_eq!(
            ActivationKind::get_by_name("SIGMOID"),
            Some(ActivationKind::Sigmoid)
        );
        assert_eq!(
            ActivationKind::get_by_name("relu"),
            Some(ActivationKind::Relu)
        );
        assert_eq!(ActivationKind::get_by_name("SOFTMAX"), None);
    }
}
