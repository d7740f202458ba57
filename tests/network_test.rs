//! Topology, weight initialization and forward propagation on the device.

mod common;

use common::{TOLERANCE, assert_close, engine, engine_with};
use gpu_ffnet::network::LayerKind;
use gpu_ffnet::{ActivationKind, EngineConfig, EngineError, HostNetwork, Network};

#[test]
fn test_every_layer_is_sized_for_its_predecessor() {
    let Some(engine) = engine() else { return };

    for hidden_count in 0..4 {
        let hidden: Vec<usize> = (0..hidden_count).map(|i| 3 + i).collect();
        let network = Network::builder(&engine, 4, &hidden, 2).unwrap();

        assert_eq!(network.layer_count(), hidden_count + 2);
        let sizes = network.layer_sizes();
        assert_eq!(sizes.first(), Some(&4));
        assert_eq!(sizes.last(), Some(&2));

        let input = network.layer_at(0).unwrap();
        assert_eq!(input.kind(), LayerKind::Input);
        assert_eq!(input.weight_count(), 0);

        for depth in 1..network.layer_count() {
            let layer = network.layer_at(depth).unwrap();
            assert_eq!(layer.weight_count(), (sizes[depth - 1] + 1) * sizes[depth]);
        }
        assert_eq!(
            network.layer_at(network.layer_count() - 1).unwrap().kind(),
            LayerKind::Output
        );
    }
}

#[test]
fn test_initialized_weights_are_in_unit_interval() {
    let Some(engine) = engine() else { return };
    let network = Network::builder(&engine, 16, &[32, 8], 4).unwrap();

    for depth in 1..network.layer_count() {
        let weights = network.fetch_layer_weights(&engine, depth).unwrap();
        assert!(!weights.is_empty());
        for w in weights {
            assert!(w > 0.0 && w < 1.0, "weight {} at depth {}", w, depth);
        }
    }
}

#[test]
fn test_layers_get_distinct_weights() {
    let Some(engine) = engine() else { return };
    let network = Network::builder(&engine, 3, &[3], 3).unwrap();

    let hidden = network.fetch_layer_weights(&engine, 1).unwrap();
    let output = network.fetch_layer_weights(&engine, 2).unwrap();
    assert_eq!(hidden.len(), output.len());
    assert_ne!(hidden, output);
}

#[test]
fn test_reconnect_draws_fresh_weights() {
    let Some(engine) = engine() else { return };
    let mut network = Network::builder(&engine, 4, &[], 3).unwrap();

    let first = network.fetch_layer_weights(&engine, 1).unwrap();
    network.connect_layer(&engine, 1).unwrap();
    let second = network.fetch_layer_weights(&engine, 1).unwrap();

    assert_eq!(first.len(), second.len());
    assert_ne!(first, second);
    assert!(second.iter().all(|&w| w > 0.0 && w < 1.0));
}

#[test]
fn test_forward_single_output() {
    let Some(engine) = engine() else { return };
    let mut network = Network::builder(&engine, 2, &[], 1).unwrap();
    network
        .upload_layer_weights(&engine, 1, &[0.5, 0.5, 0.0])
        .unwrap();

    network.send_inputs(&engine, &[1.0, 1.0]).unwrap();
    network.trigger_network(&engine).unwrap();
    let output = network.fetch_output_layer_data(&engine).unwrap();
    assert!((output[0] - 0.7311).abs() < 1e-4);
    assert!((network.cached_output()[0] - 0.7311).abs() < 1e-4);
}

#[test]
fn test_cached_output_is_stale_until_fetched() {
    let Some(engine) = engine() else { return };
    let mut network = Network::builder(&engine, 2, &[], 1).unwrap();
    network
        .upload_layer_weights(&engine, 1, &[0.5, 0.5, 0.0])
        .unwrap();
    network.fetch_output_layer_data(&engine).unwrap();
    let before = network.cached_output().to_vec();

    network.send_inputs(&engine, &[1.0, 1.0]).unwrap();
    network.trigger_network(&engine).unwrap();
    assert_eq!(network.cached_output(), before.as_slice());

    network.fetch_output_layer_data(&engine).unwrap();
    assert_ne!(network.cached_output(), before.as_slice());
}

#[test]
fn test_forward_matches_host() {
    let Some(engine) = engine() else { return };
    let mut network = Network::builder(&engine, 5, &[7, 4], 3).unwrap();
    network.set_activations(ActivationKind::Tanh, ActivationKind::Sigmoid);

    let mut host = HostNetwork::from_record(&network.to_record(&engine).unwrap());
    host.set_activations(ActivationKind::Tanh, ActivationKind::Sigmoid);

    let inputs = [0.3, -0.7, 1.2, 0.0, -0.05];
    network.send_inputs(&engine, &inputs).unwrap();
    network.trigger_network(&engine).unwrap();
    let device = network.fetch_output_layer_data(&engine).unwrap().to_vec();

    assert_close(&device, &host.predict(&inputs), TOLERANCE);
}

#[test]
fn test_trigger_layer_by_layer() {
    let Some(engine) = engine() else { return };
    let network = Network::builder(&engine, 2, &[2], 1).unwrap();
    let mut host = HostNetwork::from_record(&network.to_record(&engine).unwrap());
    host.predict(&[0.5, 0.25]);

    network.send_inputs(&engine, &[0.5, 0.25]).unwrap();
    network.trigger_layer(&engine, 0).unwrap();
    network.trigger_layer(&engine, 1).unwrap();
    let hidden = network.fetch_layer_values(&engine, 1).unwrap();
    assert!(hidden.iter().all(|&v| v > 0.5));

    network.trigger_layer(&engine, 2).unwrap();
    assert_close(
        &network.fetch_layer_values(&engine, 2).unwrap(),
        host.output(),
        TOLERANCE,
    );
}

#[test]
fn test_activation_switch_changes_output() {
    let Some(engine) = engine() else { return };
    let mut network = Network::builder(&engine, 2, &[], 1).unwrap();
    network
        .upload_layer_weights(&engine, 1, &[0.5, 0.5, 0.0])
        .unwrap();
    network.send_inputs(&engine, &[1.0, 1.0]).unwrap();

    let expected = [
        (ActivationKind::Sigmoid, 0.731_058_6),
        (ActivationKind::Tanh, 1.0f32.tanh()),
        (ActivationKind::Relu, 1.0),
    ];
    for (kind, value) in expected {
        network.set_activation(kind);
        network.trigger_network(&engine).unwrap();
        let output = network.fetch_output_layer_data(&engine).unwrap();
        assert!((output[0] - value).abs() < TOLERANCE, "{:?}: {}", kind, output[0]);
    }
}

#[test]
fn test_seeded_engines_are_deterministic() {
    let config = EngineConfig::new().with_seed(99);
    let (Some(first), Some(second)) = (engine_with(config.clone()), engine_with(config)) else {
        return;
    };

    let a = Network::builder(&first, 4, &[6], 2).unwrap();
    let b = Network::builder(&second, 4, &[6], 2).unwrap();
    assert_eq!(a.to_record(&first).unwrap(), b.to_record(&second).unwrap());
}

#[test]
fn test_repeated_forward_is_bit_identical() {
    let Some(engine) = engine() else { return };
    let mut network = Network::builder(&engine, 8, &[16, 16], 4).unwrap();
    let inputs: Vec<f32> = (0..8).map(|i| i as f32 * 0.125 - 0.5).collect();

    network.send_inputs(&engine, &inputs).unwrap();
    network.trigger_network(&engine).unwrap();
    let first = network.fetch_output_layer_data(&engine).unwrap().to_vec();

    network.send_inputs(&engine, &inputs).unwrap();
    network.trigger_network(&engine).unwrap();
    let second = network.fetch_output_layer_data(&engine).unwrap().to_vec();

    let first_bits: Vec<u32> = first.iter().map(|v| v.to_bits()).collect();
    let second_bits: Vec<u32> = second.iter().map(|v| v.to_bits()).collect();
    assert_eq!(first_bits, second_bits);
}

#[test]
fn test_appended_layer_must_be_connected() {
    let Some(engine) = engine() else { return };
    let mut network = Network::builder(&engine, 2, &[], 1).unwrap();
    network.append_hidden_layer(&engine, 3).unwrap();
    assert_eq!(network.layer_sizes(), vec![2, 3, 1]);

    assert!(matches!(
        network.trigger_layer(&engine, 1),
        Err(EngineError::LayerNotConnected { depth: 1, .. })
    ));
    network.connect_layer(&engine, 1).unwrap();
    assert!(matches!(
        network.trigger_layer(&engine, 2),
        Err(EngineError::LayerNotConnected {
            depth: 2,
            expected: 4,
            actual: 3
        })
    ));

    network.connect_layer(&engine, 2).unwrap();
    network.send_inputs(&engine, &[1.0, 0.0]).unwrap();
    network.trigger_network(&engine).unwrap();
}

#[test]
fn test_large_layer_spills_into_second_grid_dimension() {
    let config = EngineConfig::new().with_seed(5).with_workgroup_size(1);
    let Some(engine) = engine_with(config) else { return };
    let max = engine.context().max_workgroups_per_dimension() as usize;
    let width = max + 3;

    let network = Network::builder(&engine, 1, &[], width).unwrap();
    let weights = network.fetch_layer_weights(&engine, 1).unwrap();
    assert_eq!(weights.len(), 2 * width);
    assert!(weights.iter().all(|&w| w > 0.0 && w < 1.0));
}
