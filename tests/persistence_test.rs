//! Saving and loading networks through the filesystem.

mod common;

use common::engine;
use gpu_ffnet::{Network, PersistenceError, load_network, save_network};

#[test]
fn test_save_then_load_restores_weights_exactly() {
    let Some(engine) = engine() else { return };
    let mut network = Network::builder(&engine, 3, &[4, 2], 2).unwrap();
    network.send_inputs(&engine, &[0.1, 0.2, 0.3]).unwrap();
    network.trigger_network(&engine).unwrap();
    network.train_network(&engine, &[1.0, 0.0], 0.5).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("network.bin");
    save_network(&engine, &network, &path).unwrap();

    let mut loaded = load_network(&engine, &path).unwrap().expect("file exists");
    assert_eq!(loaded.layer_sizes(), vec![3, 4, 2, 2]);

    let original = network.to_record(&engine).unwrap();
    let restored = loaded.to_record(&engine).unwrap();
    for (a, b) in original
        .output_weights
        .iter()
        .zip(&restored.output_weights)
    {
        assert_eq!(a.to_bits(), b.to_bits());
    }
    assert_eq!(original, restored);

    network.send_inputs(&engine, &[0.9, 0.8, 0.7]).unwrap();
    network.trigger_network(&engine).unwrap();
    loaded.send_inputs(&engine, &[0.9, 0.8, 0.7]).unwrap();
    loaded.trigger_network(&engine).unwrap();
    assert_eq!(
        network.fetch_output_layer_data(&engine).unwrap(),
        loaded.fetch_output_layer_data(&engine).unwrap()
    );
}

#[test]
fn test_file_size_follows_topology() {
    let Some(engine) = engine() else { return };
    let network = Network::builder(&engine, 2, &[3], 1).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("small.bin");
    save_network(&engine, &network, &path).unwrap();

    // 3 header ints, 1 hidden size, (2+1)*3 + (3+1)*1 weights
    let expected = 4 * 4 + 13 * 4;
    assert_eq!(std::fs::metadata(&path).unwrap().len(), expected);
}

#[test]
fn test_missing_file_is_none() {
    let Some(engine) = engine() else { return };
    let dir = tempfile::tempdir().unwrap();
    let loaded = load_network(&engine, dir.path().join("absent.bin")).unwrap();
    assert!(loaded.is_none());
}

#[test]
fn test_truncated_file_is_an_error() {
    let Some(engine) = engine() else { return };
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("truncated.bin");
    std::fs::write(&path, [2u8, 0, 0, 0]).unwrap();

    assert!(matches!(
        load_network(&engine, &path),
        Err(PersistenceError::Truncated { .. })
    ));
}

#[test]
fn test_save_overwrites_existing_file() {
    let Some(engine) = engine() else { return };
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("network.bin");

    let large = Network::builder(&engine, 8, &[8, 8], 8).unwrap();
    save_network(&engine, &large, &path).unwrap();
    let small = Network::builder(&engine, 2, &[], 1).unwrap();
    save_network(&engine, &small, &path).unwrap();

    let loaded = load_network(&engine, &path).unwrap().expect("file exists");
    assert_eq!(loaded.layer_sizes(), vec![2, 1]);
}
