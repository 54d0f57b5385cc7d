//! Integration tests for engine configuration
//!
//! These tests validate that config files reach running chains:
//! - TOML round trip through a temporary directory
//! - Telemetry window and listener queue depth on outputs
//! - Worker thread naming

mod common;

use common::mock_helpers::{pass_through_ports, MockLeaf};
use common::test_timeout;
use sensorchain::config::{EngineConfig, CONFIG_FILE};
use sensorchain::process::processes::DataSourceProcess;
use sensorchain::{quantity_schema, ChainBuilder, ChainError, Component, CompositeProcess, Record};
use serial_test::serial;
use std::sync::{Arc, Mutex};

#[test]
fn test_config_file_applied_to_chain() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE);
    std::fs::write(&path, "telemetry_window = 2\nlistener_queue_depth = 4\n").unwrap();

    let config = EngineConfig::load_or_default(Some(path));
    assert_eq!(config.telemetry_window, 2);

    let mut chain = ChainBuilder::with_config("configured", config)
        .component("source", DataSourceProcess::new(quantity_schema("value")))
        .build()
        .unwrap();
    let feed = chain.feed("source").unwrap();
    let output = chain.component_output("source/value").unwrap();
    let events = output.subscribe();

    for (i, time) in [1_000, 2_000, 3_000].into_iter().enumerate() {
        feed.push_at(Record::quantity(i as f64), time).unwrap();
        chain.execute().unwrap();
    }

    // Two-slot window is full after three publishes.
    common::assert_float_eq(output.average_sampling_period(), 1000.0, 1e-9);
    // Queue of four holds all three events.
    assert_eq!(events.receiver().try_iter().count(), 3);
}

#[test]
fn test_invalid_config_rejected_at_init() {
    let config = EngineConfig {
        listener_queue_depth: 0,
        ..Default::default()
    };
    let mut chain = CompositeProcess::with_config("broken", config);
    assert!(matches!(chain.init(), Err(ChainError::Config(_))));
}

#[test]
fn test_malformed_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE);
    std::fs::write(&path, "telemetry_window = \"ten\"").unwrap();

    assert!(EngineConfig::load(&path).is_err());
    assert_eq!(EngineConfig::load_or_default(Some(path)), EngineConfig::default());
}

#[test]
#[serial]
fn test_worker_thread_named_from_config() {
    let seen = Arc::new(Mutex::new(None));
    let recorder = Arc::clone(&seen);

    let mut leaf = MockLeaf::new();
    leaf.expect_ports().returning(pass_through_ports);
    leaf.expect_execute().returning(move |ctx| {
        *recorder.lock().unwrap() = std::thread::current().name().map(str::to_string);
        let value = ctx.input("value")?;
        ctx.publish("value", value)
    });

    let config = EngineConfig {
        worker_name_prefix: "sensor".to_string(),
        ..Default::default()
    };
    let mut chain = ChainBuilder::with_config("imu", config)
        .input("raw", quantity_schema("raw"))
        .component("sensor", Component::plugin(leaf))
        .connect("inputs/raw", "sensor/value")
        .build()
        .unwrap();

    chain.start(|_| {}).unwrap();
    chain.set_input("inputs/raw", Record::quantity(1.0)).unwrap();
    assert!(common::wait_until(test_timeout(), || seen.lock().unwrap().is_some()));
    chain.stop().unwrap();

    assert_eq!(seen.lock().unwrap().as_deref(), Some("sensor-imu"));
}
