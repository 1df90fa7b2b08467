//! Unit tests for the bootstrap sequence.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::bootstrap::{BootstrapError, bootstrap_with, bootstrap_with_sink};
use crate::commands::standard_registry;
use crate::dispatch::{FixedOwnership, LookupMode, PeerIdentity, SampleSink};
use crate::tests::support::{
    FailingConfigLoader, RecordingChannel, RecordingSampleSink, TestConfigLoader,
};

#[test]
fn bootstrap_wires_configured_threshold() {
    let sink = Arc::new(RecordingSampleSink::default());
    let registry = standard_registry(|_| Ok(())).expect("registry");
    let daemon = bootstrap_with_sink(
        &TestConfigLoader::with_threshold(0.0),
        registry,
        Arc::clone(&sink) as Arc<dyn SampleSink>,
    )
    .expect("bootstrap should succeed");

    assert_eq!(
        daemon.config().slow_command_log_threshold(),
        Duration::ZERO
    );
    assert!(!daemon.poison().is_poisoned());

    let channel = RecordingChannel::default();
    let mut session = daemon.open_session(
        PeerIdentity::default(),
        &FixedOwnership(true),
        Box::new(channel.clone()),
    );
    let completed = daemon
        .dispatcher()
        .dispatch(&mut session, &Arc::new(json!(["get-pid"])), LookupMode::Daemon)
        .expect("dispatch");

    assert!(completed);
    assert_eq!(channel.replies().len(), 1);
    let samples = sink.samples();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].name(), "dispatch_command:get-pid");
}

#[test]
fn bootstrap_reports_configuration_errors() {
    let registry = standard_registry(|_| Ok(())).expect("registry");
    let Err(error) = bootstrap_with(&FailingConfigLoader, registry) else {
        panic!("bootstrap should fail for an unknown log format");
    };
    assert!(matches!(error, BootstrapError::Configuration { .. }));
    assert!(error.to_string().starts_with("failed to load configuration"));
}
