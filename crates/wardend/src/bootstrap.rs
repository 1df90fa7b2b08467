//! Service bootstrap: configuration, logging, and dispatcher wiring.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;
use tracing::info;

use warden_config::Config;

use crate::dispatch::{
    ClientSession, CommandRegistry, Dispatcher, IdentityOracle, PeerIdentity, PoisonState,
    ReplyChannel, SampleSink, TracingSampleSink,
};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the service configuration.
    ///
    /// # Errors
    ///
    /// Returns the layered loader's error.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that returns a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already resolved configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Logging could not be initialised.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
}

/// A bootstrapped service ready to accept sessions.
pub struct Daemon {
    config: Arc<Config>,
    dispatcher: Dispatcher,
    telemetry: TelemetryHandle,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Dispatcher shared by every session.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Poison state shared by every session.
    #[must_use]
    pub fn poison(&self) -> &PoisonState {
        self.dispatcher.poison()
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Opens a session for a newly connected peer.
    pub fn open_session(
        &self,
        peer: PeerIdentity,
        oracle: &dyn IdentityOracle,
        channel: Box<dyn ReplyChannel>,
    ) -> ClientSession {
        let session = ClientSession::new(peer, oracle, channel);
        info!(
            target: BOOTSTRAP_TARGET,
            pid = peer.pid,
            is_owner = session.is_owner(),
            "session opened"
        );
        session
    }
}

/// Bootstraps the service with the default tracing sample sink.
///
/// # Errors
///
/// Returns an error when configuration or telemetry fails.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    registry: Arc<CommandRegistry>,
) -> Result<Daemon, BootstrapError> {
    bootstrap_with_sink(loader, registry, Arc::new(TracingSampleSink::new()))
}

/// Bootstraps the service with an explicit slow-sample sink.
///
/// # Errors
///
/// Returns an error when configuration or telemetry fails.
pub fn bootstrap_with_sink(
    loader: &dyn ConfigLoader,
    registry: Arc<CommandRegistry>,
    sink: Arc<dyn SampleSink>,
) -> Result<Daemon, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;

    let config = Arc::new(config);
    let dispatcher = Dispatcher::new(
        Arc::clone(&registry),
        PoisonState::new(),
        config.clone(),
        sink,
    );

    info!(
        target: BOOTSTRAP_TARGET,
        commands = registry.len(),
        slow_command_log_threshold_seconds = config.slow_command_log_threshold().as_secs_f64(),
        log_format = %config.log_format(),
        "service bootstrap completed"
    );

    Ok(Daemon {
        config,
        dispatcher,
        telemetry,
    })
}
