//! Configuration loaders covering the bootstrap success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use warden_config::{Config, LogFormat};

use crate::bootstrap::ConfigLoader;

/// Loader returning defaults with an explicit slow-command threshold.
pub struct TestConfigLoader {
    threshold_seconds: f64,
}

impl TestConfigLoader {
    pub fn with_threshold(threshold_seconds: f64) -> Self {
        Self { threshold_seconds }
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            log_format: LogFormat::Compact,
            slow_command_log_threshold_seconds: self.threshold_seconds,
            ..Config::default()
        })
    }
}

/// Loader that fails by passing an unknown log format on the command line.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("wardend"),
            OsString::from("--log-format"),
            OsString::from("yaml"),
        ];
        Config::load_from_iter(args)
    }
}
