//! Shared configuration for the warden command-dispatch daemon.
//!
//! Configuration is layered by [`ortho_config`]: built-in defaults are
//! overridden by a configuration file (`--config-path` or
//! `WARDEN_CONFIG_PATH`), then by `WARDEN_*` environment variables, and finally
//! by command-line flags. The resolved value is fixed for the life of the
//! process; the dispatcher reads [`Config::slow_command_log_threshold`] on
//! every dispatch rather than caching it at startup.

mod defaults;
mod encoding;
mod logging;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_SLOW_COMMAND_LOG_THRESHOLD_SECONDS, default_log_filter,
    default_log_filter_string, default_log_format, default_output_encoding,
    default_slow_command_log_threshold_seconds, threshold_duration,
};
pub use encoding::{OutputEncoding, OutputEncodingParseError};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "WARDEN")]
pub struct Config {
    /// `tracing` filter expression applied to daemon logs.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Output format for daemon logs.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
    /// Commands running longer than this many seconds are logged as slow.
    #[ortho_config(default = defaults::default_slow_command_log_threshold_seconds())]
    pub slow_command_log_threshold_seconds: f64,
    /// Encoding used for replies written by the stdio front-end.
    #[ortho_config(default = defaults::default_output_encoding())]
    pub output_encoding: OutputEncoding,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            slow_command_log_threshold_seconds: default_slow_command_log_threshold_seconds(),
            output_encoding: default_output_encoding(),
        }
    }
}

impl Config {
    /// Filter expression handed to the tracing subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Selected log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Selected reply encoding.
    #[must_use]
    pub fn output_encoding(&self) -> OutputEncoding {
        self.output_encoding
    }

    /// Slow-command threshold as a [`Duration`].
    ///
    /// Invalid values (negative, NaN, infinite) resolve to the default of one
    /// second.
    #[must_use]
    pub fn slow_command_log_threshold(&self) -> Duration {
        threshold_duration(self.slow_command_log_threshold_seconds)
    }
}
