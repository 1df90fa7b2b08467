use std::time::Duration;

use crate::encoding::OutputEncoding;
use crate::logging::LogFormat;

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Wall-clock time after which a dispatched command is logged as slow.
pub const DEFAULT_SLOW_COMMAND_LOG_THRESHOLD_SECONDS: f64 = 1.0;

/// Default log filter expression used by the daemon.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the daemon.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default reply encoding for the stdio front-end.
pub fn default_output_encoding() -> OutputEncoding {
    OutputEncoding::Json
}

/// Default slow-command threshold in seconds.
pub fn default_slow_command_log_threshold_seconds() -> f64 {
    DEFAULT_SLOW_COMMAND_LOG_THRESHOLD_SECONDS
}

/// Converts a configured threshold into a [`Duration`].
///
/// Negative, NaN, and infinite values are rejected in favour of the default so
/// a bad override cannot disable or break slow-command logging.
pub fn threshold_duration(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or_else(|_| {
        Duration::from_secs_f64(DEFAULT_SLOW_COMMAND_LOG_THRESHOLD_SECONDS)
    })
}
