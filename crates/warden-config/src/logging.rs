//! Log rendering choices for `wardend`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How `wardend` renders its log events on stderr.
///
/// Accepted spellings match case-insensitively, so `WARDEN_LOG_FORMAT=COMPACT`
/// works as well as `--log-format compact`.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One flattened JSON object per event. Slow-command records keep their
    /// metadata as structured fields.
    #[default]
    Json,
    /// Single-line text for a terminal.
    Compact,
}

/// Parse failure for an unrecognised log format name.
pub type LogFormatParseError = strum::ParseError;
