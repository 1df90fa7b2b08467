//! Reply encodings a client may negotiate.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Encoding applied to replies written by the daemon front-end.
///
/// Both variants are newline framed; they differ only in whitespace.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum OutputEncoding {
    /// Compact JSON, one value per line.
    #[default]
    Json,
    /// Indented JSON for interactive use.
    PrettyJson,
}

/// Errors encountered while parsing an [`OutputEncoding`] from text.
pub type OutputEncodingParseError = strum::ParseError;
