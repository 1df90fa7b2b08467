//! Reply encoding and delivery.
//!
//! Replies are structured values encoded as newline-framed JSON. The
//! [`ReplyChannel`] trait is the session's handle on its transport; the
//! [`ResponseWriter`] adapts any [`Write`] stream to it.

use std::io::Write;

use serde_json::{Map, Value};
use warden_config::OutputEncoding;

use super::errors::DispatchError;

/// Service version reported in every reply.
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Wire encoding selected for replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PduKind {
    /// Compact JSON, one value per line.
    #[default]
    Json,
    /// Indented JSON followed by a newline.
    PrettyJson,
}

impl From<OutputEncoding> for PduKind {
    fn from(encoding: OutputEncoding) -> Self {
        match encoding {
            OutputEncoding::Json => Self::Json,
            OutputEncoding::PrettyJson => Self::PrettyJson,
        }
    }
}

/// Capability bits negotiated with the peer, forwarded to the encoder.
///
/// The JSON encodings accept every capability set; the value is carried so
/// encoders with optional features can honour it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputCapabilities(pub u32);

/// Encodes one value onto `writer`.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn encode_pdu<W: Write>(
    kind: PduKind,
    _capabilities: OutputCapabilities,
    value: &Value,
    mut writer: W,
) -> Result<(), DispatchError> {
    let encoded = match kind {
        PduKind::Json => serde_json::to_writer(&mut writer, value),
        PduKind::PrettyJson => serde_json::to_writer_pretty(&mut writer, value),
    };
    encoded.map_err(DispatchError::SerializeReply)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Builds the base reply object carrying the service version.
pub fn make_response() -> Map<String, Value> {
    let mut response = Map::new();
    response.insert("version".to_owned(), Value::from(SERVICE_VERSION));
    response
}

/// Builds an error reply: `{"version": ..., "error": message}`.
pub fn error_response(message: &str) -> Value {
    let mut response = make_response();
    response.insert("error".to_owned(), Value::from(message));
    Value::Object(response)
}

/// Transport handle replies are sent through.
pub trait ReplyChannel: Send {
    /// Sends one reply.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    fn send(&mut self, reply: &Value) -> Result<(), DispatchError>;
}

/// Writes replies to a byte stream in the configured encoding.
pub struct ResponseWriter<W> {
    writer: W,
    kind: PduKind,
    capabilities: OutputCapabilities,
}

impl<W: Write> ResponseWriter<W> {
    /// Creates a compact JSON writer.
    pub fn new(writer: W) -> Self {
        Self::with_encoding(writer, PduKind::Json, OutputCapabilities::default())
    }

    /// Creates a writer with an explicit encoding and capability set.
    pub fn with_encoding(writer: W, kind: PduKind, capabilities: OutputCapabilities) -> Self {
        Self {
            writer,
            kind,
            capabilities,
        }
    }

    /// Writes one reply and flushes the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_reply(&mut self, reply: &Value) -> Result<(), DispatchError> {
        encode_pdu(self.kind, self.capabilities, reply, &mut self.writer)
    }

    /// Returns the wrapped stream.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> ReplyChannel for ResponseWriter<W> {
    fn send(&mut self, reply: &Value) -> Result<(), DispatchError> {
        self.write_reply(reply)
    }
}
