//! Error types for command lookup, handler execution, and reply delivery.
//!
//! Failures split into two families. [`CommandValidationError`] and
//! [`CommandError`] are recoverable: the dispatcher turns them into error
//! replies and the session carries on. [`DispatchError`] covers the transport
//! side (reading request lines, encoding and writing replies); when writing an
//! error reply itself fails there is nobody left to tell, so it propagates.

use std::io;

use thiserror::Error;

/// A request was malformed, either structurally or for a specific command.
///
/// The message is surfaced to the client verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CommandValidationError {
    message: String,
}

impl CommandValidationError {
    /// Creates a validation error with the given client-facing message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Request was not an array or was empty.
    pub(crate) fn empty_request() -> Self {
        Self::new("invalid command (expected an array with some elements!)")
    }

    /// Element 0 was missing or not a string.
    pub(crate) fn missing_command_name() -> Self {
        Self::new("invalid command: expected element 0 to be the command name")
    }

    /// The command exists but may not run in the requested lookup mode.
    pub(crate) fn unavailable_in_mode(name: &str) -> Self {
        Self::new(format!("command {name} not available in this mode"))
    }

    /// Returns the client-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failures raised by a command handler.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Arguments were rejected by the handler.
    #[error(transparent)]
    Validation(#[from] CommandValidationError),

    /// The command ran but could not complete.
    #[error("{message}")]
    Failed { message: String },

    /// The handler's own reply could not be delivered.
    #[error(transparent)]
    Reply(#[from] DispatchError),
}

impl CommandError {
    /// Creates a generic handler failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Errors surfaced while reading requests or delivering replies.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Request line could not be parsed as JSON.
    #[error("malformed request: {message}")]
    MalformedRequest {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Request exceeds the maximum allowed size.
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    RequestTooLarge { size: usize, max_size: usize },

    /// IO error during read or write.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Reply serialization failed.
    #[error("failed to serialize reply: {0}")]
    SerializeReply(#[source] serde_json::Error),
}

impl DispatchError {
    /// Creates a malformed request error from a serde error.
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::MalformedRequest {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a malformed request error with a custom message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRequest {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a request too large error.
    pub fn request_too_large(size: usize, max_size: usize) -> Self {
        Self::RequestTooLarge { size, max_size }
    }

    /// Returns true when the error came from the request side rather than the
    /// reply channel, meaning the connection is still usable.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedRequest { .. } | Self::RequestTooLarge { .. }
        )
    }
}

/// Errors raised while populating the command registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A command with the same name was already registered.
    #[error("command '{name}' is already registered")]
    DuplicateCommand { name: String },

    /// Command names must be non-empty.
    #[error("command names must not be empty")]
    EmptyName,
}
