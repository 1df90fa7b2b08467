//! CLI-time request validation.
//!
//! This path runs before any client session exists, typically when a request
//! is given on the command line. Unknown commands pass through untouched so
//! newer daemons can accept commands this binary does not know. A request
//! that fails validation is answered on standard output and the process
//! exits; it never returns to the caller.

use std::io::{self, Write};
use std::process;

use serde_json::Value;

use super::errors::{CommandValidationError, DispatchError};
use super::flags::LookupMode;
use super::registry::CommandRegistry;
use super::response::{OutputCapabilities, PduKind, SERVICE_VERSION, encode_pdu};

/// Exit status used when CLI validation rejects a request.
pub const CLI_VALIDATION_EXIT_STATUS: i32 = 1;

/// Resolves `request` and runs its validator, if any.
///
/// # Errors
///
/// Returns the lookup or validator failure.
pub fn validate_for_cli(
    registry: &CommandRegistry,
    request: &Value,
) -> Result<(), CommandValidationError> {
    match registry.lookup(request, LookupMode::Any)? {
        Some(definition) => definition.validate(request),
        None => Ok(()),
    }
}

/// Encodes the CLI validation failure reply onto `writer`.
///
/// The reply is `{"error": ..., "version": ..., "cli_validated": true}`.
///
/// # Errors
///
/// Returns an error if encoding or writing fails.
pub fn write_cli_validation_error<W: Write>(
    error: &CommandValidationError,
    kind: PduKind,
    capabilities: OutputCapabilities,
    writer: W,
) -> Result<(), DispatchError> {
    let mut reply = serde_json::Map::new();
    reply.insert("error".to_owned(), Value::from(error.message()));
    reply.insert("version".to_owned(), Value::from(SERVICE_VERSION));
    reply.insert("cli_validated".to_owned(), Value::Bool(true));
    encode_pdu(kind, capabilities, &Value::Object(reply), writer)
}

/// Validates `request` and terminates the process if it is malformed.
///
/// Returns normally when the request is valid or names an unknown command.
/// On failure the error reply is written to standard output in the requested
/// encoding and the process exits with [`CLI_VALIDATION_EXIT_STATUS`].
pub fn preprocess(
    registry: &CommandRegistry,
    request: &Value,
    kind: PduKind,
    capabilities: OutputCapabilities,
) {
    let Err(error) = validate_for_cli(registry, request) else {
        return;
    };

    let stdout = io::stdout();
    if let Err(write_error) = write_cli_validation_error(&error, kind, capabilities, stdout.lock())
    {
        tracing::error!(
            target: super::dispatcher::DISPATCH_TARGET,
            error = %write_error,
            validation_error = %error,
            "failed to write CLI validation error"
        );
    }
    process::exit(CLI_VALIDATION_EXIT_STATUS);
}
