//! Stdio front-end: dispatches one request read from standard input.

use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

use serde_json::Value;
use tracing::error;

use wardend::dispatch::{
    DispatchError, LookupMode, OutputCapabilities, PduKind, PeerIdentity, ProcessOwnerOracle,
    ResponseWriter, error_response, preprocess,
};
use wardend::{SystemConfigLoader, bootstrap_with, standard_registry};

const MAIN_TARGET: &str = "wardend::main";

fn main() -> ExitCode {
    let registry = match standard_registry(|_| Ok(())) {
        Ok(registry) => registry,
        Err(registry_error) => return report(&registry_error),
    };
    let daemon = match bootstrap_with(&SystemConfigLoader, Arc::clone(&registry)) {
        Ok(daemon) => daemon,
        Err(bootstrap_error) => return report(&bootstrap_error),
    };

    let kind = PduKind::from(daemon.config().output_encoding());
    let capabilities = OutputCapabilities::default();

    let request = match read_request(io::stdin().lock()) {
        Ok(request) => Arc::new(request),
        Err(read_error) => {
            error!(target: MAIN_TARGET, error = %read_error, "failed to read request");
            let mut writer = ResponseWriter::with_encoding(io::stdout(), kind, capabilities);
            if let Err(write_error) = writer.write_reply(&error_response(&read_error.to_string()))
            {
                error!(target: MAIN_TARGET, error = %write_error, "failed to deliver reply");
            }
            return ExitCode::FAILURE;
        }
    };

    preprocess(&registry, &request, kind, capabilities);

    let writer = ResponseWriter::with_encoding(io::stdout(), kind, capabilities);
    let mut session = daemon.open_session(
        PeerIdentity::current_process(),
        &ProcessOwnerOracle::current(),
        Box::new(writer),
    );
    match daemon
        .dispatcher()
        .dispatch(&mut session, &request, LookupMode::Daemon)
    {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(dispatch_error) => {
            error!(target: MAIN_TARGET, error = %dispatch_error, "failed to deliver reply");
            ExitCode::FAILURE
        }
    }
}

/// Reads the first line of `input` as a JSON request.
fn read_request<R: BufRead>(mut input: R) -> Result<Value, DispatchError> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(DispatchError::malformed("no request on standard input"));
    }
    serde_json::from_str(line.trim()).map_err(DispatchError::from_json_error)
}

/// Reports a failure that happened before logging was available.
fn report(error: &dyn Display) -> ExitCode {
    let _ = writeln!(io::stderr().lock(), "wardend: {error}");
    ExitCode::FAILURE
}
