//! Request loop for one client connection.
//!
//! The [`SessionConnectionHandler`] reads newline-delimited JSON requests
//! from a byte stream and dispatches each on the connection's
//! [`ClientSession`] until the peer hangs up. How the stream was accepted
//! (socket, pipe, stdio) is the caller's business.

use std::io::{BufRead, BufReader, Read};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::dispatcher::{DISPATCH_TARGET, Dispatcher};
use super::errors::DispatchError;
use super::flags::LookupMode;
use super::session::ClientSession;

/// Maximum size of a single request line in bytes.
pub(crate) const MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Counts of requests handled on one connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Requests whose handler completed.
    pub succeeded: usize,
    /// Requests answered with an error reply.
    pub failed: usize,
}

/// Drives dispatch for a single connection.
#[derive(Clone)]
pub struct SessionConnectionHandler {
    dispatcher: Dispatcher,
    mode: LookupMode,
}

impl SessionConnectionHandler {
    /// Creates a handler that resolves commands in daemon mode.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self::with_mode(dispatcher, LookupMode::Daemon)
    }

    /// Creates a handler with an explicit lookup mode.
    pub fn with_mode(dispatcher: Dispatcher, mode: LookupMode) -> Self {
        Self { dispatcher, mode }
    }

    /// Reads and dispatches requests until end of stream.
    ///
    /// Malformed lines are answered with an error reply and skipped. An
    /// oversized line ends the connection after its error reply because the
    /// stream can no longer be framed reliably.
    ///
    /// # Errors
    ///
    /// Returns an error when reading the stream or delivering a reply fails.
    pub fn serve<R: Read>(
        &self,
        stream: R,
        session: &mut ClientSession,
    ) -> Result<SessionSummary, DispatchError> {
        let mut reader = BufReader::new(stream);
        let mut summary = SessionSummary::default();

        loop {
            let line = match read_request_line(&mut reader) {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!(target: DISPATCH_TARGET, ?summary, "client disconnected");
                    return Ok(summary);
                }
                Err(error) if error.is_request_error() => {
                    warn!(target: DISPATCH_TARGET, %error, "rejecting request");
                    session.send_error_response(&error.to_string())?;
                    summary.failed += 1;
                    return Ok(summary);
                }
                Err(error) => return Err(error),
            };

            let request = match parse_request(&line) {
                Ok(Some(request)) => request,
                Ok(None) => continue,
                Err(error) => {
                    warn!(target: DISPATCH_TARGET, %error, "malformed request");
                    session.send_error_response(&error.to_string())?;
                    summary.failed += 1;
                    continue;
                }
            };

            if self
                .dispatcher
                .dispatch(session, &Arc::new(request), self.mode)?
            {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
        }
    }
}

/// Reads one bounded request line.
///
/// Returns `Ok(None)` at end of stream. A final line without a trailing
/// newline is still returned.
fn read_request_line<R: BufRead>(reader: &mut R) -> Result<Option<Vec<u8>>, DispatchError> {
    let mut buffer = Vec::new();
    let limit = u64::try_from(MAX_REQUEST_BYTES + 1).unwrap_or(u64::MAX);
    let bytes_read = reader.by_ref().take(limit).read_until(b'\n', &mut buffer)?;
    if bytes_read == 0 {
        return Ok(None);
    }
    enforce_limit(buffer.len())?;
    Ok(Some(buffer))
}

/// Enforces the maximum request size limit.
fn enforce_limit(size: usize) -> Result<(), DispatchError> {
    if size > MAX_REQUEST_BYTES {
        return Err(DispatchError::request_too_large(size, MAX_REQUEST_BYTES));
    }
    Ok(())
}

/// Parses a request line; blank lines yield `None`.
fn parse_request(line: &[u8]) -> Result<Option<Value>, DispatchError> {
    let trimmed = line.trim_ascii();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(trimmed)
        .map(Some)
        .map_err(DispatchError::from_json_error)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::commands::standard_registry;
    use crate::dispatch::poison::PoisonState;
    use crate::dispatch::session::{FixedOwnership, PeerIdentity};
    use crate::tests::support::{RecordingChannel, RecordingSampleSink};

    fn handler() -> SessionConnectionHandler {
        let registry = standard_registry(|_| Ok(())).expect("registry");
        let dispatcher = Dispatcher::new(
            registry,
            PoisonState::new(),
            Arc::new(Duration::from_secs(60)),
            Arc::new(RecordingSampleSink::default()),
        );
        SessionConnectionHandler::new(dispatcher)
    }

    fn session() -> (ClientSession, RecordingChannel) {
        let channel = RecordingChannel::default();
        let session = ClientSession::new(
            PeerIdentity::default(),
            &FixedOwnership(true),
            Box::new(channel.clone()),
        );
        (session, channel)
    }

    #[test]
    fn dispatches_each_line() {
        let (mut session, channel) = session();
        let input = b"[\"get-pid\"]\n\n[\"version\"]";
        let summary = handler()
            .serve(Cursor::new(&input[..]), &mut session)
            .expect("serve");

        assert_eq!(
            summary,
            SessionSummary {
                succeeded: 2,
                failed: 0
            }
        );
        let replies = channel.replies();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["pid"], json!(std::process::id()));
    }

    #[test]
    fn malformed_lines_do_not_end_the_session() {
        let (mut session, channel) = session();
        let input = b"not json\n[\"bogus\"]\n[\"version\"]\n";
        let summary = handler()
            .serve(Cursor::new(&input[..]), &mut session)
            .expect("serve");

        assert_eq!(
            summary,
            SessionSummary {
                succeeded: 1,
                failed: 2
            }
        );
        let errors = channel.error_messages();
        assert!(errors[0].starts_with("malformed request"));
        assert_eq!(errors[1], "Unknown command");
    }

    #[test]
    fn oversized_lines_end_the_session() {
        let (mut session, channel) = session();
        let mut input = vec![b' '; MAX_REQUEST_BYTES + 10];
        input.extend_from_slice(b"\n[\"version\"]\n");
        let summary = handler()
            .serve(Cursor::new(input), &mut session)
            .expect("serve");

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded, 0);
        assert!(channel.error_messages()[0].starts_with("request too large"));
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert!(parse_request(b"  \r\n").expect("parse").is_none());
    }
}
