//! Reply channel that keeps every reply for later assertions.

use std::io;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::dispatch::{DispatchError, ReplyChannel};

/// Records replies in memory. Clones share the same buffer, so a test can keep
/// one clone while the session owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingChannel {
    replies: Arc<Mutex<Vec<Value>>>,
    broken: bool,
}

impl RecordingChannel {
    /// A channel whose every send fails with a broken pipe.
    pub fn failing() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    /// Snapshot of the replies sent so far.
    pub fn replies(&self) -> Vec<Value> {
        self.replies.lock().expect("reply mutex poisoned").clone()
    }

    /// The `error` field of each error reply, in order.
    pub fn error_messages(&self) -> Vec<String> {
        self.replies()
            .iter()
            .filter_map(|reply| reply.get("error").and_then(Value::as_str))
            .map(str::to_owned)
            .collect()
    }
}

impl ReplyChannel for RecordingChannel {
    fn send(&mut self, reply: &Value) -> Result<(), DispatchError> {
        if self.broken {
            return Err(DispatchError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "peer went away",
            )));
        }
        self.replies
            .lock()
            .expect("reply mutex poisoned")
            .push(reply.clone());
        Ok(())
    }
}
