//! Per-connection client state.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Weak};

use serde_json::Value;
use tracing::warn;

use super::errors::DispatchError;
use super::response::{ReplyChannel, error_response};
use super::sample::PerfSample;

const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// Operating-system identity of a connected peer, as far as the transport
/// could determine it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeerIdentity {
    /// Peer process id.
    pub pid: Option<u32>,
    /// Peer effective user id.
    pub uid: Option<u32>,
}

impl PeerIdentity {
    /// Identity of the current process.
    pub fn current_process() -> Self {
        Self {
            pid: Some(std::process::id()),
            uid: Some(nix::unistd::geteuid().as_raw()),
        }
    }
}

/// Answers whether a peer is the owner of the service process.
pub trait IdentityOracle: Send + Sync {
    /// Reports whether `peer` runs as the service owner.
    fn is_owner(&self, peer: &PeerIdentity) -> bool;
}

/// Compares the peer uid with the service's effective uid.
///
/// Peers whose uid is unknown are never treated as the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOwnerOracle {
    owner_uid: u32,
}

impl ProcessOwnerOracle {
    /// Oracle for the running process's effective uid.
    pub fn current() -> Self {
        Self::for_uid(nix::unistd::geteuid().as_raw())
    }

    /// Oracle for an explicit owner uid.
    pub const fn for_uid(owner_uid: u32) -> Self {
        Self { owner_uid }
    }
}

impl IdentityOracle for ProcessOwnerOracle {
    fn is_owner(&self, peer: &PeerIdentity) -> bool {
        peer.uid == Some(self.owner_uid)
    }
}

/// Oracle returning a fixed answer, for transports without peer credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedOwnership(pub bool);

impl IdentityOracle for FixedOwnership {
    fn is_owner(&self, _peer: &PeerIdentity) -> bool {
        self.0
    }
}

/// State for one connected peer.
///
/// `current_command` and `active_sample` are only populated while a request is
/// being dispatched and are cleared by [`DispatchScope`] on every exit path.
pub struct ClientSession {
    peer: PeerIdentity,
    is_owner: bool,
    channel: Box<dyn ReplyChannel>,
    current_command: Option<Weak<Value>>,
    active_sample: Option<PerfSample>,
}

impl ClientSession {
    /// Creates a session, asking `oracle` whether the peer owns the service.
    pub fn new(
        peer: PeerIdentity,
        oracle: &dyn IdentityOracle,
        channel: Box<dyn ReplyChannel>,
    ) -> Self {
        let is_owner = oracle.is_owner(&peer);
        Self {
            peer,
            is_owner,
            channel,
            current_command: None,
            active_sample: None,
        }
    }

    /// Peer identity supplied by the transport.
    pub fn peer(&self) -> PeerIdentity {
        self.peer
    }

    /// Peer process id, if known.
    pub fn peer_pid(&self) -> Option<u32> {
        self.peer.pid
    }

    /// Reports whether the peer is the process owner.
    pub fn is_owner(&self) -> bool {
        self.is_owner
    }

    /// The request currently being dispatched, if it is still alive.
    pub fn current_command(&self) -> Option<Arc<Value>> {
        self.current_command.as_ref().and_then(Weak::upgrade)
    }

    /// Reports whether a request back-reference is attached.
    pub fn has_current_command(&self) -> bool {
        self.current_command.is_some()
    }

    /// The in-flight performance sample.
    pub fn active_sample(&self) -> Option<&PerfSample> {
        self.active_sample.as_ref()
    }

    /// Mutable access to the in-flight sample so handlers can add metadata.
    pub fn active_sample_mut(&mut self) -> Option<&mut PerfSample> {
        self.active_sample.as_mut()
    }

    /// Sends a reply through the session's transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the reply cannot be encoded or written.
    pub fn send_reply(&mut self, reply: &Value) -> Result<(), DispatchError> {
        self.channel.send(reply)
    }

    /// Sends `{"version": ..., "error": message}` and logs the failure with
    /// the command that caused it.
    ///
    /// # Errors
    ///
    /// Returns an error if the reply cannot be encoded or written.
    pub fn send_error_response(&mut self, message: &str) -> Result<(), DispatchError> {
        match self.current_command() {
            Some(command) => warn!(
                target: SESSION_TARGET,
                command = %command,
                error = message,
                "command failed"
            ),
            None => warn!(target: SESSION_TARGET, error = message, "request failed"),
        }
        self.channel.send(&error_response(message))
    }

    pub(crate) fn attach_sample(&mut self, sample: PerfSample) {
        self.active_sample = Some(sample);
    }

    pub(crate) fn take_sample(&mut self) -> Option<PerfSample> {
        self.active_sample.take()
    }
}

/// Guard that attaches a request to a session for the duration of one
/// dispatch and clears both back-references when dropped, including during
/// unwinding.
pub(crate) struct DispatchScope<'a> {
    session: &'a mut ClientSession,
}

impl<'a> DispatchScope<'a> {
    pub(crate) fn enter(session: &'a mut ClientSession, request: &Arc<Value>) -> Self {
        session.current_command = Some(Arc::downgrade(request));
        Self { session }
    }
}

impl Deref for DispatchScope<'_> {
    type Target = ClientSession;

    fn deref(&self) -> &Self::Target {
        self.session
    }
}

impl DerefMut for DispatchScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session
    }
}

impl Drop for DispatchScope<'_> {
    fn drop(&mut self) {
        self.session.current_command = None;
        self.session.active_sample = None;
    }
}
