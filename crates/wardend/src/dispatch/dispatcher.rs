//! Runtime dispatch of requests on an established session.
//!
//! [`Dispatcher::dispatch`] resolves the command, applies the policy checks in
//! a fixed order, runs the handler inside a [`PerfSample`], and turns every
//! failure into exactly one error reply:
//!
//! 1. lookup (malformed requests and unknown commands are rejected),
//! 2. poison check, skipped for [`CommandFlag::PoisonImmune`] commands,
//! 3. owner check, skipped for [`CommandFlag::AllowAnyUser`] commands,
//! 4. handler execution.
//!
//! The poison check runs before the owner check, so a poisoned service
//! reports the poison reason even to peers that would also fail the owner
//! check.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::debug;
use warden_config::Config;

use super::errors::{CommandError, CommandValidationError, DispatchError};
use super::flags::{CommandFlag, LookupMode};
use super::poison::PoisonState;
use super::registry::{CommandDefinition, CommandRegistry};
use super::sample::{PerfSample, SampleSink};
use super::session::{ClientSession, DispatchScope};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Settings consulted on every dispatch.
pub trait DispatchSettings: Send + Sync {
    /// Elapsed time after which a command is logged as slow.
    fn slow_command_log_threshold(&self) -> Duration;
}

impl DispatchSettings for Config {
    fn slow_command_log_threshold(&self) -> Duration {
        Self::slow_command_log_threshold(self)
    }
}

impl DispatchSettings for Duration {
    fn slow_command_log_threshold(&self) -> Duration {
        *self
    }
}

/// Why a request did not run to completion.
#[derive(Debug)]
enum Rejection {
    Invalid(CommandValidationError),
    UnknownCommand,
    Poisoned(String),
    NotOwner(String),
    Failed(CommandError),
}

impl Rejection {
    fn message(&self) -> String {
        match self {
            Self::Invalid(error) => error.message().to_owned(),
            Self::UnknownCommand => "Unknown command".to_owned(),
            Self::Poisoned(reason) => reason.clone(),
            Self::NotOwner(name) => {
                format!("you must be the process owner to execute '{name}'")
            }
            Self::Failed(error) => error.to_string(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "invalid",
            Self::UnknownCommand => "unknown_command",
            Self::Poisoned(_) => "poisoned",
            Self::NotOwner(_) => "not_owner",
            Self::Failed(_) => "handler_failed",
        }
    }
}

/// Resolves requests against a registry and enforces dispatch policy.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    poison: PoisonState,
    settings: Arc<dyn DispatchSettings>,
    sink: Arc<dyn SampleSink>,
}

impl Dispatcher {
    /// Creates a dispatcher over shared collaborators.
    pub fn new(
        registry: Arc<CommandRegistry>,
        poison: PoisonState,
        settings: Arc<dyn DispatchSettings>,
        sink: Arc<dyn SampleSink>,
    ) -> Self {
        Self {
            registry,
            poison,
            settings,
            sink,
        }
    }

    /// Registry this dispatcher resolves against.
    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Poison state consulted before each command.
    pub fn poison(&self) -> &PoisonState {
        &self.poison
    }

    /// Dispatches one request on `session`.
    ///
    /// Returns `Ok(true)` when the handler completed and `Ok(false)` when the
    /// request was rejected or the handler failed; in the latter case one
    /// error reply has been sent. The session's request and sample
    /// back-references are cleared before returning.
    ///
    /// # Errors
    ///
    /// Returns an error only when the error reply itself cannot be delivered.
    pub fn dispatch(
        &self,
        session: &mut ClientSession,
        request: &Arc<Value>,
        mode: LookupMode,
    ) -> Result<bool, DispatchError> {
        let mut scope = DispatchScope::enter(session, request);
        match self.run(&mut scope, request, mode) {
            Ok(()) => Ok(true),
            Err(rejection) => {
                debug!(
                    target: DISPATCH_TARGET,
                    rejection = rejection.kind(),
                    "dispatch_command rejected"
                );
                scope.send_error_response(&rejection.message())?;
                Ok(false)
            }
        }
    }

    fn run(
        &self,
        session: &mut ClientSession,
        request: &Value,
        mode: LookupMode,
    ) -> Result<(), Rejection> {
        let definition = self
            .registry
            .lookup(request, mode)
            .map_err(Rejection::Invalid)?
            .ok_or(Rejection::UnknownCommand)?;

        if let Some(reason) = self.poison.read() {
            if !definition.has_flag(CommandFlag::PoisonImmune) {
                return Err(Rejection::Poisoned(reason));
            }
        }

        if !session.is_owner() && !definition.has_flag(CommandFlag::AllowAnyUser) {
            return Err(Rejection::NotOwner(definition.name().to_owned()));
        }

        self.execute(definition, session, request)
            .map_err(Rejection::Failed)
    }

    fn execute(
        &self,
        definition: &CommandDefinition,
        session: &mut ClientSession,
        request: &Value,
    ) -> Result<(), CommandError> {
        let name = definition.name();
        debug!(target: DISPATCH_TARGET, command = name, "dispatch_command");

        let mut sample = PerfSample::new(format!("dispatch_command:{name}"));
        sample.set_wall_time_threshold(self.settings.slow_command_log_threshold());
        session.attach_sample(sample);

        definition.invoke(session, request)?;

        if let Some(mut sample) = session.take_sample() {
            if sample.finish() {
                sample.add_meta("args", request.clone());
                sample.add_meta("client", json!({ "pid": session.peer_pid() }));
                sample.log(self.sink.as_ref());
            }
        }

        debug!(
            target: DISPATCH_TARGET,
            command = name,
            "dispatch_command completed"
        );
        Ok(())
    }
}
