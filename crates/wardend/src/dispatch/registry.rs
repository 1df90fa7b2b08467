//! Process-wide command registry.
//!
//! Definitions are collected through [`CommandRegistryBuilder`] during startup
//! and frozen by [`CommandRegistryBuilder::build`]. The resulting
//! [`CommandRegistry`] has no mutation API, so concurrent lookups from many
//! sessions share it through an `Arc` without synchronisation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::errors::{CommandError, CommandValidationError, RegistryError};
use super::flags::{CommandFlag, CommandFlags, LookupMode};
use super::session::ClientSession;

/// Executes a command against a client session.
#[cfg_attr(test, mockall::automock)]
pub trait CommandHandler: Send + Sync {
    /// Runs the command. Replies are sent through `session`.
    ///
    /// # Errors
    ///
    /// Returns an error when the command cannot complete; the dispatcher turns
    /// it into an error reply.
    fn handle(&self, session: &mut ClientSession, request: &Value) -> Result<(), CommandError>;
}

/// Checks a request's shape without executing side effects.
pub trait CommandValidator: Send + Sync {
    /// Validates `request` for one specific command.
    ///
    /// # Errors
    ///
    /// Returns a client-facing message describing what is malformed.
    fn validate(&self, request: &Value) -> Result<(), CommandValidationError>;
}

struct FnHandler<F>(F);

impl<F> CommandHandler for FnHandler<F>
where
    F: Fn(&mut ClientSession, &Value) -> Result<(), CommandError> + Send + Sync,
{
    fn handle(&self, session: &mut ClientSession, request: &Value) -> Result<(), CommandError> {
        (self.0)(session, request)
    }
}

struct FnValidator<F>(F);

impl<F> CommandValidator for FnValidator<F>
where
    F: Fn(&Value) -> Result<(), CommandValidationError> + Send + Sync,
{
    fn validate(&self, request: &Value) -> Result<(), CommandValidationError> {
        (self.0)(request)
    }
}

/// One registered command.
#[derive(Clone)]
pub struct CommandDefinition {
    name: String,
    handler: Arc<dyn CommandHandler>,
    validator: Option<Arc<dyn CommandValidator>>,
    flags: CommandFlags,
}

impl CommandDefinition {
    /// Creates a definition from a handler closure.
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut ClientSession, &Value) -> Result<(), CommandError> + Send + Sync + 'static,
    {
        Self::with_handler(name, Arc::new(FnHandler(handler)))
    }

    /// Creates a definition from a shared handler object.
    pub fn with_handler(name: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            name: name.into(),
            handler,
            validator: None,
            flags: CommandFlags::EMPTY,
        }
    }

    /// Attaches a CLI-time validator.
    #[must_use]
    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Value) -> Result<(), CommandValidationError> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(FnValidator(validator)));
        self
    }

    /// Replaces the capability flags.
    #[must_use]
    pub fn flags(mut self, flags: CommandFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Adds a single capability flag.
    #[must_use]
    pub fn flag(mut self, flag: CommandFlag) -> Self {
        self.flags = self.flags.with(flag);
        self
    }

    /// Command name as sent in element 0 of a request.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capability flags.
    pub fn command_flags(&self) -> CommandFlags {
        self.flags
    }

    /// Reports whether the definition carries `flag`.
    pub fn has_flag(&self, flag: CommandFlag) -> bool {
        self.flags.contains(flag)
    }

    /// Runs the handler.
    ///
    /// # Errors
    ///
    /// Propagates the handler's failure.
    pub fn invoke(&self, session: &mut ClientSession, request: &Value) -> Result<(), CommandError> {
        self.handler.handle(session, request)
    }

    /// Runs the validator when one is registered.
    ///
    /// # Errors
    ///
    /// Propagates the validator's failure.
    pub fn validate(&self, request: &Value) -> Result<(), CommandValidationError> {
        match &self.validator {
            Some(validator) => validator.validate(request),
            None => Ok(()),
        }
    }

    /// Reports whether a validator is registered.
    pub fn has_validator(&self) -> bool {
        self.validator.is_some()
    }
}

impl fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("has_validator", &self.validator.is_some())
            .finish_non_exhaustive()
    }
}

/// Collects command definitions before the registry is frozen.
#[derive(Debug, Default)]
pub struct CommandRegistryBuilder {
    commands: HashMap<String, CommandDefinition>,
}

impl CommandRegistryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a definition.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateCommand`] when the name is taken and
    /// [`RegistryError::EmptyName`] for an empty name.
    pub fn register(&mut self, definition: CommandDefinition) -> Result<&mut Self, RegistryError> {
        if definition.name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.commands.contains_key(&definition.name) {
            return Err(RegistryError::DuplicateCommand {
                name: definition.name,
            });
        }
        self.commands.insert(definition.name.clone(), definition);
        Ok(self)
    }

    /// Freezes the collected definitions.
    pub fn build(self) -> CommandRegistry {
        CommandRegistry {
            commands: self.commands,
        }
    }
}

/// Immutable mapping from command name to definition.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, CommandDefinition>,
}

impl CommandRegistry {
    /// Starts a new registry builder.
    pub fn builder() -> CommandRegistryBuilder {
        CommandRegistryBuilder::new()
    }

    /// Resolves a request to its command definition.
    ///
    /// `Ok(None)` means the name is not registered; callers decide whether
    /// that is an error (dispatch) or a pass-through (CLI validation).
    ///
    /// # Errors
    ///
    /// Returns a [`CommandValidationError`] when the request is not a
    /// non-empty array with a string in element 0, or when the resolved
    /// command is not available in `mode`.
    pub fn lookup(
        &self,
        request: &Value,
        mode: LookupMode,
    ) -> Result<Option<&CommandDefinition>, CommandValidationError> {
        let name = command_name(request)?;
        self.lookup_command(name, mode)
    }

    /// Resolves a bare command name.
    ///
    /// # Errors
    ///
    /// Returns a [`CommandValidationError`] when the command exists but lacks
    /// the flag `mode` requires.
    pub fn lookup_command(
        &self,
        name: &str,
        mode: LookupMode,
    ) -> Result<Option<&CommandDefinition>, CommandValidationError> {
        let Some(definition) = self.commands.get(name) else {
            return Ok(None);
        };
        match mode.required_flag() {
            Some(flag) if !definition.has_flag(flag) => {
                Err(CommandValidationError::unavailable_in_mode(name))
            }
            _ => Ok(Some(definition)),
        }
    }

    /// Capability names advertised for the registered commands, sorted.
    pub fn capabilities(&self) -> Vec<String> {
        let mut capabilities: Vec<String> = self
            .commands
            .keys()
            .map(|name| format!("cmd-{name}"))
            .collect();
        capabilities.sort_unstable();
        capabilities
    }

    /// Reports whether a capability name is supported.
    pub fn has_capability(&self, capability: &str) -> bool {
        capability
            .strip_prefix("cmd-")
            .is_some_and(|name| self.commands.contains_key(name))
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Reports whether no commands are registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Extracts the command name from element 0 of a request.
///
/// # Errors
///
/// Fails when the request is not a non-empty array or element 0 is not a
/// string.
pub fn command_name(request: &Value) -> Result<&str, CommandValidationError> {
    let first = request
        .as_array()
        .and_then(|elements| elements.first())
        .ok_or_else(CommandValidationError::empty_request)?;
    first
        .as_str()
        .ok_or_else(CommandValidationError::missing_command_name)
}
