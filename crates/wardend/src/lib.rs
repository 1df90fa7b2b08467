//! Command dispatch daemon for a filesystem-watching service.
//!
//! Clients send JSON requests whose first element names a command. The
//! [`dispatch`] module resolves each request against a frozen
//! [`dispatch::CommandRegistry`], enforces the poison and ownership policy,
//! times the handler, and guarantees that every failure produces exactly one
//! error reply. [`commands`] supplies the built-in probe commands
//! (`version`, `get-pid`, `list-capabilities`) that every registry carries.
//!
//! [`bootstrap_with`] ties the pieces together: it loads the layered
//! configuration from [`warden_config`], installs structured logging, and
//! returns a [`Daemon`] whose dispatcher can serve any number of sessions.

mod bootstrap;
pub mod commands;
pub mod dispatch;
mod telemetry;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
    bootstrap_with_sink,
};
pub use commands::standard_registry;
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
