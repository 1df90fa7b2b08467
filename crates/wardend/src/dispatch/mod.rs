//! Command dispatch core.
//!
//! Requests are JSON arrays whose element 0 names a command:
//!
//! ```json
//! ["version", {"required": ["cmd-get-pid"]}]
//! ```
//!
//! The [`CommandRegistry`] maps names to [`CommandDefinition`]s. The
//! [`Dispatcher`] resolves a request on a [`ClientSession`], checks the shared
//! [`PoisonState`] and the peer's ownership against the command's
//! [`CommandFlags`], runs the handler inside a [`PerfSample`], and answers any
//! failure with one error reply:
//!
//! ```json
//! {"version":"0.1.0","error":"Unknown command"}
//! ```
//!
//! [`preprocess`] is the separate CLI-time entry point. It validates a request
//! before any session exists and exits the process when validation fails.

mod dispatcher;
mod errors;
mod flags;
mod handler;
mod poison;
mod preprocess;
mod registry;
mod response;
mod sample;
mod session;

pub use self::dispatcher::{DispatchSettings, Dispatcher};
pub use self::errors::{CommandError, CommandValidationError, DispatchError, RegistryError};
pub use self::flags::{CommandFlag, CommandFlags, LookupMode};
pub use self::handler::{SessionConnectionHandler, SessionSummary};
pub use self::poison::PoisonState;
pub use self::preprocess::{
    CLI_VALIDATION_EXIT_STATUS, preprocess, validate_for_cli, write_cli_validation_error,
};
pub use self::registry::{
    CommandDefinition, CommandHandler, CommandRegistry, CommandRegistryBuilder,
    CommandValidator, command_name,
};
pub use self::response::{
    OutputCapabilities, PduKind, ReplyChannel, ResponseWriter, SERVICE_VERSION, encode_pdu,
    error_response, make_response,
};
pub use self::sample::{PerfSample, SampleSink, TracingSampleSink};
pub use self::session::{
    ClientSession, FixedOwnership, IdentityOracle, PeerIdentity, ProcessOwnerOracle,
};
