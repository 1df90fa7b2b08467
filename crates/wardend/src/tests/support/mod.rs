//! Test doubles shared by the unit and behavioural suites.

mod channel;
mod config_loader;
mod sink;

pub use channel::RecordingChannel;
pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use sink::RecordingSampleSink;
