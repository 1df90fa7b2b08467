//! Test suites for the warden daemon.

mod bootstrap;
pub(crate) mod support;
