//! Shared "poison" kill-switch.
//!
//! Once an unrecoverable fault has been observed (for example the kernel
//! refusing further filesystem watches) every command that is not
//! [`CommandFlag::PoisonImmune`](super::CommandFlag::PoisonImmune) is answered
//! with the stored diagnostic instead of running.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::error;

const POISON_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::poison");

/// Cloneable handle to the process-wide poison reason.
///
/// Reads take a shared lock and return an owned copy, so a reader never sees a
/// partially written reason and never holds the lock while replying.
#[derive(Clone, Default)]
pub struct PoisonState {
    reason: Arc<RwLock<Option<String>>>,
}

impl PoisonState {
    /// Creates a healthy state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current reason, or `None` when healthy.
    pub fn read(&self) -> Option<String> {
        self.reason
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the current reason. An empty reason counts as healthy.
    pub fn write(&self, reason: Option<String>) {
        *self
            .reason
            .write()
            .unwrap_or_else(PoisonError::into_inner) = reason.filter(|text| !text.is_empty());
    }

    /// Reports whether a reason is set.
    pub fn is_poisoned(&self) -> bool {
        self.reason
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Records an unrecoverable syscall failure.
    ///
    /// The first fault wins: later calls leave an existing reason untouched so
    /// clients keep seeing the original cause. Returns `true` when this call
    /// poisoned the state.
    pub fn poison_on_failure(
        &self,
        directory: &str,
        syscall: &str,
        failure: &dyn fmt::Display,
    ) -> bool {
        let mut guard = self
            .reason
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if guard.is_some() {
            return false;
        }

        let reason = failure_reason(directory, syscall, failure, OffsetDateTime::now_utc());
        error!(
            target: POISON_TARGET,
            directory,
            syscall,
            failure = %failure,
            "service poisoned"
        );
        *guard = Some(reason);
        true
    }
}

impl fmt::Debug for PoisonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoisonState")
            .field("reason", &self.read())
            .finish()
    }
}

fn failure_reason(
    directory: &str,
    syscall: &str,
    failure: &dyn fmt::Display,
    at: OffsetDateTime,
) -> String {
    let timestamp = at
        .format(&Rfc3339)
        .unwrap_or_else(|_| at.unix_timestamp().to_string());
    format!(
        "A non-recoverable condition has triggered. warden needs your help!\n\
         The triggering condition was at timestamp={timestamp}: {syscall}({directory}) -> {failure}\n\
         All requests will continue to fail with this message until you resolve\n\
         the underlying problem and restart the service.\n"
    )
}
