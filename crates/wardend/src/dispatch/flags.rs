//! Command capability flags and lookup modes.

use std::fmt;

/// Capabilities a command definition may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandFlag {
    /// Runs even after the service has been poisoned.
    PoisonImmune,
    /// Runs for peers that are not the process owner.
    AllowAnyUser,
    /// Available when resolved inside the daemon.
    Daemon,
    /// Available when resolved on the client side.
    Client,
}

impl CommandFlag {
    /// Every flag, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::PoisonImmune,
        Self::AllowAnyUser,
        Self::Daemon,
        Self::Client,
    ];

    const fn bit(self) -> u8 {
        match self {
            Self::PoisonImmune => 1,
            Self::AllowAnyUser => 1 << 1,
            Self::Daemon => 1 << 2,
            Self::Client => 1 << 3,
        }
    }

    /// Returns the canonical string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PoisonImmune => "poison_immune",
            Self::AllowAnyUser => "allow_any_user",
            Self::Daemon => "daemon",
            Self::Client => "client",
        }
    }
}

/// Set of [`CommandFlag`]s attached to a command definition.
///
/// Callers query membership with [`CommandFlags::contains`]; the storage is an
/// implementation detail.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CommandFlags(u8);

impl CommandFlags {
    /// The empty set: owner-only, blocked by poison, available in no mode.
    pub const EMPTY: Self = Self(0);

    /// Returns a copy of the set with `flag` added.
    #[must_use]
    pub const fn with(self, flag: CommandFlag) -> Self {
        Self(self.0 | flag.bit())
    }

    /// Builds a set from a slice of flags.
    #[must_use]
    pub const fn from_flags(flags: &[CommandFlag]) -> Self {
        let mut set = Self::EMPTY;
        let mut index = 0;
        while index < flags.len() {
            set = set.with(flags[index]);
            index += 1;
        }
        set
    }

    /// Reports whether `flag` is present.
    #[must_use]
    pub const fn contains(self, flag: CommandFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    /// Iterates over the flags present in the set.
    pub fn iter(self) -> impl Iterator<Item = CommandFlag> {
        CommandFlag::ALL
            .into_iter()
            .filter(move |flag| self.contains(*flag))
    }
}

impl fmt::Debug for CommandFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.iter().map(CommandFlag::as_str))
            .finish()
    }
}

impl FromIterator<CommandFlag> for CommandFlags {
    fn from_iter<I: IntoIterator<Item = CommandFlag>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

/// Context in which a command name is resolved.
///
/// The mode never changes which definition a name resolves to; it only
/// decides whether a resolved definition may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupMode {
    /// No availability restriction. Used by CLI-time validation.
    #[default]
    Any,
    /// Runtime dispatch inside the daemon.
    Daemon,
    /// Client-side handling.
    Client,
}

impl LookupMode {
    /// Flag a definition must carry to be usable in this mode.
    pub const fn required_flag(self) -> Option<CommandFlag> {
        match self {
            Self::Any => None,
            Self::Daemon => Some(CommandFlag::Daemon),
            Self::Client => Some(CommandFlag::Client),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_contains_nothing() {
        for flag in CommandFlag::ALL {
            assert!(!CommandFlags::EMPTY.contains(flag));
        }
    }

    #[test]
    fn membership_is_independent_per_flag() {
        let flags = CommandFlags::from_flags(&[CommandFlag::PoisonImmune, CommandFlag::Daemon]);
        assert!(flags.contains(CommandFlag::PoisonImmune));
        assert!(flags.contains(CommandFlag::Daemon));
        assert!(!flags.contains(CommandFlag::AllowAnyUser));
        assert!(!flags.contains(CommandFlag::Client));
    }

    #[test]
    fn collects_from_iterator() {
        let flags: CommandFlags = [CommandFlag::Client, CommandFlag::Client].into_iter().collect();
        assert_eq!(flags.iter().collect::<Vec<_>>(), vec![CommandFlag::Client]);
    }

    #[test]
    fn debug_lists_flag_names() {
        let flags = CommandFlags::EMPTY.with(CommandFlag::AllowAnyUser);
        assert_eq!(format!("{flags:?}"), r#"{"allow_any_user"}"#);
    }

    #[test]
    fn any_mode_requires_no_flag() {
        assert_eq!(LookupMode::Any.required_flag(), None);
        assert_eq!(LookupMode::Daemon.required_flag(), Some(CommandFlag::Daemon));
        assert_eq!(LookupMode::Client.required_flag(), Some(CommandFlag::Client));
    }
}
