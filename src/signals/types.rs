/*!
 * Signal Types
 * Configurable kill signal parsed from POSIX names
 */

use crate::core::errors::PoolError;
use nix::sys::signal::Signal;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::fmt;
use std::str::FromStr;

/// Signal sent to a child on timeout or graceful shutdown
///
/// Parses `SIGTERM`, `TERM` and `sigterm` alike; displays as `SIGTERM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct KillSignal(Signal);

impl KillSignal {
    /// Cooperative termination request
    pub const TERM: Self = Self(Signal::SIGTERM);
    /// Interrupt, as from Ctrl+C
    pub const INT: Self = Self(Signal::SIGINT);
    /// Unconditional termination
    pub const KILL: Self = Self(Signal::SIGKILL);

    #[inline]
    pub const fn new(signal: Signal) -> Self {
        Self(signal)
    }

    #[inline]
    pub const fn as_nix(self) -> Signal {
        self.0
    }

    /// Raw signal number
    #[inline]
    pub fn number(self) -> i32 {
        self.0 as i32
    }

    #[inline]
    pub fn name(self) -> &'static str {
        self.0.as_str()
    }
}

impl Default for KillSignal {
    fn default() -> Self {
        Self::TERM
    }
}

impl From<Signal> for KillSignal {
    fn from(signal: Signal) -> Self {
        Self(signal)
    }
}

impl FromStr for KillSignal {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let name = if upper.starts_with("SIG") {
            upper
        } else {
            format!("SIG{}", upper)
        };

        Signal::from_str(&name)
            .map(Self)
            .map_err(|_| PoolError::InvalidSignal(s.to_string()))
    }
}

impl fmt::Display for KillSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
