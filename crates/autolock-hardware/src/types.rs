//! Common types shared across hardware device implementations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logic level of a digital pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    /// Returns `true` for `High`.
    #[inline]
    pub fn is_high(self) -> bool {
        matches!(self, Self::High)
    }

    /// The level as a raw `0`/`1` sample.
    #[inline]
    pub fn as_bit(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::High => 1,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_bit())
    }
}

/// How a claimed pin is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinMode {
    /// Digital input (switches).
    Input,
    /// Digital output (indicators).
    Output,
    /// Pulse-width modulated output (servo, buzzer).
    Pwm,
}

impl fmt::Display for PinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
            Self::Pwm => write!(f, "pwm"),
        }
    }
}

/// Card reader information.
///
/// Contains reader-specific metadata such as supported protocols.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderInfo {
    /// Reader name (e.g., "PN533 USB").
    pub name: String,

    /// List of supported protocols (e.g., ["ISO14443A", "FeliCa"]).
    pub protocols: Vec<String>,
}

impl ReaderInfo {
    /// Create a new ReaderInfo.
    pub fn new(name: impl Into<String>, protocols: Vec<String>) -> Self {
        Self {
            name: name.into(),
            protocols,
        }
    }
}
