//! WebSocket close codes
//!
//! The code on the final close frame of a chat stream tells the client how the
//! session ended.

use serde::{Deserialize, Serialize};

/// Chat stream close codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum CloseCode {
    /// Client finished the stream or the user logged out
    Normal = 1000,
    /// Transport or dependency failure
    Internal = 4000,
    /// Malformed frame or unsupported message kind
    InvalidArgument = 4002,
    /// No verified identity on the stream
    Unauthenticated = 4003,
    /// The user has no session in the registry
    NotLoggedIn = 4004,
}

impl CloseCode {
    /// Create a `CloseCode` from a raw u16 value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1000 => Some(Self::Normal),
            4000 => Some(Self::Internal),
            4002 => Some(Self::InvalidArgument),
            4003 => Some(Self::Unauthenticated),
            4004 => Some(Self::NotLoggedIn),
            _ => None,
        }
    }

    /// Get the raw u16 value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Normal => "Stream closed",
            Self::Internal => "Internal error",
            Self::InvalidArgument => "Invalid argument",
            Self::Unauthenticated => "Not authenticated",
            Self::NotLoggedIn => "Not logged in",
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Internal => "Internal",
            Self::InvalidArgument => "InvalidArgument",
            Self::Unauthenticated => "Unauthenticated",
            Self::NotLoggedIn => "NotLoggedIn",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.as_u16(), self.description())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}
