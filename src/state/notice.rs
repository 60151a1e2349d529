//! Messages surfaced to the user

use std::fmt;

use serde::{Deserialize, Serialize};

/// A user-facing message. Alerts block until acknowledged, advisories do not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Notice {
    Alert(String),
    Advisory(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Self::Alert(message) | Self::Advisory(message) => message,
        }
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Alert(_))
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alert(message) => write!(f, "[!] {message}"),
            Self::Advisory(message) => write!(f, "[i] {message}"),
        }
    }
}
