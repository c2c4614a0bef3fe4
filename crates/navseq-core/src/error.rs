#![forbid(unsafe_code)]

//! Error types.
//!
//! Ordinary transition outcomes are never errors: pushes and pops are
//! fire-and-forget, and an impossible pop is a silent no-op. What remains is
//! the internal re-entrancy violation and configuration loading.

use crate::descriptor::OperationKind;

/// The completion gate was armed while a transition was still outstanding.
///
/// Unreachable while the serializer upholds single-flight; the serializer
/// panics with this error rather than let ordering drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyArmedError {
    /// Operation that currently holds the gate.
    pub outstanding: OperationKind,
    /// Operation that attempted to arm it.
    pub attempted: OperationKind,
}

impl std::fmt::Display for AlreadyArmedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "completion gate already armed by {} while arming {}",
            self.outstanding, self.attempted
        )
    }
}

impl std::error::Error for AlreadyArmedError {}

/// Errors that can occur when loading a navigation configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
