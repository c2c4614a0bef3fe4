#![forbid(unsafe_code)]

//! Configuration for a navigation surface.
//!
//! Every field defaults to the built-in behaviour, so `NavConfig::default()`
//! needs no file at all. With the `config` feature the same struct loads from
//! TOML or JSON:
//!
//! ```toml
//! # navseq.toml
//! [gesture]
//! enabled = true
//! min_depth = 2
//!
//! [queue]
//! initial_capacity = 16
//!
//! [surface]
//! thread_name = "nav-main"
//! ```
//!
//! ```rust,ignore
//! let config = NavConfig::from_toml_file("navseq.toml")?.validated()?;
//! ```

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct NavConfig {
    /// Interactive pop gesture.
    pub gesture: GestureConfig,
    /// Request queue.
    pub queue: QueueConfig,
    /// Actor thread hosting the serializer.
    pub surface: SurfaceConfig,
}

/// Interactive pop gesture settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct GestureConfig {
    /// Whether drag gestures may start an interactive pop (default: true).
    pub enabled: bool,
    /// Minimum stack depth for a drag to start (default: 2).
    pub min_depth: usize,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_depth: 2,
        }
    }
}

/// Request queue settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct QueueConfig {
    /// Pre-allocated slots (default: 8). The queue grows past this freely.
    pub initial_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 8,
        }
    }
}

/// Actor thread settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct SurfaceConfig {
    /// Name of the thread that owns the serializer (default: `navseq-surface`).
    pub thread_name: String,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            thread_name: "navseq-surface".into(),
        }
    }
}

impl NavConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Serialize to a TOML string.
    #[cfg(feature = "config")]
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        // Popping below the root is never possible
        if self.gesture.min_depth < 2 {
            errors.push(format!(
                "gesture.min_depth must be >= 2, got {}",
                self.gesture.min_depth
            ));
        }

        if self.surface.thread_name.trim().is_empty() {
            errors.push("surface.thread_name must not be empty".into());
        }
        if self.surface.thread_name.contains('\0') {
            errors.push("surface.thread_name must not contain NUL".into());
        }

        errors
    }

    /// Return `self` if it validates, otherwise every validation error.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}
