//! Error types shared by the engine and the configuration layer.

use serde::Serialize;
use thiserror::Error;

/// Errors reported by the simulation engine.
///
/// Every variant is a local, recoverable condition: the caller of the
/// failing operation gets it back synchronously and the running simulation
/// is unaffected.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SimError {
    /// Requested instance count lies outside `[0, max]`.
    #[error("count {requested} for \"{appliance}\" is out of range [0, {max}]")]
    OutOfRange {
        appliance: String,
        requested: usize,
        max: usize,
    },
    #[error("unknown appliance \"{0}\"")]
    UnknownAppliance(String),
    #[error("unknown house {0}")]
    UnknownHouse(usize),
    #[error("appliance \"{0}\" has no settings")]
    NoSettingsSchema(String),
    #[error("appliance \"{appliance}\" has no option \"{option}\"")]
    UnknownOption { appliance: String, option: String },
    /// Envelope or wave parameters that cannot be evaluated.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.houses"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub(crate) fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}
