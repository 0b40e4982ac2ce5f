//! Core error types for touchbox-core.
//!
//! Domain operations (arbitration, clock, ledger) are total and never fail.
//! Errors only come from configuration handling, scenario loading and the
//! shared indicator device.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for touchbox-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Indicator/buzzer output errors
    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// No home/config directory could be resolved
    #[error("Configuration directory unavailable: {0}")]
    DirUnavailable(String),
}

/// Timing and preset validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The simultaneity window must fit inside the evaluation delay.
    #[error("window_ms ({window_ms}) must not exceed eval_delay_ms ({eval_delay_ms})")]
    WindowExceedsDelay { window_ms: u64, eval_delay_ms: u64 },

    /// The buzzer must stop before the lights.
    #[error("buzzer_ms ({buzzer_ms}) must be shorter than light_ms ({light_ms})")]
    BuzzerOutlastsLights { buzzer_ms: u64, light_ms: u64 },

    /// A duration that has to be positive was zero.
    #[error("'{field}' must be greater than zero")]
    Zero { field: &'static str },
}

/// Errors raised by the shared indicator/buzzer device.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputError {
    /// The device mutex could not be acquired within the bounded wait.
    #[error("indicator lock not acquired within {waited_ms} ms")]
    LockTimeout { waited_ms: u64 },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
