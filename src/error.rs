//! # Error Types
//!
//! Custom error types for Jogpad using `thiserror`.

use thiserror::Error;

/// Main error type for Jogpad
#[derive(Debug, Error)]
pub enum JogpadError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors (open, write, flush)
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No printer serial port found (tried: {0})")]
    SerialPortNotFound(String),

    /// A controller report did not contain the requested axis or button
    #[error("Short controller report: {kind} {index} requested, report has {len}")]
    ShortReport {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    /// A controller report contained an unusable value
    #[error("Malformed controller report: {0}")]
    MalformedReport(String),

    /// Backend wire format errors
    #[error("Protocol error: {0}")]
    Protocol(#[from] serde_json::Error),

    /// Backend transport errors
    #[error("Transport error: {0}")]
    Transport(String),

    /// Settings storage errors
    #[error("Settings error: {0}")]
    Settings(String),

    /// Preference storage errors
    #[error("Preference error: {0}")]
    Preferences(String),
}

/// Result type alias for Jogpad
pub type Result<T> = std::result::Result<T, JogpadError>;
