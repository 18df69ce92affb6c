//! Centralized error types for the codec
//!
//! All decoding, configuration and input errors are represented by the
//! `CodecError` enum.
//! Use `Result<T>` as shorthand for `std::result::Result<T, CodecError>`.

use std::fmt;
use std::path::PathBuf;

/// All codec errors
#[derive(Debug)]
pub enum CodecError {
    // === Decoding ===
    /// A phase found bytes that violate its protocol
    InvalidData { phase: &'static str, reason: String },
    /// A declared frame length exceeds the configured limit
    FrameTooLarge { size: usize, max: usize },
    /// A delimited record grew past the configured limit without a terminator
    LineTooLong { max: usize },
    /// A COBS frame could not be decoded
    InvalidEncoding,

    // === Hooks ===
    /// A protocol init/aggregate/destroy hook failed
    Hook { hook: &'static str, reason: String },

    // === Input ===
    /// Reading from the input source failed
    Input {
        source_name: String,
        source: std::io::Error,
    },
    /// Writing decoded records failed
    Output { source: std::io::Error },

    // === Config ===
    /// Failed to read a config file
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Invalid config value
    ConfigValidation { field: &'static str, reason: String },

    // === Runtime ===
    /// Tokio runtime creation failed
    Runtime { source: std::io::Error },
}

impl CodecError {
    /// Shorthand for a protocol violation raised by `phase`
    pub fn invalid(phase: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidData {
            phase,
            reason: reason.into(),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Input { source, .. }
            | Self::Output { source }
            | Self::ConfigRead { source, .. }
            | Self::Runtime { source } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidData { phase, reason } => {
                write!(f, "Invalid data in {}: {}", phase, reason)
            }
            Self::FrameTooLarge { size, max } => {
                write!(f, "Frame too large: {} bytes (max {})", size, max)
            }
            Self::LineTooLong { max } => write!(f, "Line exceeds {} bytes", max),
            Self::InvalidEncoding => write!(f, "Invalid COBS encoding"),
            Self::Hook { hook, reason } => write!(f, "{} hook failed: {}", hook, reason),
            Self::Input { source_name, source } => {
                write!(f, "Cannot read {}: {}", source_name, source)
            }
            Self::Output { source } => write!(f, "Cannot write output: {}", source),
            Self::ConfigRead { path, .. } => write!(f, "Cannot read config: {}", path.display()),
            Self::ConfigValidation { field, reason } => {
                write!(f, "Invalid {}: {}", field, reason)
            }
            Self::Runtime { .. } => write!(f, "Failed to create runtime"),
        }
    }
}

/// Alias for Result with CodecError
pub type Result<T> = std::result::Result<T, CodecError>;
