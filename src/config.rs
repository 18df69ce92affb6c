//! Configuration management
//!
//! Optional TOML file passed with `--config`. Every section falls back to
//! defaults, and command-line flags override file values.

use crate::cli::Cli;
use crate::constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_FRAME_SIZE, DEFAULT_MAX_LINE_LENGTH,
};
use crate::error::{CodecError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

// =============================================================================
// Protocol selection
// =============================================================================

/// Protocol used to decode the input
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum ProtocolKind {
    /// 2-byte big-endian length, then payload
    #[default]
    LengthPrefixed,
    /// Newline-delimited UTF-8 text
    Lines,
    /// COBS frames terminated by 0x00
    Cobs,
    /// Header section followed by a Content-Length body
    Envelope,
}

impl ProtocolKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LengthPrefixed => "length-prefixed",
            Self::Lines => "lines",
            Self::Cobs => "cobs",
            Self::Envelope => "envelope",
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct DumpConfig {
    pub input: InputConfig,
    pub limits: LimitsConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InputConfig {
    /// Protocol used to decode the input
    pub protocol: ProtocolKind,
    /// Bytes requested per read
    pub chunk_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest length-prefixed or COBS frame
    pub max_frame_size: usize,
    /// Longest text or header line
    pub max_line_length: usize,
    /// Largest envelope body
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    /// Stamp each record with the local receive time
    pub timestamps: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            protocol: ProtocolKind::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl DumpConfig {
    /// Apply command-line overrides
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(protocol) = cli.protocol {
            self.input.protocol = protocol;
        }
        if let Some(chunk_size) = cli.chunk_size {
            self.input.chunk_size = chunk_size;
        }
        if cli.timestamps {
            self.output.timestamps = true;
        }
    }

    /// Reject values the decoders cannot work with
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("input.chunk_size", self.input.chunk_size),
            ("limits.max_frame_size", self.limits.max_frame_size),
            ("limits.max_line_length", self.limits.max_line_length),
            ("limits.max_body_size", self.limits.max_body_size),
        ];
        for (field, value) in checks {
            if value == 0 {
                return Err(CodecError::ConfigValidation {
                    field,
                    reason: "must be greater than 0".into(),
                });
            }
        }
        if self.limits.max_frame_size > u16::MAX as usize
            && self.input.protocol == ProtocolKind::LengthPrefixed
        {
            warn!(
                max_frame_size = self.limits.max_frame_size,
                "Length prefix is 16 bits, frames above 65535 bytes cannot occur"
            );
        }
        Ok(())
    }
}

/// Load config from `path`, reporting every problem
pub fn load_strict(path: &Path) -> Result<DumpConfig> {
    let content = fs::read_to_string(path).map_err(|e| CodecError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(|e| CodecError::ConfigValidation {
        field: "config",
        reason: format!("invalid {}: {}", path.display(), e),
    })
}

/// Load config from `path`, falling back to defaults
pub fn load(path: &Path) -> DumpConfig {
    match load_strict(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("{}, using defaults", e);
            DumpConfig::default()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
