//! Command-line interface definition using clap
//!
//! Provides structured argument parsing with automatic help generation.

use crate::config::ProtocolKind;
use clap::Parser;
use std::path::PathBuf;

// =============================================================================
// CLI Definition
// =============================================================================

/// Decode a byte stream with a phase-based protocol decoder
#[derive(Parser, Debug, Default)]
#[command(name = "phase-dump")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose debug output
    #[arg(short, long)]
    pub verbose: bool,

    /// Input file (reads stdin when absent)
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Protocol used to decode the input (overrides config)
    #[arg(short, long, value_enum)]
    pub protocol: Option<ProtocolKind>,

    /// Bytes per read (overrides config)
    #[arg(long, value_name = "BYTES")]
    pub chunk_size: Option<usize>,

    /// TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Add the local receive time to each record
    #[arg(long)]
    pub timestamps: bool,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_defaults() {
        let cli = Cli::parse_from(["phase-dump"]);
        assert!(!cli.verbose);
        assert!(cli.input.is_none());
        assert!(cli.protocol.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_parse_verbose() {
        let cli = Cli::parse_from(["phase-dump", "-v"]);
        assert!(cli.verbose);

        let cli = Cli::parse_from(["phase-dump", "--verbose"]);
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_parse_protocol() {
        let cli = Cli::parse_from(["phase-dump", "--protocol", "length-prefixed"]);
        assert_eq!(cli.protocol, Some(ProtocolKind::LengthPrefixed));

        let cli = Cli::parse_from(["phase-dump", "-p", "envelope"]);
        assert_eq!(cli.protocol, Some(ProtocolKind::Envelope));
    }

    #[test]
    fn test_cli_rejects_unknown_protocol() {
        assert!(Cli::try_parse_from(["phase-dump", "--protocol", "morse"]).is_err());
    }

    #[test]
    fn test_cli_parse_input() {
        let cli = Cli::parse_from(["phase-dump", "--input", "capture.bin", "--chunk-size", "16"]);
        assert_eq!(cli.input, Some(PathBuf::from("capture.bin")));
        assert_eq!(cli.chunk_size, Some(16));
    }
}
