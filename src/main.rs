//! phase-dump - decode a byte stream and print one JSON record per message
//!
//! Usage:
//!   phase-dump --protocol lines < capture.txt
//!   phase-dump -p cobs --input capture.bin --timestamps
//!   phase-dump --config dump.toml -v

use clap::Parser;
use phase_codec::cli::Cli;
use phase_codec::config::{self, DumpConfig};
use phase_codec::error::{CodecError, Result};
use phase_codec::logging::init_tracing;
use phase_codec::runner;
use tokio::io::AsyncRead;
use tracing::{debug, info};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => config::load(path),
        None => DumpConfig::default(),
    };
    config.apply_cli(&cli);
    config.validate()?;

    let rt = tokio::runtime::Runtime::new().map_err(|e| CodecError::Runtime { source: e })?;
    rt.block_on(run(cli, config))
}

async fn run(cli: Cli, config: DumpConfig) -> Result<()> {
    let (mut input, source_name): (Box<dyn AsyncRead + Unpin + Send>, String) = match &cli.input
    {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|e| CodecError::Input {
                    source_name: path.display().to_string(),
                    source: e,
                })?;
            (Box::new(file), path.display().to_string())
        }
        None => (Box::new(tokio::io::stdin()), "<stdin>".to_string()),
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            debug!("Ctrl-C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let stdout = std::io::stdout();
    let mut writer = stdout.lock();
    let stats = runner::run(&mut input, &source_name, &config, &mut writer, shutdown).await?;

    info!(
        received = stats.bytes_received,
        consumed = stats.bytes_consumed,
        cycles = stats.cycles_completed,
        suspensions = stats.suspensions,
        "Done"
    );
    Ok(())
}
