//! Dump runner
//!
//! Reads an async byte source in chunks, feeds it through the selected
//! protocol and writes one JSON record per decoded message. EOF and the
//! shutdown future both end the loop through the drain path.

use crate::codec::{DecodeStats, PhaseSequence, StreamDecoder};
use crate::config::{DumpConfig, ProtocolKind};
use crate::error::{CodecError, Result};
use crate::protocols::{Cobs, Envelope, EnvelopeSequence, LengthPrefixed, Lines};
use bytes::Bytes;
use serde::Serialize;
use serde_json::{json, Value};
use std::future::Future;
use std::io::Write;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};

// =============================================================================
// Records
// =============================================================================

/// JSON rendering of a decoded message
pub trait Render {
    fn render(&self) -> Value;
}

impl Render for Bytes {
    fn render(&self) -> Value {
        json!({
            "len": self.len(),
            "text": String::from_utf8_lossy(self),
        })
    }
}

impl Render for String {
    fn render(&self) -> Value {
        json!({ "text": self })
    }
}

impl Render for Envelope {
    fn render(&self) -> Value {
        json!({
            "headers": self.headers,
            "len": self.body.len(),
            "body": String::from_utf8_lossy(&self.body),
        })
    }
}

/// One output line
#[derive(Debug, Serialize)]
struct Record {
    seq: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    received_at: Option<String>,
    message: Value,
}

/// Serializes decoded messages as JSON lines
struct RecordWriter<'a, W: Write> {
    writer: &'a mut W,
    timestamps: bool,
    seq: u64,
}

impl<'a, W: Write> RecordWriter<'a, W> {
    fn new(writer: &'a mut W, timestamps: bool) -> Self {
        Self {
            writer,
            timestamps,
            seq: 0,
        }
    }

    fn write_all<T: Render>(&mut self, messages: impl IntoIterator<Item = T>) -> Result<()> {
        for message in messages {
            let record = Record {
                seq: self.seq,
                received_at: self
                    .timestamps
                    .then(|| chrono::Local::now().to_rfc3339()),
                message: message.render(),
            };
            self.seq += 1;

            let line = serde_json::to_string(&record)
                .map_err(|e| CodecError::invalid("record", e.to_string()))?;
            writeln!(self.writer, "{}", line).map_err(|e| CodecError::Output { source: e })?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| CodecError::Output { source: e })
    }
}

// =============================================================================
// Runner
// =============================================================================

/// Decode `input` with the configured protocol until EOF or `shutdown`
pub async fn run<R, W, F>(
    input: &mut R,
    source_name: &str,
    config: &DumpConfig,
    writer: &mut W,
    shutdown: F,
) -> Result<DecodeStats>
where
    R: AsyncRead + Unpin,
    W: Write,
    F: Future<Output = ()>,
{
    let limits = &config.limits;
    info!(
        source = source_name,
        protocol = config.input.protocol.name(),
        "Decoding"
    );

    match config.input.protocol {
        ProtocolKind::LengthPrefixed => {
            let sequence = LengthPrefixed::new(limits.max_frame_size);
            pump(sequence, input, source_name, config, writer, shutdown).await
        }
        ProtocolKind::Lines => {
            let sequence = Lines::new(limits.max_line_length);
            pump(sequence, input, source_name, config, writer, shutdown).await
        }
        ProtocolKind::Cobs => {
            let sequence = Cobs::new(limits.max_frame_size);
            pump(sequence, input, source_name, config, writer, shutdown).await
        }
        ProtocolKind::Envelope => {
            let sequence = EnvelopeSequence::new(limits.max_line_length, limits.max_body_size);
            pump(sequence, input, source_name, config, writer, shutdown).await
        }
    }
}

async fn pump<Q, R, W, F>(
    sequence: Q,
    input: &mut R,
    source_name: &str,
    config: &DumpConfig,
    writer: &mut W,
    shutdown: F,
) -> Result<DecodeStats>
where
    Q: PhaseSequence,
    Q::Output: Render,
    R: AsyncRead + Unpin,
    W: Write,
    F: Future<Output = ()>,
{
    let mut stream = StreamDecoder::new(sequence);
    let mut records = RecordWriter::new(writer, config.output.timestamps);
    let mut chunk = vec![0u8; config.input.chunk_size];
    let mut decoded: Vec<Q::Output> = Vec::new();

    tokio::pin!(shutdown);

    loop {
        let n = tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested, draining");
                break;
            }
            read = input.read(&mut chunk) => read.map_err(|e| CodecError::Input {
                source_name: source_name.to_string(),
                source: e,
            })?,
        };

        if n == 0 {
            debug!(source = source_name, "End of input");
            break;
        }

        let result = stream.feed(&chunk[..n], &mut decoded);
        // Messages completed before a failure are still reported
        records.write_all(decoded.drain(..))?;

        if let Err(e) = result {
            warn!(
                sequence = Q::NAME,
                buffered = stream.buffered(),
                "Decode failed: {}",
                e
            );
            return Err(e);
        }
    }

    stream.finish(&mut decoded)?;
    records.write_all(decoded.drain(..))?;
    records.flush()?;

    let stats = stream.stats();
    debug!(
        received = stats.bytes_received,
        consumed = stats.bytes_consumed,
        cycles = stats.cycles_completed,
        records = records.seq,
        "Stream closed"
    );
    Ok(stats)
}

// =============================================================================
// Tests
// =============================================================================
