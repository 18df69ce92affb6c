//! Stream decoder
//!
//! Top of a decoding pipeline: owns the accumulation buffer of one byte
//! stream and keeps a [`CompositeDecoder`] busy until the buffered bytes run
//! out, starting a new activation cycle after every completed message.

use super::composite::{CompositeDecoder, PhaseSequence};
use super::phase::Transition;
use super::sink::ProtocolSink;
use crate::constants::INITIAL_BUFFER_CAPACITY;
use crate::error::Result;
use bytes::BytesMut;
use tracing::debug;

/// Counters for one stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Bytes handed to `feed`
    pub bytes_received: u64,
    /// Bytes accepted by the phases
    pub bytes_consumed: u64,
    /// Activation cycles that reached aggregation through `feed`
    pub cycles_completed: u64,
    /// Calls that ended waiting for more input
    pub suspensions: u64,
}

/// Feeds one byte stream through a composite decoder
pub struct StreamDecoder<Q: PhaseSequence> {
    decoder: CompositeDecoder<Q>,
    buffer: BytesMut,
    stats: DecodeStats,
}

impl<Q: PhaseSequence> StreamDecoder<Q> {
    pub fn new(sequence: Q) -> Self {
        Self {
            decoder: CompositeDecoder::new(sequence),
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            stats: DecodeStats::default(),
        }
    }

    /// Append `data` and decode every message it completes
    ///
    /// Stops when the buffer is empty or the phases cannot progress without
    /// more input; unconsumed bytes stay buffered for the next call. On error
    /// the bytes after the failure point stay buffered too, see [`clear`].
    ///
    /// [`clear`]: Self::clear
    pub fn feed<S>(&mut self, data: &[u8], out: &mut S) -> Result<()>
    where
        S: ProtocolSink<Q::Output> + ?Sized,
    {
        self.buffer.extend_from_slice(data);
        self.stats.bytes_received += data.len() as u64;

        while !self.buffer.is_empty() {
            let before = self.buffer.len();
            let resumed = self.decoder.is_active();
            let result = self.decoder.decode(&mut self.buffer, out);
            let consumed = before - self.buffer.len();
            self.stats.bytes_consumed += consumed as u64;

            if let Transition::Stay = result? {
                self.stats.suspensions += 1;
                break;
            }
            self.stats.cycles_completed += 1;

            // A fresh cycle that completes on no input would repeat forever
            if consumed == 0 && !resumed {
                break;
            }
        }

        Ok(())
    }

    /// The stream is closing: drain pending phases and flush the sink
    pub fn finish<S>(&mut self, out: &mut S) -> Result<()>
    where
        S: ProtocolSink<Q::Output> + ?Sized,
    {
        if !self.buffer.is_empty() {
            debug!(
                sequence = Q::NAME,
                bytes = self.buffer.len(),
                "Closing with unconsumed bytes"
            );
        }

        self.decoder.drain(out)?;
        self.buffer.clear();
        out.flush()
    }

    /// Drop buffered bytes (e.g. after a decode error)
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Bytes waiting for the phases
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    pub fn decoder(&self) -> &CompositeDecoder<Q> {
        &self.decoder
    }

    pub fn decoder_mut(&mut self) -> &mut CompositeDecoder<Q> {
        &mut self.decoder
    }
}
