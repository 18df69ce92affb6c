//! Decoding phase contract
//!
//! A phase is one step of a protocol's parsing automaton. Protocols model
//! their phases as an enum (one variant per step, carrying the step's
//! counters) and implement [`DecodingPhase`] on it.

use super::sink::ProtocolSink;
use crate::error::Result;
use bytes::BytesMut;

/// Outcome of driving a phase (or a whole composite decoder) once
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition<P> {
    /// Keep the current phase.
    ///
    /// Returned together with zero consumed bytes this means the phase is
    /// starved and needs more input.
    Stay,
    /// Continue with another phase
    Next(P),
    /// The phase sequence is complete
    Done,
}

impl<P> Transition<P> {
    /// True when the sequence reached its end
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// One unit of protocol-specific parsing logic
pub trait DecodingPhase: Sized {
    /// What this phase writes to its output
    type Product;

    /// Consume bytes from the front of `buf`
    ///
    /// May write any number of products to `out`. Consumed bytes must be
    /// removed from `buf` (`advance`, `split_to`, ...); bytes left in place
    /// are offered again on the next call.
    fn decode<S>(&mut self, buf: &mut BytesMut, out: &mut S) -> Result<Transition<Self>>
    where
        S: ProtocolSink<Self::Product> + ?Sized;

    /// The stream is closing before the sequence completed
    ///
    /// No more input will arrive. A phase may emit a partial product here.
    /// The default gives up on the sequence.
    fn finish<S>(&mut self, _out: &mut S) -> Result<Transition<Self>>
    where
        S: ProtocolSink<Self::Product> + ?Sized,
    {
        Ok(Transition::Done)
    }
}
