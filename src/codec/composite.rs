//! Composite decoder
//!
//! Drives a nested sequence of [`DecodingPhase`]s and folds everything they
//! produce into one higher-level message. A composite decoder is reused for
//! every message of a stream: one *activation cycle* per message, from lazy
//! initialization to teardown.
//!
//! ```text
//! decode(buf) ──► phase.decode(buf, child) ──► Stay / Next(p) ──► loop
//!                                           └─► Done ──► aggregate(products, out)
//!                                                           └─► teardown
//! ```
//!
//! Its result is a [`Transition`] of the *enclosing* automaton, so a composite
//! decoder can sit inside a variant of an outer phase enum and act as one
//! phase of a larger sequence.

use super::phase::{DecodingPhase, Transition};
use super::sink::{ChildOutput, ProtocolSink};
use crate::error::Result;
use bytes::BytesMut;
use tracing::{debug, error, trace, warn};

/// Product type of a sequence's phases
pub type ProductOf<Q> = <<Q as PhaseSequence>::Phase as DecodingPhase>::Product;

/// Protocol-specific hooks of a composite decoder
pub trait PhaseSequence {
    /// Phase enum driven by the decoder
    type Phase: DecodingPhase;
    /// Consolidated message written to the real sink
    type Output;
    /// Phase of the enclosing automaton (`Infallible` at top level)
    type Next;

    /// Name used in log events
    const NAME: &'static str;

    /// Starting phase of a new activation cycle
    fn init(&mut self) -> Result<Self::Phase>;

    /// Build the final message(s) from the products of one cycle
    ///
    /// Called on natural completion and when the stream is drained. The
    /// returned transition tells the enclosing automaton where to go next;
    /// `Stay` keeps it on this decoder for another message.
    fn aggregate<S>(
        &mut self,
        products: Vec<ProductOf<Self>>,
        out: &mut S,
    ) -> Result<Transition<Self::Next>>
    where
        S: ProtocolSink<Self::Output> + ?Sized;

    /// Release whatever the cycle acquired
    fn destroy(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Outcome of driving phases over the available bytes
enum Drive {
    Suspended,
    Completed,
}

/// Reusable decoding unit built from a phase sequence
pub struct CompositeDecoder<Q: PhaseSequence> {
    sequence: Q,
    current: Option<Q::Phase>,
    initialized: bool,
    products: Vec<ProductOf<Q>>,
}

impl<Q: PhaseSequence> CompositeDecoder<Q> {
    pub fn new(sequence: Q) -> Self {
        Self {
            sequence,
            current: None,
            initialized: false,
            products: Vec::new(),
        }
    }

    /// Decode as much of `buf` as the phases accept
    ///
    /// Returns `Stay` while the message is incomplete; otherwise the
    /// aggregation result. Consumed bytes are removed from `buf`, the rest
    /// must be handed back on the next call.
    ///
    /// A phase failure ends the cycle: the decoder is torn down and the error
    /// returned unchanged. The next call starts a fresh cycle.
    pub fn decode<S>(&mut self, buf: &mut BytesMut, out: &mut S) -> Result<Transition<Q::Next>>
    where
        S: ProtocolSink<Q::Output> + ?Sized,
    {
        let mut phase = self.take_phase()?;

        match self.drive(&mut phase, buf) {
            Ok(Drive::Suspended) => {
                self.current = Some(phase);
                Ok(Transition::Stay)
            }
            Ok(Drive::Completed) => {
                drop(phase);
                let products = std::mem::take(&mut self.products);
                let next = self.sequence.aggregate(products, out);
                self.teardown();
                next
            }
            Err(e) => {
                debug!(sequence = Q::NAME, error = %e, "Decode failed, abandoning cycle");
                drop(phase);
                self.teardown();
                Err(e)
            }
        }
    }

    /// Flush the sequence because the stream is closing
    ///
    /// Phases get a last chance through `finish`. Their failures are logged
    /// and treated as completion, never returned. Aggregation always runs with
    /// whatever was captured; only aggregation errors are returned.
    pub fn drain<S>(&mut self, out: &mut S) -> Result<Transition<Q::Next>>
    where
        S: ProtocolSink<Q::Output> + ?Sized,
    {
        let mut phase = Some(self.take_phase()?);

        while let Some(current) = phase.as_mut() {
            let mut child = ChildOutput::new(&mut self.products);
            match current.finish(&mut child) {
                Ok(Transition::Stay) => break,
                Ok(Transition::Next(next)) => *current = next,
                Ok(Transition::Done) => phase = None,
                Err(e) => {
                    debug!(sequence = Q::NAME, error = %e, "Ignoring failure on closing stream");
                    phase = None;
                }
            }
        }

        let completed = phase.is_none();
        self.current = phase;

        let products = std::mem::take(&mut self.products);
        let next = self.sequence.aggregate(products, out);
        if completed {
            self.teardown();
        }
        next
    }

    /// Current phase, starting a new cycle if none is held
    pub fn current_phase(&mut self) -> Result<&mut Q::Phase> {
        let phase = self.take_phase()?;
        Ok(self.current.insert(phase))
    }

    /// True between activation and teardown
    pub fn is_active(&self) -> bool {
        self.initialized
    }

    /// Products captured so far in the running cycle
    pub fn captured(&self) -> &[ProductOf<Q>] {
        &self.products
    }

    pub fn sequence(&self) -> &Q {
        &self.sequence
    }

    pub fn sequence_mut(&mut self) -> &mut Q {
        &mut self.sequence
    }

    fn take_phase(&mut self) -> Result<Q::Phase> {
        if let Some(phase) = self.current.take() {
            return Ok(phase);
        }
        let phase = self.sequence.init()?;
        self.initialized = true;
        debug!(sequence = Q::NAME, "Activation cycle started");
        Ok(phase)
    }

    fn drive(&mut self, phase: &mut Q::Phase, buf: &mut BytesMut) -> Result<Drive> {
        let mut remaining = buf.len();

        loop {
            if remaining == 0 {
                return Ok(Drive::Suspended);
            }

            let mut child = ChildOutput::new(&mut self.products);
            match phase.decode(buf, &mut child)? {
                Transition::Done => return Ok(Drive::Completed),
                Transition::Stay if buf.len() == remaining => {
                    trace!(sequence = Q::NAME, remaining, "Starved, waiting for input");
                    return Ok(Drive::Suspended);
                }
                Transition::Stay => {}
                Transition::Next(next) => *phase = next,
            }

            remaining = buf.len();
        }
    }

    pub(crate) fn teardown(&mut self) {
        if !self.initialized {
            if cfg!(debug_assertions) {
                panic!("teardown of {} decoder that was never activated", Q::NAME);
            }
            error!(sequence = Q::NAME, "Teardown of a decoder that was never activated");
            return;
        }

        self.initialized = false;
        self.products.clear();

        if let Err(e) = self.sequence.destroy() {
            warn!(sequence = Q::NAME, error = %e, "Ignoring destroy hook failure");
        }
        debug!(sequence = Q::NAME, "Activation cycle finished");
    }
}

impl<Q: PhaseSequence + Default> Default for CompositeDecoder<Q> {
    fn default() -> Self {
        Self::new(Q::default())
    }
}

impl<Q: PhaseSequence> std::fmt::Debug for CompositeDecoder<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeDecoder")
            .field("sequence", &Q::NAME)
            .field("active", &self.initialized)
            .field("captured", &self.products.len())
            .finish()
    }
}
