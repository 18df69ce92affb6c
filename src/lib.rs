//! Phase Codec - composable incremental decoding automata
//!
//! A protocol decoder is written as a [`PhaseSequence`](codec::PhaseSequence):
//! an ordered set of parsing phases whose products are aggregated once the
//! sequence completes. [`CompositeDecoder`](codec::CompositeDecoder) runs the
//! phases over a byte buffer fed in arbitrary chunks, suspending whenever
//! input runs out and resuming exactly where it stopped.

pub mod cli;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod protocols;
pub mod runner;

pub use error::{CodecError, Result};
