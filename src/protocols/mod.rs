//! Bundled protocols
//!
//! Each protocol is a [`PhaseSequence`](crate::codec::PhaseSequence) plus its
//! phase enum:
//! - `length_prefixed`: 2-byte length, then payload
//! - `lines`: newline-delimited text
//! - `cobs`: 0x00-delimited COBS frames
//! - `envelope`: header section (nested decoder) followed by a body

pub mod cobs;
pub mod envelope;
pub mod length_prefixed;
pub mod lines;

pub use cobs::Cobs;
pub use envelope::{Envelope, EnvelopeSequence, Header};
pub use length_prefixed::LengthPrefixed;
pub use lines::Lines;
