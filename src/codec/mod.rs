//! Incremental decoding automata
//!
//! Separates the decoding machinery from protocols:
//! - **Phase**: one parsing step of a protocol ([`DecodingPhase`])
//! - **Sequence**: a protocol's hooks around its phases ([`PhaseSequence`])
//! - **Composite**: the driver running a sequence over incoming bytes ([`CompositeDecoder`])
//! - **Stream**: the top-level adapter owning a stream's buffer ([`StreamDecoder`])
//!
//! # Adding a new protocol
//!
//! 1. Create `protocols/my_protocol.rs`
//! 2. Define a phase enum and implement `DecodingPhase` (the `readers`
//!    module covers the usual chores)
//! 3. Implement `PhaseSequence` to build the final message
//! 4. Add `pub mod my_protocol;` to `protocols/mod.rs`

pub mod composite;
pub mod phase;
pub mod readers;
pub mod sink;
pub mod stream;

pub use composite::{CompositeDecoder, PhaseSequence, ProductOf};
pub use phase::{DecodingPhase, Transition};
pub use readers::Reader;
pub use sink::{ChildOutput, FnSink, ProtocolSink};
pub use stream::{DecodeStats, StreamDecoder};
