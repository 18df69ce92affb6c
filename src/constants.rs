//! Application-wide constants
//!
//! Centralized constants to avoid duplication and ensure consistency.

// =============================================================================
// Limits
// =============================================================================

/// Default upper bound for a single length-prefixed or COBS frame (bytes)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 4096;

/// Default upper bound for a single text line (bytes, terminator excluded)
pub const DEFAULT_MAX_LINE_LENGTH: usize = 8192;

/// Default upper bound for the body of an envelope message (bytes)
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

// =============================================================================
// Buffers
// =============================================================================

/// Bytes requested from the input source per read
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Initial capacity of a stream's accumulation buffer
pub const INITIAL_BUFFER_CAPACITY: usize = 1024;

// =============================================================================
// Framing
// =============================================================================

/// COBS frame delimiter
pub const COBS_DELIMITER: u8 = 0x00;

/// Header carrying the envelope body length
pub const CONTENT_LENGTH_HEADER: &str = "content-length";
