//! Length-prefixed frames
//!
//! Wire format:
//! ```text
//! ┌────────────┬──────────────────┐
//! │ Length (2B)│ Payload (N B)    │
//! │ BE u16     │                  │
//! └────────────┴──────────────────┘
//! ```
//!
//! One message per frame. A truncated frame at end of stream is dropped.

use crate::codec::readers::{FixedLength, Reader, U16Be};
use crate::codec::{DecodingPhase, PhaseSequence, ProtocolSink, Transition};
use crate::constants::DEFAULT_MAX_FRAME_SIZE;
use crate::error::{CodecError, Result};
use bytes::{Bytes, BytesMut};
use std::convert::Infallible;
use tracing::debug;

/// Phases of one frame
#[derive(Debug)]
pub enum FramePhase {
    /// Reading the 2-byte length
    Length { size: U16Be, max: usize },
    /// Reading the payload
    Payload(FixedLength),
}

impl DecodingPhase for FramePhase {
    type Product = Bytes;

    fn decode<S>(&mut self, buf: &mut BytesMut, out: &mut S) -> Result<Transition<Self>>
    where
        S: ProtocolSink<Bytes> + ?Sized,
    {
        match self {
            FramePhase::Length { size, max } => {
                let Some(len) = size.read(buf)? else {
                    return Ok(Transition::Stay);
                };
                let len = len as usize;
                if len > *max {
                    return Err(CodecError::FrameTooLarge { size: len, max: *max });
                }
                if len == 0 {
                    out.write(Bytes::new());
                    return Ok(Transition::Done);
                }
                Ok(Transition::Next(FramePhase::Payload(FixedLength::new(len))))
            }
            FramePhase::Payload(payload) => match payload.read(buf)? {
                Some(bytes) => {
                    out.write(bytes);
                    Ok(Transition::Done)
                }
                None => Ok(Transition::Stay),
            },
        }
    }

    fn finish<S>(&mut self, _out: &mut S) -> Result<Transition<Self>>
    where
        S: ProtocolSink<Bytes> + ?Sized,
    {
        if let FramePhase::Payload(payload) = self {
            debug!(missing = payload.remaining(), "Dropping truncated frame");
        }
        Ok(Transition::Done)
    }
}

/// Length-prefixed framing, one message per frame
#[derive(Debug, Clone)]
pub struct LengthPrefixed {
    max_frame_size: usize,
}

impl LengthPrefixed {
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Prefix `payload` with its length
    pub fn encode(payload: &[u8], output: &mut Vec<u8>) -> Result<()> {
        let len = u16::try_from(payload.len()).map_err(|_| CodecError::FrameTooLarge {
            size: payload.len(),
            max: u16::MAX as usize,
        })?;
        output.extend_from_slice(&len.to_be_bytes());
        output.extend_from_slice(payload);
        Ok(())
    }
}

impl Default for LengthPrefixed {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl PhaseSequence for LengthPrefixed {
    type Phase = FramePhase;
    type Output = Bytes;
    type Next = Infallible;

    const NAME: &'static str = "length-prefixed";

    fn init(&mut self) -> Result<FramePhase> {
        Ok(FramePhase::Length {
            size: U16Be::new(),
            max: self.max_frame_size,
        })
    }

    fn aggregate<S>(&mut self, products: Vec<Bytes>, out: &mut S) -> Result<Transition<Infallible>>
    where
        S: ProtocolSink<Bytes> + ?Sized,
    {
        for payload in products {
            out.write(payload);
        }
        Ok(Transition::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CompositeDecoder, StreamDecoder};

    #[test]
    fn test_three_chunks_one_message() {
        let mut decoder = CompositeDecoder::new(LengthPrefixed::default());
        let mut out = Vec::new();
        let mut buf = BytesMut::new();

        for chunk in [&[0x00][..], &[0x03, b'a'][..], &[b'b', b'c'][..]] {
            buf.extend_from_slice(chunk);
            decoder.decode(&mut buf, &mut out).unwrap();
        }

        assert_eq!(out, vec![Bytes::from_static(b"abc")]);
        assert!(decoder.captured().is_empty());
    }

    #[test]
    fn test_zero_length_frame() {
        let mut stream = StreamDecoder::new(LengthPrefixed::default());
        let mut out = Vec::new();

        stream.feed(&[0, 0, 0, 1, b'x'], &mut out).unwrap();

        assert_eq!(out, vec![Bytes::new(), Bytes::from_static(b"x")]);
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut stream = StreamDecoder::new(LengthPrefixed::new(8));
        let mut out: Vec<Bytes> = Vec::new();

        let err = stream.feed(&[0x01, 0x00], &mut out).unwrap_err();

        assert!(matches!(err, CodecError::FrameTooLarge { size: 256, max: 8 }));
    }

    #[test]
    fn test_truncated_frame_dropped_on_finish() {
        let mut stream = StreamDecoder::new(LengthPrefixed::default());
        let mut out: Vec<Bytes> = Vec::new();

        stream.feed(&[0, 4, b'a', b'b'], &mut out).unwrap();
        stream.finish(&mut out).unwrap();

        assert!(out.is_empty());
    }

    #[test]
    fn test_encode() {
        let mut output = Vec::new();
        LengthPrefixed::encode(b"hey", &mut output).unwrap();
        assert_eq!(output, vec![0, 3, b'h', b'e', b'y']);
    }
}
