//! COBS (Consistent Overhead Byte Stuffing) framed protocol
//!
//! Frames are COBS-encoded so 0x00 never appears inside them, and each frame
//! is terminated by a 0x00 delimiter. One message per frame; frames carrying
//! no payload (back-to-back delimiters or an encoded empty payload `01 00`)
//! are skipped.

use crate::codec::readers::{ConsumeToTerminator, Reader};
use crate::codec::{DecodingPhase, PhaseSequence, ProtocolSink, Transition};
use crate::constants::{COBS_DELIMITER, DEFAULT_MAX_FRAME_SIZE};
use crate::error::{CodecError, Result};
use bytes::{Bytes, BytesMut};
use std::convert::Infallible;
use tracing::debug;

/// Encode `data` into `output` followed by the delimiter
///
/// Clears `output` first. Returns the number of bytes written.
pub fn encode_into(data: &[u8], max_frame_size: usize, output: &mut Vec<u8>) -> Result<usize> {
    if data.len() > max_frame_size {
        return Err(CodecError::FrameTooLarge {
            size: data.len(),
            max: max_frame_size,
        });
    }

    output.clear();
    output.reserve(data.len() + (data.len() / 254) + 2);

    let mut code_index = 0;
    output.push(0);
    let mut code: u8 = 1;

    for &byte in data {
        if byte == 0 {
            output[code_index] = code;
            code_index = output.len();
            output.push(0);
            code = 1;
        } else {
            output.push(byte);
            code += 1;
            if code == 255 {
                output[code_index] = code;
                code_index = output.len();
                output.push(0);
                code = 1;
            }
        }
    }

    output[code_index] = code;
    output.push(COBS_DELIMITER);
    Ok(output.len())
}

/// Decode one COBS frame (without its delimiter), appending to `output`
///
/// Returns the number of bytes appended.
pub fn decode_into(encoded: &[u8], output: &mut BytesMut) -> Result<usize> {
    let start_len = output.len();
    let mut i = 0;

    while i < encoded.len() {
        let code = encoded[i] as usize;
        if code == 0 {
            return Err(CodecError::InvalidEncoding);
        }

        i += 1;
        let copy_len = code - 1;

        if i + copy_len > encoded.len() {
            return Err(CodecError::InvalidEncoding);
        }

        output.extend_from_slice(&encoded[i..i + copy_len]);
        i += copy_len;

        if code < 255 && i < encoded.len() {
            output.extend_from_slice(&[0]);
        }
    }

    Ok(output.len() - start_len)
}

/// Single phase: collect up to the delimiter, then unstuff
#[derive(Debug)]
pub struct CobsFrame {
    frame: ConsumeToTerminator,
}

impl DecodingPhase for CobsFrame {
    type Product = Bytes;

    fn decode<S>(&mut self, buf: &mut BytesMut, out: &mut S) -> Result<Transition<Self>>
    where
        S: ProtocolSink<Bytes> + ?Sized,
    {
        let Some(encoded) = self.frame.read(buf)? else {
            return Ok(Transition::Stay);
        };

        let mut decoded = BytesMut::with_capacity(encoded.len());
        if decode_into(&encoded, &mut decoded)? == 0 {
            // Lone delimiter or empty payload, wait for the next frame
            return Ok(Transition::Stay);
        }
        out.write(decoded.freeze());
        Ok(Transition::Done)
    }

    fn finish<S>(&mut self, _out: &mut S) -> Result<Transition<Self>>
    where
        S: ProtocolSink<Bytes> + ?Sized,
    {
        if let Some(partial) = self.frame.finish()? {
            debug!(bytes = partial.len(), "Dropping unterminated COBS frame");
        }
        Ok(Transition::Done)
    }
}

/// COBS framing, one message per frame
#[derive(Debug, Clone)]
pub struct Cobs {
    max_frame_size: usize,
}

impl Cobs {
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Default for Cobs {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl PhaseSequence for Cobs {
    type Phase = CobsFrame;
    type Output = Bytes;
    type Next = Infallible;

    const NAME: &'static str = "cobs";

    fn init(&mut self) -> Result<CobsFrame> {
        // Encoded frames carry at most one overhead byte per 254 data bytes
        let max_encoded = self.max_frame_size + self.max_frame_size / 254 + 1;
        Ok(CobsFrame {
            frame: ConsumeToTerminator::new(COBS_DELIMITER, max_encoded),
        })
    }

    fn aggregate<S>(&mut self, products: Vec<Bytes>, out: &mut S) -> Result<Transition<Infallible>>
    where
        S: ProtocolSink<Bytes> + ?Sized,
    {
        for frame in products {
            out.write(frame);
        }
        Ok(Transition::Done)
    }
}
