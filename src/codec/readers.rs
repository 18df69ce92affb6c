//! Reusable readers for building protocol phases
//!
//! A reader handles one recurring parsing chore (a fixed number of bytes, a
//! big-endian integer, bytes up to a terminator, ...). Protocol phase enums
//! carry readers in their variants and turn a completed read into a
//! [`Transition`](super::Transition).
//!
//! Readers always consume what they inspect, buffering partial input
//! internally, so a phase built on them never starves with bytes left in the
//! buffer.

use crate::error::{CodecError, Result};
use bytes::{Buf, Bytes, BytesMut};

/// Incremental reader over a byte buffer
pub trait Reader {
    type Output;

    /// Consume bytes from `buf`
    ///
    /// Returns `Some` once the value is complete, `None` when more input is
    /// needed. Either way every inspected byte has been consumed.
    fn read(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Output>>;

    /// Stream closed before completion: return whatever partial value exists
    ///
    /// `None` when nothing was received; a reader never hands out an empty
    /// partial value.
    fn finish(&mut self) -> Result<Option<Self::Output>> {
        Ok(None)
    }
}

// =============================================================================
// Fixed length
// =============================================================================

/// Reads exactly `len` bytes
///
/// Hands out a zero-copy slice of the input when the whole run is already
/// buffered.
#[derive(Debug)]
pub struct FixedLength {
    remaining: usize,
    collected: BytesMut,
}

impl FixedLength {
    pub fn new(len: usize) -> Self {
        Self {
            remaining: len,
            collected: BytesMut::new(),
        }
    }

    /// Bytes still missing
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl Reader for FixedLength {
    type Output = Bytes;

    fn read(&mut self, buf: &mut BytesMut) -> Result<Option<Bytes>> {
        if self.collected.is_empty() && buf.len() >= self.remaining {
            let bytes = buf.split_to(self.remaining).freeze();
            self.remaining = 0;
            return Ok(Some(bytes));
        }

        let take = self.remaining.min(buf.len());
        self.collected.extend_from_slice(&buf[..take]);
        buf.advance(take);
        self.remaining -= take;

        if self.remaining == 0 {
            Ok(Some(self.collected.split().freeze()))
        } else {
            Ok(None)
        }
    }

    /// Yields the bytes received so far
    fn finish(&mut self) -> Result<Option<Bytes>> {
        if self.collected.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.collected.split().freeze()))
        }
    }
}

// =============================================================================
// Integers
// =============================================================================

/// Collects `N` bytes that may arrive split across reads
#[derive(Debug, Clone, PartialEq, Eq)]
struct Octets<const N: usize> {
    bytes: [u8; N],
    filled: usize,
}

impl<const N: usize> Octets<N> {
    fn new() -> Self {
        Self {
            bytes: [0; N],
            filled: 0,
        }
    }

    fn fill(&mut self, buf: &mut BytesMut) -> Option<[u8; N]> {
        let take = (N - self.filled).min(buf.len());
        self.bytes[self.filled..self.filled + take].copy_from_slice(&buf[..take]);
        buf.advance(take);
        self.filled += take;

        if self.filled == N {
            self.filled = 0;
            Some(self.bytes)
        } else {
            None
        }
    }
}

/// Reads a single byte
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct U8(Octets<1>);

/// Reads a big-endian `u16`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct U16Be(Octets<2>);

/// Reads a big-endian `u32`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct U32Be(Octets<4>);

impl U8 {
    pub fn new() -> Self {
        Self(Octets::new())
    }
}

impl U16Be {
    pub fn new() -> Self {
        Self(Octets::new())
    }
}

impl U32Be {
    pub fn new() -> Self {
        Self(Octets::new())
    }
}

impl Default for U8 {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for U16Be {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for U32Be {
    fn default() -> Self {
        Self::new()
    }
}

impl Reader for U8 {
    type Output = u8;

    fn read(&mut self, buf: &mut BytesMut) -> Result<Option<u8>> {
        Ok(self.0.fill(buf).map(|[b]| b))
    }
}

impl Reader for U16Be {
    type Output = u16;

    fn read(&mut self, buf: &mut BytesMut) -> Result<Option<u16>> {
        Ok(self.0.fill(buf).map(u16::from_be_bytes))
    }
}

impl Reader for U32Be {
    type Output = u32;

    fn read(&mut self, buf: &mut BytesMut) -> Result<Option<u32>> {
        Ok(self.0.fill(buf).map(u32::from_be_bytes))
    }
}

// =============================================================================
// Delimited
// =============================================================================

/// Reads bytes up to a terminator
///
/// The terminator is consumed but not included in the output. Fails with
/// `LineTooLong` once more than `max` bytes pile up without a terminator.
#[derive(Debug)]
pub struct ConsumeToTerminator {
    terminator: u8,
    max: usize,
    collected: BytesMut,
}

impl ConsumeToTerminator {
    pub fn new(terminator: u8, max: usize) -> Self {
        Self {
            terminator,
            max,
            collected: BytesMut::new(),
        }
    }

    /// Bytes buffered while waiting for the terminator
    pub fn pending(&self) -> usize {
        self.collected.len()
    }
}

impl Reader for ConsumeToTerminator {
    type Output = Bytes;

    fn read(&mut self, buf: &mut BytesMut) -> Result<Option<Bytes>> {
        let Some(pos) = buf.iter().position(|&b| b == self.terminator) else {
            if self.collected.len() + buf.len() > self.max {
                return Err(CodecError::LineTooLong { max: self.max });
            }
            self.collected.extend_from_slice(&buf[..]);
            buf.clear();
            return Ok(None);
        };

        if self.collected.len() + pos > self.max {
            return Err(CodecError::LineTooLong { max: self.max });
        }

        let record = if self.collected.is_empty() {
            buf.split_to(pos).freeze()
        } else {
            self.collected.extend_from_slice(&buf[..pos]);
            buf.advance(pos);
            self.collected.split().freeze()
        };
        buf.advance(1);
        Ok(Some(record))
    }

    /// Yields the unterminated remainder, if any
    fn finish(&mut self) -> Result<Option<Bytes>> {
        if self.collected.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.collected.split().freeze()))
        }
    }
}

/// Reads one UTF-8 text line terminated by LF (CRLF accepted)
#[derive(Debug)]
pub struct Line(ConsumeToTerminator);

impl Line {
    pub fn new(max: usize) -> Self {
        Self(ConsumeToTerminator::new(b'\n', max))
    }

    fn into_text(mut raw: Bytes) -> Result<String> {
        if raw.last() == Some(&b'\r') {
            raw.truncate(raw.len() - 1);
        }
        String::from_utf8(raw.to_vec()).map_err(|e| CodecError::invalid("line", e.to_string()))
    }
}

impl Reader for Line {
    type Output = String;

    fn read(&mut self, buf: &mut BytesMut) -> Result<Option<String>> {
        self.0.read(buf)?.map(Self::into_text).transpose()
    }

    fn finish(&mut self) -> Result<Option<String>> {
        self.0.finish()?.map(Self::into_text).transpose()
    }
}

// =============================================================================
// Until end of stream
// =============================================================================

/// Collects everything until the stream closes
///
/// `read` never completes; the collected bytes come out of `finish`.
#[derive(Debug)]
pub struct ConsumeToEnd {
    max: usize,
    collected: BytesMut,
}

impl ConsumeToEnd {
    pub fn new(max: usize) -> Self {
        Self {
            max,
            collected: BytesMut::new(),
        }
    }
}

impl Reader for ConsumeToEnd {
    type Output = Bytes;

    fn read(&mut self, buf: &mut BytesMut) -> Result<Option<Bytes>> {
        let size = self.collected.len() + buf.len();
        if size > self.max {
            return Err(CodecError::FrameTooLarge {
                size,
                max: self.max,
            });
        }
        self.collected.extend_from_slice(&buf[..]);
        buf.clear();
        Ok(None)
    }

    fn finish(&mut self) -> Result<Option<Bytes>> {
        if self.collected.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.collected.split().freeze()))
    }
}

// =============================================================================
// Skipping
// =============================================================================

/// Skips bytes while `predicate` holds
///
/// Completes with the number of skipped bytes at the first byte that does not
/// match, leaving that byte in the buffer.
pub struct SkipWhile<F> {
    predicate: F,
    skipped: usize,
}

impl<F: FnMut(u8) -> bool> SkipWhile<F> {
    pub fn new(predicate: F) -> Self {
        Self {
            predicate,
            skipped: 0,
        }
    }
}

impl<F: FnMut(u8) -> bool> Reader for SkipWhile<F> {
    type Output = usize;

    fn read(&mut self, buf: &mut BytesMut) -> Result<Option<usize>> {
        let run = buf.iter().take_while(|&&b| (self.predicate)(b)).count();
        buf.advance(run);
        self.skipped += run;

        if buf.is_empty() {
            return Ok(None);
        }
        Ok(Some(std::mem::take(&mut self.skipped)))
    }

    fn finish(&mut self) -> Result<Option<usize>> {
        Ok(Some(std::mem::take(&mut self.skipped)))
    }
}

fn is_linear_whitespace(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Skips spaces and horizontal tabs
pub fn linear_whitespace() -> SkipWhile<fn(u8) -> bool> {
    SkipWhile::new(is_linear_whitespace as fn(u8) -> bool)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(bytes: &[u8]) -> BytesMut {
        BytesMut::from(bytes)
    }

    #[test]
    fn test_fixed_length_whole() {
        let mut reader = FixedLength::new(3);
        let mut input = buf(b"abcd");

        assert_eq!(reader.read(&mut input).unwrap().unwrap().as_ref(), b"abc");
        assert_eq!(input.as_ref(), b"d");
    }

    #[test]
    fn test_fixed_length_split() {
        let mut reader = FixedLength::new(4);

        assert!(reader.read(&mut buf(b"ab")).unwrap().is_none());
        assert_eq!(reader.remaining(), 2);

        let mut rest = buf(b"cdef");
        assert_eq!(reader.read(&mut rest).unwrap().unwrap().as_ref(), b"abcd");
        assert_eq!(rest.as_ref(), b"ef");
    }

    #[test]
    fn test_fixed_length_finish_partial() {
        let mut reader = FixedLength::new(10);
        reader.read(&mut buf(b"xy")).unwrap();

        assert_eq!(reader.finish().unwrap().unwrap().as_ref(), b"xy");
    }

    #[test]
    fn test_fixed_length_finish_without_input() {
        let mut reader = FixedLength::new(10);
        reader.read(&mut buf(b"")).unwrap();

        assert_eq!(reader.finish().unwrap(), None);
    }

    #[test]
    fn test_u16_split_across_reads() {
        let mut reader = U16Be::new();

        assert_eq!(reader.read(&mut buf(&[0x01])).unwrap(), None);
        assert_eq!(reader.read(&mut buf(&[0x02])).unwrap(), Some(0x0102));
        // Reusable after completion
        assert_eq!(reader.read(&mut buf(&[0x00, 0x07])).unwrap(), Some(7));
    }

    #[test]
    fn test_u32_and_u8() {
        let mut input = buf(&[0xDE, 0xAD, 0xBE, 0xEF, 0x2A]);

        assert_eq!(U32Be::new().read(&mut input).unwrap(), Some(0xDEADBEEF));
        assert_eq!(U8::new().read(&mut input).unwrap(), Some(0x2A));
        assert!(input.is_empty());
        assert_eq!(U8::new().finish().unwrap(), None);
    }

    #[test]
    fn test_terminator_in_one_read() {
        let mut reader = ConsumeToTerminator::new(0x00, 16);
        let mut input = buf(&[1, 2, 0, 3]);

        assert_eq!(reader.read(&mut input).unwrap().unwrap().as_ref(), &[1, 2]);
        assert_eq!(input.as_ref(), &[3]);
    }

    #[test]
    fn test_terminator_across_reads() {
        let mut reader = ConsumeToTerminator::new(b';', 16);

        assert!(reader.read(&mut buf(b"ab")).unwrap().is_none());
        assert_eq!(reader.pending(), 2);
        assert_eq!(reader.read(&mut buf(b"c;")).unwrap().unwrap().as_ref(), b"abc");
        assert_eq!(reader.pending(), 0);
    }

    #[test]
    fn test_terminator_too_long() {
        let mut reader = ConsumeToTerminator::new(b';', 4);

        assert!(reader.read(&mut buf(b"abc")).unwrap().is_none());
        let err = reader.read(&mut buf(b"de")).unwrap_err();
        assert!(matches!(err, CodecError::LineTooLong { max: 4 }));
    }

    #[test]
    fn test_terminator_finish() {
        let mut reader = ConsumeToTerminator::new(b';', 16);
        assert_eq!(reader.finish().unwrap(), None);

        reader.read(&mut buf(b"tail")).unwrap();
        assert_eq!(reader.finish().unwrap().unwrap().as_ref(), b"tail");
    }

    #[test]
    fn test_line_strips_crlf() {
        let mut reader = Line::new(64);
        let mut input = buf(b"hello\r\nworld\n");

        assert_eq!(reader.read(&mut input).unwrap().as_deref(), Some("hello"));
        assert_eq!(reader.read(&mut input).unwrap().as_deref(), Some("world"));
    }

    #[test]
    fn test_line_invalid_utf8() {
        let mut reader = Line::new(64);
        let err = reader.read(&mut buf(&[0xFF, 0xFE, b'\n'])).unwrap_err();
        assert!(matches!(err, CodecError::InvalidData { phase: "line", .. }));
    }

    #[test]
    fn test_consume_to_end() {
        let mut reader = ConsumeToEnd::new(8);

        assert!(reader.read(&mut buf(b"abc")).unwrap().is_none());
        assert!(reader.read(&mut buf(b"de")).unwrap().is_none());
        assert_eq!(reader.finish().unwrap().unwrap().as_ref(), b"abcde");

        let err = reader.read(&mut buf(b"123456789")).unwrap_err();
        assert!(matches!(err, CodecError::FrameTooLarge { size: 9, max: 8 }));
    }

    #[test]
    fn test_skip_whitespace() {
        let mut reader = linear_whitespace();

        let mut input = buf(b"  ");
        assert_eq!(reader.read(&mut input).unwrap(), None);

        let mut input = buf(b"\t x");
        assert_eq!(reader.read(&mut input).unwrap(), Some(4));
        assert_eq!(input.as_ref(), b"x");
    }
}
