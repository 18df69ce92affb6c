//! Header/body envelopes (nested automaton)
//!
//! Wire format:
//! ```text
//! Name: value\r\n        ─┐
//! Content-Length: 5\r\n    ├─ header section (its own composite decoder)
//! \r\n                   ─┘
//! hello                  ── body, Content-Length bytes (0 when absent)
//! ```
//!
//! The header section is a [`CompositeDecoder`] running inside
//! [`EnvelopePhase::Headers`]. When its blank line arrives, its aggregation
//! emits the parsed headers and moves the outer automaton on to the body.
//! Incomplete envelopes are dropped when the stream closes.

use crate::codec::readers::{FixedLength, Line, Reader};
use crate::codec::{CompositeDecoder, DecodingPhase, PhaseSequence, ProtocolSink, Transition};
use crate::constants::{CONTENT_LENGTH_HEADER, DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_LINE_LENGTH};
use crate::error::{CodecError, Result};
use bytes::{Bytes, BytesMut};
use serde::Serialize;
use std::convert::Infallible;
use tracing::debug;

/// One `Name: value` header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// A complete envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub headers: Vec<Header>,
    pub body: Bytes,
}

impl Envelope {
    /// First header named `name` (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

// =============================================================================
// Header section (inner automaton)
// =============================================================================

/// Product of the header line phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderItem {
    Field(Header),
    /// The blank line closing the section
    End,
}

/// Reads header lines until the blank line
#[derive(Debug)]
pub struct HeaderLine(Line);

impl HeaderLine {
    fn parse(line: &str) -> Result<Header> {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| CodecError::invalid("header", format!("missing ':' in {:?}", line)))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(CodecError::invalid("header", "empty header name"));
        }
        Ok(Header {
            name: name.to_string(),
            value: value.trim().to_string(),
        })
    }
}

impl DecodingPhase for HeaderLine {
    type Product = HeaderItem;

    fn decode<S>(&mut self, buf: &mut BytesMut, out: &mut S) -> Result<Transition<Self>>
    where
        S: ProtocolSink<HeaderItem> + ?Sized,
    {
        match self.0.read(buf)? {
            None => Ok(Transition::Stay),
            Some(line) if line.is_empty() => {
                out.write(HeaderItem::End);
                Ok(Transition::Done)
            }
            Some(line) => {
                out.write(HeaderItem::Field(Self::parse(&line)?));
                Ok(Transition::Stay)
            }
        }
    }
}

/// Hooks of the header section; hands control back to the envelope
#[derive(Debug, Clone)]
pub struct HeaderSection {
    max_line_length: usize,
    max_body_size: usize,
}

impl HeaderSection {
    pub fn new(max_line_length: usize, max_body_size: usize) -> Self {
        Self {
            max_line_length,
            max_body_size,
        }
    }

    fn content_length(&self, headers: &[Header]) -> Result<usize> {
        let Some(header) = headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(CONTENT_LENGTH_HEADER))
        else {
            return Ok(0);
        };

        let len: usize = header.value.parse().map_err(|_| {
            CodecError::invalid("header", format!("bad content length {:?}", header.value))
        })?;
        if len > self.max_body_size {
            return Err(CodecError::FrameTooLarge {
                size: len,
                max: self.max_body_size,
            });
        }
        Ok(len)
    }
}

impl PhaseSequence for HeaderSection {
    type Phase = HeaderLine;
    type Output = Part;
    type Next = EnvelopePhase;

    const NAME: &'static str = "envelope-headers";

    fn init(&mut self) -> Result<HeaderLine> {
        Ok(HeaderLine(Line::new(self.max_line_length)))
    }

    fn aggregate<S>(
        &mut self,
        mut products: Vec<HeaderItem>,
        out: &mut S,
    ) -> Result<Transition<EnvelopePhase>>
    where
        S: ProtocolSink<Part> + ?Sized,
    {
        if products.last() != Some(&HeaderItem::End) {
            if !products.is_empty() {
                debug!(headers = products.len(), "Dropping unterminated header section");
            }
            return Ok(Transition::Done);
        }
        products.pop();

        let headers: Vec<Header> = products
            .into_iter()
            .filter_map(|item| match item {
                HeaderItem::Field(header) => Some(header),
                HeaderItem::End => None,
            })
            .collect();
        let content_length = self.content_length(&headers)?;

        out.write(Part::Headers {
            headers,
            content_length,
        });

        if content_length == 0 {
            Ok(Transition::Done)
        } else {
            Ok(Transition::Next(EnvelopePhase::Body(FixedLength::new(content_length))))
        }
    }
}

// =============================================================================
// Envelope (outer automaton)
// =============================================================================

/// Product of the envelope phases
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Headers {
        headers: Vec<Header>,
        content_length: usize,
    },
    Body(Bytes),
}

/// Phases of one envelope
#[derive(Debug)]
pub enum EnvelopePhase {
    Headers(CompositeDecoder<HeaderSection>),
    Body(FixedLength),
}

impl DecodingPhase for EnvelopePhase {
    type Product = Part;

    fn decode<S>(&mut self, buf: &mut BytesMut, out: &mut S) -> Result<Transition<Self>>
    where
        S: ProtocolSink<Part> + ?Sized,
    {
        match self {
            EnvelopePhase::Headers(section) => section.decode(buf, out),
            EnvelopePhase::Body(body) => match body.read(buf)? {
                Some(bytes) => {
                    out.write(Part::Body(bytes));
                    Ok(Transition::Done)
                }
                None => Ok(Transition::Stay),
            },
        }
    }

    fn finish<S>(&mut self, out: &mut S) -> Result<Transition<Self>>
    where
        S: ProtocolSink<Part> + ?Sized,
    {
        match self {
            EnvelopePhase::Headers(section) => section.drain(out),
            EnvelopePhase::Body(body) => {
                debug!(missing = body.remaining(), "Dropping truncated envelope body");
                Ok(Transition::Done)
            }
        }
    }
}

/// Envelope protocol: header section, then body
#[derive(Debug, Clone)]
pub struct EnvelopeSequence {
    max_line_length: usize,
    max_body_size: usize,
}

impl EnvelopeSequence {
    pub fn new(max_line_length: usize, max_body_size: usize) -> Self {
        Self {
            max_line_length,
            max_body_size,
        }
    }

    /// Serialize an envelope, adding `Content-Length` when the body is not empty
    pub fn encode(envelope: &Envelope, output: &mut Vec<u8>) {
        for header in &envelope.headers {
            if header.name.eq_ignore_ascii_case(CONTENT_LENGTH_HEADER) {
                continue;
            }
            output.extend_from_slice(format!("{}: {}\r\n", header.name, header.value).as_bytes());
        }
        if !envelope.body.is_empty() {
            output.extend_from_slice(format!("Content-Length: {}\r\n", envelope.body.len()).as_bytes());
        }
        output.extend_from_slice(b"\r\n");
        output.extend_from_slice(&envelope.body);
    }
}

impl Default for EnvelopeSequence {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LENGTH, DEFAULT_MAX_BODY_SIZE)
    }
}

impl PhaseSequence for EnvelopeSequence {
    type Phase = EnvelopePhase;
    type Output = Envelope;
    type Next = Infallible;

    const NAME: &'static str = "envelope";

    fn init(&mut self) -> Result<EnvelopePhase> {
        let section = HeaderSection::new(self.max_line_length, self.max_body_size);
        Ok(EnvelopePhase::Headers(CompositeDecoder::new(section)))
    }

    fn aggregate<S>(&mut self, products: Vec<Part>, out: &mut S) -> Result<Transition<Infallible>>
    where
        S: ProtocolSink<Envelope> + ?Sized,
    {
        let mut parts = products.into_iter();

        let Some(Part::Headers {
            headers,
            content_length,
        }) = parts.next()
        else {
            return Ok(Transition::Done);
        };

        let body = match parts.next() {
            Some(Part::Body(body)) => body,
            _ if content_length == 0 => Bytes::new(),
            _ => {
                debug!(content_length, "Dropping envelope without body");
                return Ok(Transition::Done);
            }
        };

        out.write(Envelope { headers, body });
        Ok(Transition::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::StreamDecoder;

    fn header(name: &str, value: &str) -> Header {
        Header {
            name: name.into(),
            value: value.into(),
        }
    }

    #[test]
    fn test_envelope_with_body() {
        let mut stream = StreamDecoder::new(EnvelopeSequence::default());
        let mut out = Vec::new();

        stream
            .feed(b"Kind: greeting\r\nContent-Length: 5\r\n\r\nhello", &mut out)
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].header("kind"), Some("greeting"));
        assert_eq!(out[0].body.as_ref(), b"hello");
    }

    #[test]
    fn test_envelope_without_body() {
        let mut stream = StreamDecoder::new(EnvelopeSequence::default());
        let mut out = Vec::new();

        stream.feed(b"A: 1\n\nB: 2\n\n", &mut out).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].headers, vec![header("A", "1")]);
        assert_eq!(out[1].headers, vec![header("B", "2")]);
        assert!(out[1].body.is_empty());
    }

    #[test]
    fn test_envelope_without_headers() {
        let mut stream = StreamDecoder::new(EnvelopeSequence::default());
        let mut out = Vec::new();

        stream.feed(b"\r\n", &mut out).unwrap();

        assert_eq!(
            out,
            vec![Envelope {
                headers: vec![],
                body: Bytes::new()
            }]
        );
    }

    #[test]
    fn test_envelope_byte_by_byte() {
        let mut stream = StreamDecoder::new(EnvelopeSequence::default());
        let mut out = Vec::new();

        for byte in b"X: y\r\nContent-Length: 3\r\n\r\nabc" {
            stream.feed(&[*byte], &mut out).unwrap();
        }

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].body.as_ref(), b"abc");
        assert_eq!(out[0].header("content-length"), Some("3"));
    }

    #[test]
    fn test_inner_section_resets_between_envelopes() {
        let mut stream = StreamDecoder::new(EnvelopeSequence::default());
        let mut out = Vec::new();

        stream.feed(b"First: 1\r\nContent-Length: 2\r\n\r\nab", &mut out).unwrap();
        stream.feed(b"Second: 2\r\n\r\n", &mut out).unwrap();

        assert_eq!(out[1].headers, vec![header("Second", "2")]);
    }

    #[test]
    fn test_malformed_header_fails_both_levels() {
        let mut stream = StreamDecoder::new(EnvelopeSequence::default());
        let mut out: Vec<Envelope> = Vec::new();

        let err = stream.feed(b"no colon here\r\n", &mut out).unwrap_err();

        assert!(matches!(err, CodecError::InvalidData { phase: "header", .. }));
        assert!(!stream.decoder().is_active());

        stream.clear();
        stream.feed(b"Ok: yes\r\n\r\n", &mut out).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_bad_content_length() {
        let mut stream = StreamDecoder::new(EnvelopeSequence::new(64, 10));
        let mut out: Vec<Envelope> = Vec::new();

        let err = stream.feed(b"Content-Length: 11\r\n\r\n", &mut out).unwrap_err();
        assert!(matches!(err, CodecError::FrameTooLarge { size: 11, max: 10 }));

        stream.clear();
        let err = stream.feed(b"Content-Length: many\r\n\r\n", &mut out).unwrap_err();
        assert!(matches!(err, CodecError::InvalidData { .. }));
    }

    #[test]
    fn test_incomplete_envelopes_dropped_on_finish() {
        let mut out: Vec<Envelope> = Vec::new();

        let mut stream = StreamDecoder::new(EnvelopeSequence::default());
        stream.feed(b"Half: header\r\n", &mut out).unwrap();
        stream.finish(&mut out).unwrap();
        assert!(!stream.decoder().is_active());

        let mut stream = StreamDecoder::new(EnvelopeSequence::default());
        stream.feed(b"Content-Length: 9\r\n\r\nshort", &mut out).unwrap();
        stream.finish(&mut out).unwrap();
        assert!(!stream.decoder().is_active());

        assert!(out.is_empty());
    }

    #[test]
    fn test_finish_after_complete_envelope_adds_nothing() {
        let mut stream = StreamDecoder::new(EnvelopeSequence::default());
        let mut out = Vec::new();

        stream.feed(b"A: 1\r\n\r\n", &mut out).unwrap();
        stream.finish(&mut out).unwrap();

        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_encode_then_decode() {
        let envelope = Envelope {
            headers: vec![header("Topic", "news")],
            body: Bytes::from_static(b"payload"),
        };
        let mut wire = Vec::new();
        EnvelopeSequence::encode(&envelope, &mut wire);

        let mut stream = StreamDecoder::new(EnvelopeSequence::default());
        let mut out = Vec::new();
        stream.feed(&wire, &mut out).unwrap();

        assert_eq!(out[0].header("topic"), Some("news"));
        assert_eq!(out[0].body, envelope.body);
    }
}
