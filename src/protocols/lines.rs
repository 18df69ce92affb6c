//! Newline-delimited UTF-8 text
//!
//! One message per line, LF or CRLF terminated. An unterminated last line is
//! still delivered when the stream closes.

use crate::codec::readers::{Line, Reader};
use crate::codec::{DecodingPhase, PhaseSequence, ProtocolSink, Transition};
use crate::constants::DEFAULT_MAX_LINE_LENGTH;
use crate::error::Result;
use bytes::BytesMut;
use std::convert::Infallible;

#[derive(Debug)]
pub struct LinePhase(Line);

impl DecodingPhase for LinePhase {
    type Product = String;

    fn decode<S>(&mut self, buf: &mut BytesMut, out: &mut S) -> Result<Transition<Self>>
    where
        S: ProtocolSink<String> + ?Sized,
    {
        match self.0.read(buf)? {
            Some(line) => {
                out.write(line);
                Ok(Transition::Done)
            }
            None => Ok(Transition::Stay),
        }
    }

    fn finish<S>(&mut self, out: &mut S) -> Result<Transition<Self>>
    where
        S: ProtocolSink<String> + ?Sized,
    {
        if let Some(line) = self.0.finish()? {
            out.write(line);
        }
        Ok(Transition::Done)
    }
}

/// Line-oriented text protocol
#[derive(Debug, Clone)]
pub struct Lines {
    max_line_length: usize,
}

impl Lines {
    pub fn new(max_line_length: usize) -> Self {
        Self { max_line_length }
    }
}

impl Default for Lines {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LENGTH)
    }
}

impl PhaseSequence for Lines {
    type Phase = LinePhase;
    type Output = String;
    type Next = Infallible;

    const NAME: &'static str = "lines";

    fn init(&mut self) -> Result<LinePhase> {
        Ok(LinePhase(Line::new(self.max_line_length)))
    }

    fn aggregate<S>(&mut self, products: Vec<String>, out: &mut S) -> Result<Transition<Infallible>>
    where
        S: ProtocolSink<String> + ?Sized,
    {
        for line in products {
            out.write(line);
        }
        Ok(Transition::Done)
    }
}
