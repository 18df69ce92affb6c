//! Property tests: chunked input decodes exactly like one contiguous feed

use bytes::Bytes;
use phase_codec::codec::{PhaseSequence, StreamDecoder};
use phase_codec::protocols::cobs::encode_into;
use phase_codec::protocols::{Cobs, Envelope, EnvelopeSequence, Header, LengthPrefixed, Lines};
use proptest::prelude::*;

/// Decode `wire` split at `cuts` (offsets, in any order)
fn decode_chunked<Q: PhaseSequence>(sequence: Q, wire: &[u8], cuts: &[usize]) -> Vec<Q::Output> {
    let mut points: Vec<usize> = cuts.iter().map(|c| c % (wire.len() + 1)).collect();
    points.push(0);
    points.push(wire.len());
    points.sort_unstable();
    points.dedup();

    let mut stream = StreamDecoder::new(sequence);
    let mut out = Vec::new();
    for pair in points.windows(2) {
        stream.feed(&wire[pair[0]..pair[1]], &mut out).unwrap();
    }
    stream.finish(&mut out).unwrap();
    out
}

fn decode_whole<Q: PhaseSequence>(sequence: Q, wire: &[u8]) -> Vec<Q::Output> {
    let mut stream = StreamDecoder::new(sequence);
    let mut out = Vec::new();
    stream.feed(wire, &mut out).unwrap();
    stream.finish(&mut out).unwrap();
    out
}

fn payloads() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..8)
}

fn cuts() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(any::<usize>(), 0..16)
}

fn header() -> impl Strategy<Value = Header> {
    ("[A-Za-z][A-Za-z-]{0,11}", "[ -~]{0,24}").prop_map(|(name, value)| Header {
        name,
        value: value.trim().to_string(),
    })
}

fn envelope() -> impl Strategy<Value = Envelope> {
    (
        prop::collection::vec(header(), 0..4),
        prop::collection::vec(any::<u8>(), 0..48),
    )
        .prop_map(|(headers, body)| {
            let mut unique: Vec<Header> = Vec::new();
            for h in headers {
                let taken = h.name.eq_ignore_ascii_case("content-length")
                    || unique.iter().any(|u| u.name.eq_ignore_ascii_case(&h.name));
                if !taken {
                    unique.push(h);
                }
            }
            Envelope {
                headers: unique,
                body: Bytes::from(body),
            }
        })
}

proptest! {
    #[test]
    fn length_prefixed_split_anywhere(frames in payloads(), cuts in cuts()) {
        let mut wire = Vec::new();
        for frame in &frames {
            LengthPrefixed::encode(frame, &mut wire).unwrap();
        }

        let chunked = decode_chunked(LengthPrefixed::default(), &wire, &cuts);
        prop_assert_eq!(&chunked, &decode_whole(LengthPrefixed::default(), &wire));

        let expected: Vec<Bytes> = frames.into_iter().map(Bytes::from).collect();
        prop_assert_eq!(chunked, expected);
    }

    #[test]
    fn lines_split_anywhere(lines in prop::collection::vec("[^\r\n]{0,40}", 0..8), cuts in cuts()) {
        let wire: String = lines.iter().map(|l| format!("{}\n", l)).collect();

        let chunked = decode_chunked(Lines::default(), wire.as_bytes(), &cuts);
        prop_assert_eq!(&chunked, &decode_whole(Lines::default(), wire.as_bytes()));
        prop_assert_eq!(chunked, lines);
    }

    #[test]
    fn cobs_split_anywhere(frames in payloads(), cuts in cuts()) {
        let mut wire = Vec::new();
        let mut encoded = Vec::new();
        for frame in &frames {
            encode_into(frame, 256, &mut encoded).unwrap();
            wire.extend_from_slice(&encoded);
        }

        let chunked = decode_chunked(Cobs::default(), &wire, &cuts);
        prop_assert_eq!(&chunked, &decode_whole(Cobs::default(), &wire));

        // Empty frames encode to a lone code byte and decode to nothing
        let expected: Vec<Bytes> = frames
            .into_iter()
            .filter(|f| !f.is_empty())
            .map(Bytes::from)
            .collect();
        prop_assert_eq!(chunked, expected);
    }

    #[test]
    fn envelope_split_anywhere(envelopes in prop::collection::vec(envelope(), 0..4), cuts in cuts()) {
        let mut wire = Vec::new();
        for envelope in &envelopes {
            EnvelopeSequence::encode(envelope, &mut wire);
        }

        let chunked = decode_chunked(EnvelopeSequence::default(), &wire, &cuts);
        prop_assert_eq!(&chunked, &decode_whole(EnvelopeSequence::default(), &wire));

        prop_assert_eq!(chunked.len(), envelopes.len());
        for (decoded, sent) in chunked.iter().zip(&envelopes) {
            prop_assert_eq!(&decoded.body, &sent.body);
            for header in &sent.headers {
                prop_assert_eq!(decoded.header(&header.name), Some(header.value.as_str()));
            }
        }
    }
}
