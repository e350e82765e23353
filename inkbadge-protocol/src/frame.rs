//! Frame encoding and decoding for the inkbadge serial link.
//!
//! Frame format:
//! - TAG (4 bytes): `IMG:` for image frames, `CO2:` for legacy scalar frames
//! - PAYLOAD: base64 of the packed bitmap (image) or ASCII text (legacy)
//! - LF (1 byte): frame terminator, the only frame boundary
//!
//! Leading/trailing whitespace around a line (e.g. a CR from a terminal) is
//! ignored by the receiver.

use base64::engine::general_purpose::STANDARD;
use base64::{DecodeSliceError, Engine};
use heapless::Vec;

/// Image frame tag
pub const IMAGE_TAG: &[u8] = b"IMG:";

/// Legacy scalar frame tag
pub const LEGACY_TAG: &[u8] = b"CO2:";

/// Frame terminator
pub const LINE_END: u8 = b'\n';

/// Errors that can occur during framing, encoding or decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Buffer too small for encoding or decoding
    BufferTooSmall,
    /// Payload is not valid base64
    InvalidEncoding,
    /// Decoded image does not match the panel geometry
    LengthMismatch { expected: usize, actual: usize },
    /// Line exceeded the parser capacity and was discarded
    LineTooLong,
    /// Legacy value would break framing (contains a newline)
    InvalidText,
}

/// A classified line from the link
///
/// Classification happens once, when the line is complete; consumers match
/// on the variant instead of re-inspecting the raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    /// Image frame; payload is still base64 encoded
    Image(&'a [u8]),
    /// Legacy scalar frame carrying a single display value
    LegacyScalar(&'a str),
    /// Anything else; ignored by receivers
    Unknown,
}

impl<'a> Frame<'a> {
    /// Classify a complete line (without its terminator)
    pub fn parse(line: &'a [u8]) -> Self {
        let line = line.trim_ascii();

        if let Some(payload) = line.strip_prefix(IMAGE_TAG) {
            return Frame::Image(payload);
        }

        if let Some(rest) = line.strip_prefix(LEGACY_TAG) {
            // The value is the field after the tag, up to any further ':'
            let value = rest.split(|&b| b == b':').next().unwrap_or(rest);
            return match core::str::from_utf8(value) {
                Ok(value) => Frame::LegacyScalar(value),
                Err(_) => Frame::Unknown,
            };
        }

        Frame::Unknown
    }
}

/// Base64 length of `data_len` bytes (padded)
pub const fn encoded_len(data_len: usize) -> usize {
    data_len.div_ceil(3) * 4
}

/// Complete encoded size of an image frame for `packed_len` payload bytes
pub const fn image_frame_len(packed_len: usize) -> usize {
    IMAGE_TAG.len() + encoded_len(packed_len) + 1
}

/// Encode an image frame (`IMG:<base64>\n`) into `out`
///
/// Returns the number of bytes written.
pub fn encode_image_frame(packed: &[u8], out: &mut [u8]) -> Result<usize, FrameError> {
    let frame_len = image_frame_len(packed.len());
    if out.len() < frame_len {
        return Err(FrameError::BufferTooSmall);
    }

    let tag_len = IMAGE_TAG.len();
    out[..tag_len].copy_from_slice(IMAGE_TAG);
    let written = STANDARD
        .encode_slice(packed, &mut out[tag_len..frame_len - 1])
        .map_err(|_| FrameError::BufferTooSmall)?;
    out[tag_len + written] = LINE_END;

    Ok(tag_len + written + 1)
}

/// Encode a legacy scalar frame (`CO2:<value>\n`) into `out`
pub fn encode_legacy_frame(value: &str, out: &mut [u8]) -> Result<usize, FrameError> {
    if value.bytes().any(|b| b == LINE_END || b == b'\r') {
        return Err(FrameError::InvalidText);
    }

    let tag_len = LEGACY_TAG.len();
    let frame_len = tag_len + value.len() + 1;
    if out.len() < frame_len {
        return Err(FrameError::BufferTooSmall);
    }

    out[..tag_len].copy_from_slice(LEGACY_TAG);
    out[tag_len..frame_len - 1].copy_from_slice(value.as_bytes());
    out[frame_len - 1] = LINE_END;

    Ok(frame_len)
}

/// Decode an image payload into `out`
///
/// Returns the number of decoded bytes.
pub fn decode_image(payload: &[u8], out: &mut [u8]) -> Result<usize, FrameError> {
    STANDARD.decode_slice(payload, out).map_err(|e| match e {
        DecodeSliceError::OutputSliceTooSmall => FrameError::BufferTooSmall,
        DecodeSliceError::DecodeError(_) => FrameError::InvalidEncoding,
    })
}

/// Accumulates link bytes into newline-terminated lines
///
/// Lines longer than `N` are dropped in their entirety: the parser discards
/// bytes until the next terminator, then reports `LineTooLong`.
#[derive(Debug, Clone)]
pub struct LineParser<const N: usize> {
    state: ParseState,
    buffer: Vec<u8, N>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Appending bytes to the current line
    Collecting,
    /// Current line overflowed, skipping to the next terminator
    Discarding,
    /// A line was returned; buffer is cleared on the next byte
    Complete,
}

impl<const N: usize> Default for LineParser<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> LineParser<N> {
    /// Create a new line parser
    pub const fn new() -> Self {
        Self {
            state: ParseState::Collecting,
            buffer: Vec::new(),
        }
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.state = ParseState::Collecting;
        self.buffer.clear();
    }

    /// Number of bytes buffered for the current line
    pub fn pending(&self) -> usize {
        match self.state {
            ParseState::Collecting => self.buffer.len(),
            ParseState::Discarding | ParseState::Complete => 0,
        }
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(line))` when a terminator completes a line (the
    /// terminator is not included), `Ok(None)` when more bytes are needed,
    /// or `Err(LineTooLong)` when an overflowed line ends.
    pub fn feed(&mut self, byte: u8) -> Result<Option<&[u8]>, FrameError> {
        if self.state == ParseState::Complete {
            self.reset();
        }

        match self.state {
            ParseState::Discarding => {
                if byte == LINE_END {
                    self.reset();
                    return Err(FrameError::LineTooLong);
                }
                Ok(None)
            }
            _ => {
                if byte == LINE_END {
                    self.state = ParseState::Complete;
                    return Ok(Some(self.buffer.as_slice()));
                }
                if self.buffer.push(byte).is_err() {
                    self.buffer.clear();
                    self.state = ParseState::Discarding;
                }
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::vec;
    use std::vec::Vec as StdVec;

    fn feed_all<const N: usize>(
        parser: &mut LineParser<N>,
        bytes: &[u8],
    ) -> StdVec<Result<StdVec<u8>, FrameError>> {
        let mut lines = StdVec::new();
        for &byte in bytes {
            match parser.feed(byte) {
                Ok(Some(line)) => lines.push(Ok(line.to_vec())),
                Ok(None) => {}
                Err(e) => lines.push(Err(e)),
            }
        }
        lines
    }

    #[test]
    fn test_image_frame_layout() {
        let mut buffer = [0u8; 32];
        let len = encode_image_frame(&[0xFF, 0x00, 0xAA], &mut buffer).unwrap();

        assert_eq!(len, 9);
        assert_eq!(&buffer[..len], b"IMG:/wCq\n");
    }

    #[test]
    fn test_image_frame_padding() {
        let mut buffer = [0u8; 32];
        let len = encode_image_frame(&[0x00], &mut buffer).unwrap();
        assert_eq!(&buffer[..len], b"IMG:AA==\n");
        assert_eq!(len, image_frame_len(1));
    }

    #[test]
    fn test_image_frame_buffer_too_small() {
        let mut buffer = [0u8; 8];
        assert_eq!(
            encode_image_frame(&[1, 2, 3], &mut buffer),
            Err(FrameError::BufferTooSmall)
        );
    }

    #[test]
    fn test_legacy_frame_layout() {
        let mut buffer = [0u8; 16];
        let len = encode_legacy_frame("812", &mut buffer).unwrap();
        assert_eq!(&buffer[..len], b"CO2:812\n");
    }

    #[test]
    fn test_legacy_frame_rejects_newline() {
        let mut buffer = [0u8; 16];
        assert_eq!(
            encode_legacy_frame("8\n12", &mut buffer),
            Err(FrameError::InvalidText)
        );
    }

    #[test]
    fn test_parse_image() {
        assert_eq!(Frame::parse(b"IMG:/wCq"), Frame::Image(b"/wCq"));
        assert_eq!(Frame::parse(b"IMG:/wCq\r"), Frame::Image(b"/wCq"));
        assert_eq!(Frame::parse(b"IMG:"), Frame::Image(b""));
    }

    #[test]
    fn test_parse_legacy() {
        assert_eq!(Frame::parse(b"CO2:812"), Frame::LegacyScalar("812"));
        assert_eq!(Frame::parse(b"CO2:812:ppm"), Frame::LegacyScalar("812"));
        assert_eq!(Frame::parse(b"CO2:"), Frame::LegacyScalar(""));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(Frame::parse(b""), Frame::Unknown);
        assert_eq!(Frame::parse(b"img:abcd"), Frame::Unknown);
        assert_eq!(Frame::parse(b"hello"), Frame::Unknown);
        assert_eq!(Frame::parse(b"CO2:\xFF\xFE"), Frame::Unknown);
    }

    #[test]
    fn test_decode_invalid_base64() {
        let mut out = [0u8; 16];
        assert_eq!(
            decode_image(b"not*base64", &mut out),
            Err(FrameError::InvalidEncoding)
        );
    }

    #[test]
    fn test_decode_output_too_small() {
        let mut out = [0u8; 2];
        assert_eq!(
            decode_image(b"/wCq", &mut out),
            Err(FrameError::BufferTooSmall)
        );
    }

    #[test]
    fn test_line_parser_splits_lines() {
        let mut parser = LineParser::<16>::new();
        let lines = feed_all(&mut parser, b"CO2:1\nIMG:AA==\n");
        assert_eq!(
            lines,
            vec![Ok(b"CO2:1".to_vec()), Ok(b"IMG:AA==".to_vec())]
        );
    }

    #[test]
    fn test_line_parser_empty_line() {
        let mut parser = LineParser::<16>::new();
        let lines = feed_all(&mut parser, b"\n");
        assert_eq!(lines, vec![Ok(StdVec::new())]);
    }

    #[test]
    fn test_line_parser_resync_after_overflow() {
        let mut parser = LineParser::<4>::new();
        let lines = feed_all(&mut parser, b"toolongline\nok\n");
        assert_eq!(
            lines,
            vec![Err(FrameError::LineTooLong), Ok(b"ok".to_vec())]
        );
    }

    #[test]
    fn test_line_parser_pending() {
        let mut parser = LineParser::<8>::new();
        parser.feed(b'a').unwrap();
        parser.feed(b'b').unwrap();
        assert_eq!(parser.pending(), 2);
        parser.feed(LINE_END).unwrap();
        assert_eq!(parser.pending(), 0);
        parser.feed(b'c').unwrap();
        assert_eq!(parser.pending(), 1);
    }

    proptest! {
        #[test]
        fn prop_image_frame_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..600)) {
            let mut encoded = vec![0u8; image_frame_len(data.len())];
            let len = encode_image_frame(&data, &mut encoded).unwrap();
            prop_assert_eq!(len, encoded.len());
            prop_assert_eq!(encoded[len - 1], LINE_END);

            let mut parser = LineParser::<1024>::new();
            let mut decoded = vec![0u8; data.len()];
            let mut decoded_len = None;
            for &byte in &encoded {
                if let Some(line) = parser.feed(byte).unwrap() {
                    match Frame::parse(line) {
                        Frame::Image(payload) => {
                            decoded_len = Some(decode_image(payload, &mut decoded).unwrap());
                        }
                        other => prop_assert!(false, "unexpected frame {:?}", other),
                    }
                }
            }

            prop_assert_eq!(decoded_len, Some(data.len()));
            prop_assert_eq!(decoded, data);
        }

        #[test]
        fn prop_every_byte_value_survives(byte in any::<u8>(), repeat in 1usize..8) {
            let data = vec![byte; repeat];
            let mut encoded = vec![0u8; image_frame_len(data.len())];
            encode_image_frame(&data, &mut encoded).unwrap();

            // Encoded frames are printable and contain a single terminator
            prop_assert!(encoded[..encoded.len() - 1]
                .iter()
                .all(|b| b.is_ascii_graphic()));

            let payload = match Frame::parse(&encoded[..encoded.len() - 1]) {
                Frame::Image(payload) => payload,
                _ => unreachable!(),
            };
            let mut decoded = vec![0u8; repeat];
            decode_image(payload, &mut decoded).unwrap();
            prop_assert_eq!(decoded, data);
        }
    }
}
