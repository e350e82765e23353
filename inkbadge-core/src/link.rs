//! Link transmitter
//!
//! Wraps any `Write` (a serial port in production) and sends complete
//! frames. Each frame is assembled in memory first and handed to the writer
//! in a single `write_all`, then flushed, so frames never interleave and
//! each tick's frame is on the wire before the next one starts.

use std::io::{self, Write};

use inkbadge_protocol::{
    encode_image_frame, encode_legacy_frame, image_frame_len, FrameError, LEGACY_TAG,
};
use log::trace;
use thiserror::Error;

/// Link write errors
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("link write failed: {0}")]
    Io(#[from] io::Error),
    #[error("frame encoding failed: {0:?}")]
    Encode(FrameError),
}

impl From<FrameError> for LinkError {
    fn from(e: FrameError) -> Self {
        LinkError::Encode(e)
    }
}

/// Sends frames over a byte stream
pub struct LinkTransmitter<W> {
    writer: W,
    frame: Vec<u8>,
}

impl<W: Write> LinkTransmitter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            frame: Vec::new(),
        }
    }

    /// Send packed bitmap bytes as an image frame
    ///
    /// Returns the number of bytes written, terminator included.
    pub fn send_image(&mut self, packed: &[u8]) -> Result<usize, LinkError> {
        self.frame.resize(image_frame_len(packed.len()), 0);
        let len = encode_image_frame(packed, &mut self.frame)?;
        self.write_frame(len)
    }

    /// Send a legacy scalar frame
    pub fn send_legacy(&mut self, value: &str) -> Result<usize, LinkError> {
        self.frame.resize(LEGACY_TAG.len() + value.len() + 1, 0);
        let len = encode_legacy_frame(value, &mut self.frame)?;
        self.write_frame(len)
    }

    fn write_frame(&mut self, len: usize) -> Result<usize, LinkError> {
        self.writer.write_all(&self.frame[..len])?;
        self.writer.flush()?;
        trace!("Sent {} byte frame", len);
        Ok(len)
    }

    /// Flush any buffered bytes
    pub fn flush(&mut self) -> Result<(), LinkError> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Give back the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkbadge_protocol::{decode_image, Frame};

    /// Records every write call separately
    #[derive(Default)]
    struct RecordingWriter {
        writes: Vec<Vec<u8>>,
        flushes: usize,
    }

    impl Write for RecordingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes.push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_image_frame_single_write_then_flush() {
        let mut link = LinkTransmitter::new(RecordingWriter::default());
        let packed = [0xFFu8, 0x00, 0x81, 0x7E];
        let len = link.send_image(&packed).unwrap();

        let writer = link.into_inner();
        assert_eq!(writer.writes.len(), 1);
        assert_eq!(writer.flushes, 1);

        let frame = &writer.writes[0];
        assert_eq!(frame.len(), len);
        assert!(frame.starts_with(b"IMG:"));
        assert_eq!(frame.last(), Some(&b'\n'));

        let Frame::Image(payload) = Frame::parse(&frame[..len - 1]) else {
            panic!("not an image frame");
        };
        let mut decoded = [0u8; 4];
        assert_eq!(decode_image(payload, &mut decoded), Ok(4));
        assert_eq!(decoded, packed);
    }

    #[test]
    fn test_frames_reuse_buffer() {
        let mut link = LinkTransmitter::new(RecordingWriter::default());
        link.send_image(&[0u8; 300]).unwrap();
        link.send_image(&[0u8; 3]).unwrap();

        let writer = link.into_inner();
        assert_eq!(writer.writes[1], b"IMG:AAAA\n");
    }

    #[test]
    fn test_legacy_frame() {
        let mut link = LinkTransmitter::new(Vec::new());
        link.send_legacy("812").unwrap();
        assert_eq!(link.get_ref().as_slice(), b"CO2:812\n");
    }

    #[test]
    fn test_legacy_rejects_newline() {
        let mut link = LinkTransmitter::new(Vec::new());
        assert!(matches!(
            link.send_legacy("8\n12"),
            Err(LinkError::Encode(FrameError::InvalidText))
        ));
        assert!(link.get_ref().is_empty());
    }

    #[test]
    fn test_write_error_propagates() {
        let mut link = LinkTransmitter::new(BrokenWriter);
        assert!(matches!(link.send_image(&[1, 2, 3]), Err(LinkError::Io(_))));
    }
}
