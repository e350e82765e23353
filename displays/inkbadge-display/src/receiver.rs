//! Link receiver / display state machine
//!
//! Bytes from the link are fed one at a time. When a line completes it is
//! classified once into a [`Frame`] and dispatched:
//!
//! - image frame: decode, paint, count towards the next full refresh
//! - legacy scalar frame: draw the large-text screen
//! - anything else: ignored
//!
//! A frame that fails to decode is dropped. State, panel contents and the
//! refresh counter stay as they were, and the next frame supersedes it.

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use heapless::String;
use inkbadge_protocol::{
    decode_image, packed_len, Frame, FrameError, LineParser, PackedBitmap, MAX_IMAGE_BYTES,
    MAX_LINE_LEN,
};

use crate::refresh::{RefreshCounter, RefreshMode};
use crate::screen;

/// Longest legacy value kept for display
const LEGACY_VALUE_LEN: usize = 16;

/// Receiver state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReceiverState {
    /// No frame displayed yet; the waiting screen is up
    Waiting,
    /// At least one frame has been displayed
    Painting,
}

/// Result of feeding one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// Line not complete yet
    Pending,
    /// Image frame painted; panel needs the given refresh
    Painted(RefreshMode),
    /// Legacy scalar screen drawn; panel needs the given refresh
    LegacyShown(RefreshMode),
    /// Frame could not be decoded and was dropped
    Dropped(FrameError),
    /// Line was not a known frame
    Ignored,
}

impl Outcome {
    /// Panel refresh required by this outcome, if any
    pub fn refresh(&self) -> Option<RefreshMode> {
        match self {
            Outcome::Painted(mode) | Outcome::LegacyShown(mode) => Some(*mode),
            Outcome::Pending | Outcome::Dropped(_) | Outcome::Ignored => None,
        }
    }
}

/// Display state machine driven by link bytes
pub struct Receiver<D> {
    display: D,
    state: ReceiverState,
    parser: LineParser<MAX_LINE_LEN>,
    image: [u8; MAX_IMAGE_BYTES],
    counter: RefreshCounter,
}

impl<D> Receiver<D>
where
    D: DrawTarget<Color = BinaryColor>,
{
    /// Create a receiver drawing to `display`
    pub fn new(display: D, counter: RefreshCounter) -> Self {
        Self {
            display,
            state: ReceiverState::Waiting,
            parser: LineParser::new(),
            image: [0; MAX_IMAGE_BYTES],
            counter,
        }
    }

    /// Draw the waiting screen and return the refresh it needs
    pub fn start(&mut self) -> Result<RefreshMode, D::Error> {
        self.state = ReceiverState::Waiting;
        self.parser.reset();
        screen::draw_waiting(&mut self.display)?;
        Ok(RefreshMode::Fast)
    }

    /// Current state
    pub fn state(&self) -> ReceiverState {
        self.state
    }

    /// Refresh counter
    pub fn counter(&self) -> &RefreshCounter {
        &self.counter
    }

    /// Draw target holding the current screen
    pub fn display(&self) -> &D {
        &self.display
    }

    /// Feed one byte from the link
    pub fn feed(&mut self, byte: u8) -> Result<Outcome, D::Error> {
        let line = match self.parser.feed(byte) {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(Outcome::Pending),
            Err(e) => return Ok(Outcome::Dropped(e)),
        };

        match Frame::parse(line) {
            Frame::Image(payload) => {
                let decoded = decode_image(payload, &mut self.image);
                self.on_image(decoded)
            }
            Frame::LegacyScalar(value) => {
                let mut text: String<LEGACY_VALUE_LEN> = String::new();
                for c in value.chars() {
                    if text.push(c).is_err() {
                        break;
                    }
                }
                self.on_legacy(&text)
            }
            Frame::Unknown => Ok(Outcome::Ignored),
        }
    }

    fn on_image(&mut self, decoded: Result<usize, FrameError>) -> Result<Outcome, D::Error> {
        let len = match decoded {
            Ok(len) => len,
            Err(e) => return Ok(Outcome::Dropped(e)),
        };

        let size = self.display.bounding_box().size;
        let (width, height) = (size.width as usize, size.height as usize);
        let expected = packed_len(width, height);
        if len != expected {
            return Ok(Outcome::Dropped(FrameError::LengthMismatch {
                expected,
                actual: len,
            }));
        }

        let image = PackedBitmap::new(&self.image[..len], width, height);
        screen::paint_image(&mut self.display, image)?;
        self.state = ReceiverState::Painting;
        Ok(Outcome::Painted(self.counter.record_paint()))
    }

    fn on_legacy(&mut self, value: &str) -> Result<Outcome, D::Error> {
        screen::draw_legacy(&mut self.display, value)?;
        self.state = ReceiverState::Painting;
        Ok(Outcome::LegacyShown(RefreshMode::Fast))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Framebuffer;
    use inkbadge_protocol::{encode_image_frame, encode_legacy_frame, image_frame_len, pack_into};
    use inkbadge_protocol::{PANEL_HEIGHT, PANEL_WIDTH};
    use std::boxed::Box;
    use std::vec;
    use std::vec::Vec;

    type TestReceiver = Receiver<Framebuffer>;

    fn receiver(interval: u16) -> Box<TestReceiver> {
        let mut rx = Box::new(Receiver::new(Framebuffer::new(), RefreshCounter::new(interval)));
        rx.start().unwrap();
        rx
    }

    fn image_frame<F: FnMut(usize, usize) -> bool>(painted: F) -> Vec<u8> {
        let mut data = vec![0u8; MAX_IMAGE_BYTES];
        pack_into(PANEL_WIDTH, PANEL_HEIGHT, &mut data, painted).unwrap();
        let mut frame = vec![0u8; image_frame_len(data.len())];
        encode_image_frame(&data, &mut frame).unwrap();
        frame
    }

    fn feed_line(rx: &mut TestReceiver, bytes: &[u8]) -> Vec<Outcome> {
        bytes
            .iter()
            .map(|&b| rx.feed(b).unwrap())
            .filter(|o| *o != Outcome::Pending)
            .collect()
    }

    #[test]
    fn test_starts_waiting() {
        let rx = receiver(60);
        assert_eq!(rx.state(), ReceiverState::Waiting);
        assert!(rx.display().ink_count() > 0);
    }

    #[test]
    fn test_image_frame_paints() {
        let mut rx = receiver(60);
        let frame = image_frame(|x, y| x < 10 && y < 10);

        let outcomes = feed_line(&mut rx, &frame);
        assert_eq!(outcomes, vec![Outcome::Painted(RefreshMode::Fast)]);
        assert_eq!(rx.state(), ReceiverState::Painting);
        assert_eq!(rx.counter().count(), 1);
        assert_eq!(rx.display().ink_count(), 100);
        assert!(rx.display().is_ink(9, 9));
        assert!(!rx.display().is_ink(10, 9));
    }

    #[test]
    fn test_full_refresh_cycle() {
        let mut rx = receiver(60);
        let frame = image_frame(|x, _| x == 0);

        for _ in 1..60 {
            assert_eq!(
                feed_line(&mut rx, &frame),
                vec![Outcome::Painted(RefreshMode::Fast)]
            );
        }
        assert_eq!(
            feed_line(&mut rx, &frame),
            vec![Outcome::Painted(RefreshMode::Normal)]
        );
        assert_eq!(rx.counter().count(), 0);
        assert_eq!(
            feed_line(&mut rx, &frame),
            vec![Outcome::Painted(RefreshMode::Fast)]
        );
    }

    #[test]
    fn test_corrupt_frame_keeps_state() {
        let mut rx = receiver(60);
        let before = rx.display().as_bytes().to_vec();

        let outcomes = feed_line(&mut rx, b"IMG:!!!not base64!!!\n");
        assert_eq!(outcomes, vec![Outcome::Dropped(FrameError::InvalidEncoding)]);
        assert_eq!(rx.state(), ReceiverState::Waiting);
        assert_eq!(rx.counter().count(), 0);
        assert_eq!(rx.display().as_bytes(), &before[..]);

        // Next valid frame still paints
        let frame = image_frame(|_, _| false);
        assert_eq!(
            feed_line(&mut rx, &frame),
            vec![Outcome::Painted(RefreshMode::Fast)]
        );
        assert_eq!(rx.display().ink_count(), 0);
    }

    #[test]
    fn test_short_image_dropped() {
        let mut rx = receiver(60);
        let outcomes = feed_line(&mut rx, b"IMG:AAAA\n");
        assert_eq!(
            outcomes,
            vec![Outcome::Dropped(FrameError::LengthMismatch {
                expected: MAX_IMAGE_BYTES,
                actual: 3,
            })]
        );
        assert_eq!(rx.state(), ReceiverState::Waiting);
    }

    #[test]
    fn test_legacy_frame() {
        let mut rx = receiver(60);
        let mut frame = [0u8; 16];
        let len = encode_legacy_frame("812", &mut frame).unwrap();

        let outcomes = feed_line(&mut rx, &frame[..len]);
        assert_eq!(outcomes, vec![Outcome::LegacyShown(RefreshMode::Fast)]);
        assert_eq!(rx.state(), ReceiverState::Painting);
        assert_eq!(rx.counter().count(), 0);
    }

    #[test]
    fn test_unknown_and_overlong_lines() {
        let mut rx = receiver(60);
        assert_eq!(feed_line(&mut rx, b"hello\n"), vec![Outcome::Ignored]);

        let mut junk = vec![b'x'; MAX_LINE_LEN + 10];
        junk.push(b'\n');
        assert_eq!(
            feed_line(&mut rx, &junk),
            vec![Outcome::Dropped(FrameError::LineTooLong)]
        );
        assert_eq!(rx.state(), ReceiverState::Waiting);
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut rx = receiver(60);
        let mut frame = image_frame(|_, y| y == 0);
        frame.insert(frame.len() - 1, b'\r');
        assert_eq!(
            feed_line(&mut rx, &frame),
            vec![Outcome::Painted(RefreshMode::Fast)]
        );
        assert_eq!(rx.display().ink_count(), PANEL_WIDTH);
    }

    #[test]
    fn test_outcome_refresh() {
        assert_eq!(Outcome::Pending.refresh(), None);
        assert_eq!(Outcome::Ignored.refresh(), None);
        assert_eq!(Outcome::Dropped(FrameError::LineTooLong).refresh(), None);
        assert_eq!(
            Outcome::Painted(RefreshMode::Normal).refresh(),
            Some(RefreshMode::Normal)
        );
    }
}
