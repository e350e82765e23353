//! 1-bit framebuffer for the Badger 2040 panel
//!
//! All receiver drawing targets this buffer. The firmware streams it to the
//! panel after each completed frame.
//!
//! Storage is landscape, row-major, MSB-first, with a SET bit meaning ink.
//! This is the panel's own polarity, the inverse of the wire format.

use core::convert::Infallible;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use inkbadge_protocol::{row_stride, MAX_IMAGE_BYTES, PANEL_HEIGHT, PANEL_WIDTH};

const STRIDE: usize = row_stride(PANEL_WIDTH);

/// Landscape framebuffer implementing `DrawTarget<Color = BinaryColor>`
#[derive(Clone)]
pub struct Framebuffer {
    bits: [u8; MAX_IMAGE_BYTES],
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framebuffer {
    /// Create a blank (all paper) framebuffer
    pub const fn new() -> Self {
        Self {
            bits: [0; MAX_IMAGE_BYTES],
        }
    }

    /// Panel width in pixels
    pub const fn width(&self) -> usize {
        PANEL_WIDTH
    }

    /// Panel height in pixels
    pub const fn height(&self) -> usize {
        PANEL_HEIGHT
    }

    /// Raw buffer, one bit per pixel, set = ink
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    /// Whether the pixel at (x, y) is ink; out of bounds reads as paper
    pub fn is_ink(&self, x: usize, y: usize) -> bool {
        if x >= PANEL_WIDTH || y >= PANEL_HEIGHT {
            return false;
        }
        self.bits[y * STRIDE + x / 8] & (0x80 >> (x % 8)) != 0
    }

    /// Number of ink pixels
    pub fn ink_count(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    #[inline]
    fn set_pixel(&mut self, x: usize, y: usize, color: BinaryColor) {
        let idx = y * STRIDE + x / 8;
        let mask = 0x80 >> (x % 8);
        if color.is_on() {
            self.bits[idx] |= mask;
        } else {
            self.bits[idx] &= !mask;
        }
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        Size::new(PANEL_WIDTH as u32, PANEL_HEIGHT as u32)
    }
}

impl DrawTarget for Framebuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            let (x, y) = (coord.x, coord.y);
            if x >= 0 && y >= 0 && (x as usize) < PANEL_WIDTH && (y as usize) < PANEL_HEIGHT {
                self.set_pixel(x as usize, y as usize, color);
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        let Some(bottom_right) = area.bottom_right() else {
            return Ok(());
        };

        for y in area.top_left.y..=bottom_right.y {
            for x in area.top_left.x..=bottom_right.x {
                self.set_pixel(x as usize, y as usize, color);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.bits.fill(if color.is_on() { 0xFF } else { 0x00 });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

    #[test]
    fn test_new_is_blank() {
        let fb = Framebuffer::new();
        assert_eq!(fb.ink_count(), 0);
        assert_eq!(fb.as_bytes().len(), MAX_IMAGE_BYTES);
    }

    #[test]
    fn test_draw_and_read_back() {
        let mut fb = Framebuffer::new();
        Pixel(Point::new(3, 2), BinaryColor::On).draw(&mut fb).unwrap();

        assert!(fb.is_ink(3, 2));
        assert!(!fb.is_ink(4, 2));
        assert_eq!(fb.as_bytes()[2 * STRIDE], 0b0001_0000);
    }

    #[test]
    fn test_out_of_bounds_ignored() {
        let mut fb = Framebuffer::new();
        Pixel(Point::new(-1, 0), BinaryColor::On).draw(&mut fb).unwrap();
        Pixel(Point::new(PANEL_WIDTH as i32, 0), BinaryColor::On)
            .draw(&mut fb)
            .unwrap();
        assert_eq!(fb.ink_count(), 0);
    }

    #[test]
    fn test_fill_solid_clips() {
        let mut fb = Framebuffer::new();
        Rectangle::new(Point::new(290, 120), Size::new(20, 20))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut fb)
            .unwrap();

        assert_eq!(fb.ink_count(), 6 * 8);
        assert!(fb.is_ink(295, 127));
    }

    #[test]
    fn test_clear() {
        let mut fb = Framebuffer::new();
        fb.clear(BinaryColor::On).unwrap();
        assert_eq!(fb.ink_count(), MAX_IMAGE_BYTES * 8);
        fb.clear(BinaryColor::Off).unwrap();
        assert_eq!(fb.ink_count(), 0);
    }
}
