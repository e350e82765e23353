//! 1-bit drawing surface
//!
//! The grid renderer draws here through `embedded-graphics`. `BinaryColor::On`
//! is ink (black), `BinaryColor::Off` is paper (white).

use std::convert::Infallible;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use inkbadge_protocol::{pack_into, packed_len, BitmapError};

use crate::icon::IconBitmap;

/// In-memory 1-bit canvas, initially all paper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    ink: Vec<bool>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ink: vec![false; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether (x, y) is ink; out of bounds reads as paper
    pub fn is_ink(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.ink[self.index(x, y)]
    }

    /// Number of ink pixels
    pub fn ink_count(&self) -> usize {
        self.ink.iter().filter(|&&ink| ink).count()
    }

    /// Copy an icon with its background onto the canvas, clipped
    pub fn blit(&mut self, icon: &IconBitmap, origin: Point) {
        for y in 0..icon.height() {
            for x in 0..icon.width() {
                let target = origin + Point::new(x as i32, y as i32);
                self.set(target, BinaryColor::from(icon.is_ink(x, y)));
            }
        }
    }

    /// Pack into the wire bitmap format
    pub fn pack(&self) -> Result<Vec<u8>, BitmapError> {
        let (width, height) = (self.width as usize, self.height as usize);
        let mut packed = vec![0u8; packed_len(width, height)];
        let len = pack_into(width, height, &mut packed, |x, y| {
            self.ink[y * width + x]
        })?;
        packed.truncate(len);
        Ok(packed)
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    fn set(&mut self, point: Point, color: BinaryColor) {
        if point.x >= 0
            && point.y >= 0
            && (point.x as u32) < self.width
            && (point.y as u32) < self.height
        {
            let idx = self.index(point.x as u32, point.y as u32);
            self.ink[idx] = color.is_on();
        }
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Canvas {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set(point, color);
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        let Some(bottom_right) = area.bottom_right() else {
            return Ok(());
        };

        for y in area.top_left.y..=bottom_right.y {
            let row = y as usize * self.width as usize;
            let start = row + area.top_left.x as usize;
            let end = row + bottom_right.x as usize + 1;
            self.ink[start..end].fill(color.is_on());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::PrimitiveStyle;
    use inkbadge_protocol::PackedBitmap;
    use proptest::prelude::*;

    #[test]
    fn test_blank_packs_to_all_set_bits() {
        let canvas = Canvas::new(296, 128);
        let packed = canvas.pack().unwrap();
        assert_eq!(packed.len(), 37 * 128);
        assert!(packed.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_partial_byte_padding() {
        let canvas = Canvas::new(10, 1);
        assert_eq!(canvas.pack(), Ok(vec![0xFF, 0b1100_0000]));
    }

    #[test]
    fn test_empty_canvas_packs_to_nothing() {
        assert_eq!(Canvas::new(0, 4).pack(), Ok(Vec::new()));
        assert_eq!(Canvas::new(4, 0).pack(), Ok(Vec::new()));
    }

    #[test]
    fn test_ink_is_clear_bit() {
        let mut canvas = Canvas::new(8, 1);
        Pixel(Point::new(0, 0), BinaryColor::On)
            .draw(&mut canvas)
            .unwrap();
        assert_eq!(canvas.pack(), Ok(vec![0b0111_1111]));
    }

    #[test]
    fn test_fill_solid_clips() {
        let mut canvas = Canvas::new(10, 10);
        Rectangle::new(Point::new(-5, 8), Size::new(8, 8))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut canvas)
            .unwrap();
        assert_eq!(canvas.ink_count(), 3 * 2);
        assert!(canvas.is_ink(2, 9));
        assert!(!canvas.is_ink(3, 9));
    }

    #[test]
    fn test_blit_copies_background() {
        let icon = IconBitmap::from_fn(2, 2, |x, _| x == 0);
        let mut canvas = Canvas::new(4, 4);
        canvas.fill_solid(&canvas.bounding_box(), BinaryColor::On).unwrap();
        canvas.blit(&icon, Point::new(3, 3));

        // Only (3, 3) is inside; icon column 0 is ink
        assert!(canvas.is_ink(3, 3));
        assert_eq!(canvas.ink_count(), 16);

        canvas.blit(&icon, Point::new(0, 0));
        assert!(canvas.is_ink(0, 1));
        assert!(!canvas.is_ink(1, 0));
        assert!(!canvas.is_ink(1, 1));
    }

    proptest! {
        #[test]
        fn prop_pack_matches_canvas(
            width in 1u32..64,
            height in 1u32..16,
            seed in proptest::collection::vec(any::<bool>(), 64 * 16),
        ) {
            let mut canvas = Canvas::new(width, height);
            for y in 0..height {
                for x in 0..width {
                    let color = BinaryColor::from(seed[(y * 64 + x) as usize]);
                    Pixel(Point::new(x as i32, y as i32), color).draw(&mut canvas).unwrap();
                }
            }

            let packed = canvas.pack().unwrap();
            let view = PackedBitmap::new(&packed, width as usize, height as usize);
            for y in 0..height {
                for x in 0..width {
                    prop_assert_eq!(view.is_painted(x as usize, y as usize), canvas.is_ink(x, y));
                }
            }
        }
    }
}
