//! Packed 1-bit bitmap format
//!
//! Layout:
//! - Row-major, top row first
//! - Each row is `ceil(width / 8)` bytes, 8 columns per byte
//! - Bit 7 (MSB) is the leftmost column of the group, bit 0 the rightmost
//! - A SET bit is background (white); a CLEAR bit is a painted (black) pixel
//! - Columns past `width` in the last byte of a row are zero padding
//!
//! The clear-bit-is-painted convention is the wire contract with deployed
//! receivers and must not be flipped.

/// Errors that can occur while packing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitmapError {
    /// Output buffer is smaller than `packed_len(width, height)`
    BufferTooSmall,
}

/// Number of bytes per packed row
pub const fn row_stride(width: usize) -> usize {
    width.div_ceil(8)
}

/// Total packed size for a `width × height` bitmap
pub const fn packed_len(width: usize, height: usize) -> usize {
    height * row_stride(width)
}

/// Pack a bitmap into `out`
///
/// `is_painted(x, y)` reports whether the source pixel is black.
/// Returns the number of bytes written.
pub fn pack_into<F>(
    width: usize,
    height: usize,
    out: &mut [u8],
    mut is_painted: F,
) -> Result<usize, BitmapError>
where
    F: FnMut(usize, usize) -> bool,
{
    let len = packed_len(width, height);
    if out.len() < len {
        return Err(BitmapError::BufferTooSmall);
    }

    let stride = row_stride(width);
    for (y, row) in out[..len].chunks_exact_mut(stride.max(1)).enumerate() {
        for (group, byte) in row.iter_mut().enumerate() {
            let mut packed = 0u8;
            for bit in 0..8 {
                let x = group * 8 + bit;
                if x < width && !is_painted(x, y) {
                    packed |= 0x80 >> bit;
                }
            }
            *byte = packed;
        }
    }

    Ok(len)
}

/// Read-only view over packed bitmap bytes
///
/// The data may be shorter than `packed_len(width, height)`; pixels past the
/// end of the data read as unpainted.
#[derive(Debug, Clone, Copy)]
pub struct PackedBitmap<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
}

impl<'a> PackedBitmap<'a> {
    /// Wrap packed bytes with their geometry
    pub fn new(data: &'a [u8], width: usize, height: usize) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw packed bytes
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Whether the pixel at (x, y) is painted (black)
    pub fn is_painted(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let idx = y * row_stride(self.width) + x / 8;
        match self.data.get(idx) {
            Some(byte) => byte & (0x80 >> (x % 8)) == 0,
            None => false,
        }
    }

    /// Iterate over painted pixel coordinates, row by row
    pub fn painted_pixels(&self) -> impl Iterator<Item = (usize, usize)> + 'a {
        let view = *self;
        (0..view.height).flat_map(move |y| {
            (0..view.width)
                .filter(move |&x| view.is_painted(x, y))
                .map(move |x| (x, y))
        })
    }
}
