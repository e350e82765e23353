//! Inkbadge Serial Link Protocol
//!
//! This crate defines the one-directional serial protocol between the host
//! (renderer) and the badge (e-paper receiver), plus the 1-bit bitmap format
//! carried by image frames. The protocol is designed to survive a
//! text-oriented channel: every frame is a single printable line.
//!
//! # Protocol Overview
//!
//! ```text
//! ┌──────┬──────────────────────────────┬────┐
//! │ TAG  │ PAYLOAD                      │ LF │
//! │ 4B   │ base64 / ASCII, unbounded    │ 1B │
//! └──────┴──────────────────────────────┴────┘
//! ```
//!
//! - `IMG:<base64 of packed bitmap>\n`: full panel image
//! - `CO2:<value>\n`: legacy scalar frame, kept for older senders
//! - anything else is ignored
//!
//! There is no length prefix, no checksum and no acknowledgement. Each image
//! frame is a complete snapshot, so a corrupted frame is simply superseded by
//! the next one.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod bitmap;
pub mod frame;

pub use bitmap::{pack_into, packed_len, row_stride, BitmapError, PackedBitmap};
pub use frame::{
    decode_image, encode_image_frame, encode_legacy_frame, image_frame_len, Frame, FrameError,
    LineParser, IMAGE_TAG, LEGACY_TAG, LINE_END,
};

/// Badger 2040 panel width in pixels (landscape)
pub const PANEL_WIDTH: usize = 296;

/// Badger 2040 panel height in pixels (landscape)
pub const PANEL_HEIGHT: usize = 128;

/// Packed size of a full Badger 2040 frame
pub const MAX_IMAGE_BYTES: usize = packed_len(PANEL_WIDTH, PANEL_HEIGHT);

/// Longest line a receiver must buffer for a full image frame
///
/// Tag + base64 payload, with a little slack for a trailing CR or spaces.
pub const MAX_LINE_LEN: usize = IMAGE_TAG.len() + frame::encoded_len(MAX_IMAGE_BYTES) + 8;
