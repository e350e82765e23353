//! Receiver side of the inkbadge link
//!
//! This crate provides:
//! - `Framebuffer`, a 1-bit `DrawTarget` sized for the Badger 2040 panel
//! - `RefreshMode` / `RefreshCounter` for e-paper ghosting control
//! - Static screens (waiting, legacy scalar) and the image paint routine
//! - `Receiver`, the line-driven display state machine
//!
//! # Architecture
//!
//! The receiver never talks to hardware. It draws into any
//! `DrawTarget<Color = BinaryColor>` and reports, per completed frame, which
//! refresh the panel needs. The firmware owns the actual panel driver and
//! awaits the update before polling the link again, so painting is never
//! interleaved with input handling.
//!
//! `BinaryColor::On` is ink (black), `BinaryColor::Off` is paper (white).

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod framebuffer;
pub mod receiver;
pub mod refresh;
pub mod screen;

// Re-export key types
pub use framebuffer::Framebuffer;
pub use receiver::{Outcome, Receiver, ReceiverState};
pub use refresh::{RefreshCounter, RefreshMode, DEFAULT_FULL_REFRESH_INTERVAL};
