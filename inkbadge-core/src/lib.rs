//! Host-side rendering pipeline for inkbadge
//!
//! This crate contains everything between a sensor snapshot and bytes on the
//! serial link:
//!
//! - Layout configuration types and validation
//! - Threshold evaluation and value formatting
//! - Icon loading, 1-bit conversion and caching
//! - The grid layout engine drawing onto a 1-bit canvas
//! - Bitmap packing (via `inkbadge-protocol`) and the link transmitter
//!
//! Nothing here talks to the network; sensor values arrive as a
//! [`SensorSnapshot`] built by the caller.

#![deny(unsafe_code)]

pub mod canvas;
pub mod config;
pub mod format;
pub mod grid;
pub mod icon;
pub mod link;
pub mod snapshot;
pub mod threshold;

pub use canvas::Canvas;
pub use config::{CellSpec, ConfigError, DisplayConfig, LayoutConfig};
pub use format::{format_value, ValueFormat};
pub use grid::{CellPlan, GridRenderer};
pub use icon::{DirectoryIconSource, IconBitmap, IconCache, IconError, IconSource};
pub use link::{LinkError, LinkTransmitter};
pub use snapshot::{SensorSnapshot, MISSING_VALUE, SENSOR_ERROR};
pub use threshold::{evaluate, Polarity, Thresholds, WarningTier};
