//! Threshold evaluation
//!
//! Maps a raw sensor value onto a warning tier. Boundaries are inclusive on
//! the higher side: a value equal to `danger` is DANGER, a value equal to
//! `warning` is WARNING.

use embedded_graphics::pixelcolor::BinaryColor;
use serde::{Deserialize, Serialize};

/// Severity of a reading relative to its thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum WarningTier {
    #[default]
    None,
    Warning,
    Danger,
}

impl WarningTier {
    /// Drawing polarity for a cell at this tier
    pub fn polarity(self) -> Polarity {
        match self {
            WarningTier::Danger => Polarity::Inverted,
            WarningTier::None | WarningTier::Warning => Polarity::Normal,
        }
    }
}

/// Foreground/background arrangement of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Polarity {
    /// Black ink on white paper
    #[default]
    Normal,
    /// White on a solid black cell
    Inverted,
}

impl Polarity {
    /// Color used for text and icon strokes
    pub fn foreground(self) -> BinaryColor {
        match self {
            Polarity::Normal => BinaryColor::On,
            Polarity::Inverted => BinaryColor::Off,
        }
    }

    /// Color of the cell background
    pub fn background(self) -> BinaryColor {
        self.foreground().invert()
    }
}

/// Ordered `[warning, danger]` pair
///
/// Written in configuration as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Thresholds {
    pub warning: f64,
    pub danger: f64,
}

impl From<[f64; 2]> for Thresholds {
    fn from([warning, danger]: [f64; 2]) -> Self {
        Self { warning, danger }
    }
}

impl From<Thresholds> for [f64; 2] {
    fn from(t: Thresholds) -> Self {
        [t.warning, t.danger]
    }
}

impl Thresholds {
    pub const fn new(warning: f64, danger: f64) -> Self {
        Self { warning, danger }
    }

    /// `warning <= danger`
    pub fn is_ordered(&self) -> bool {
        self.warning <= self.danger
    }

    /// Tier for a parsed value
    pub fn tier(&self, value: f64) -> WarningTier {
        if value >= self.danger {
            WarningTier::Danger
        } else if value >= self.warning {
            WarningTier::Warning
        } else {
            WarningTier::None
        }
    }
}

/// Parse a sensor value as a number, ignoring surrounding whitespace
pub(crate) fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse().ok()
}

/// Tier for a raw value
///
/// Absent thresholds or an unparsable value give [`WarningTier::None`].
pub fn evaluate(value: &str, thresholds: Option<&Thresholds>) -> WarningTier {
    match (thresholds, parse_number(value)) {
        (Some(thresholds), Some(value)) => thresholds.tier(value),
        _ => WarningTier::None,
    }
}
