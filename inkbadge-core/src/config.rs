//! Layout configuration
//!
//! The layout is fixed at load time: global display geometry plus a list of
//! cells. It is parsed from TOML and validated once; the renderer assumes a
//! validated layout.
//!
//! ```toml
//! [display]
//! width = 296
//! height = 128
//! cols = 2
//! rows = 4
//!
//! [[cell]]
//! row = 0
//! col = 0
//! sensor = "co2"
//! format = "int"
//! thresholds = [1000, 2000]
//! icon = "seedlings.png"
//! ```

use std::collections::HashSet;
use std::path::PathBuf;

use embedded_graphics::mono_font::{iso_8859_1, MonoFont};
use log::warn;
use serde::Deserialize;
use thiserror::Error;

use crate::format::ValueFormat;
use crate::threshold::Thresholds;

/// Font used when the configured name is unknown
pub const FALLBACK_FONT: &MonoFont<'static> = &iso_8859_1::FONT_6X10;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid layout TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("display {0} must be non-zero")]
    ZeroGeometry(&'static str),
    #[error("{cols}x{rows} grid does not fit a {width}x{height} display")]
    GridTooFine {
        cols: u32,
        rows: u32,
        width: u32,
        height: u32,
    },
    #[error("cell at row {row}, col {col} is outside the {cols}x{rows} grid")]
    CellOutOfBounds { row: u32, col: u32, cols: u32, rows: u32 },
    #[error("more than one cell at row {row}, col {col}")]
    DuplicateCell { row: u32, col: u32 },
    #[error("cell at row {row}, col {col}: warning threshold {warning} exceeds danger {danger}")]
    ThresholdOrder {
        row: u32,
        col: u32,
        warning: f64,
        danger: f64,
    },
}

/// Global display geometry and assets
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
    /// Grid columns
    pub cols: u32,
    /// Grid rows
    pub rows: u32,
    /// Icon slot size in pixels (square)
    pub icon_size: u32,
    /// Text font name, see [`resolve_font`]
    pub font: String,
    /// Icons for normal cells
    pub icons_dir: PathBuf,
    /// Icons for inverted (danger) cells
    pub icons_dir_inverted: PathBuf,
    /// Outline every cell
    pub debug_borders: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: inkbadge_protocol::PANEL_WIDTH as u32,
            height: inkbadge_protocol::PANEL_HEIGHT as u32,
            cols: 2,
            rows: 4,
            icon_size: 24,
            font: "profont24".into(),
            icons_dir: PathBuf::from("icons"),
            icons_dir_inverted: PathBuf::from("icons/dark"),
            debug_borders: false,
        }
    }
}

impl DisplayConfig {
    /// Cell width and height (truncating; remainders stay unused)
    pub fn cell_size(&self) -> (u32, u32) {
        (self.width / self.cols, self.height / self.rows)
    }
}

/// One grid cell
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CellSpec {
    pub row: u32,
    pub col: u32,
    /// Snapshot key; a cell without one is left blank
    #[serde(default)]
    pub sensor: Option<String>,
    #[serde(default)]
    pub format: ValueFormat,
    #[serde(default)]
    pub suffix: String,
    #[serde(default)]
    pub thresholds: Option<Thresholds>,
    /// Icon file name within the icon directories
    #[serde(default)]
    pub icon: Option<String>,
    /// Vertical nudge applied to the centred icon
    #[serde(default)]
    pub icon_y_offset: i32,
}

/// Complete layout: display geometry plus cells
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct LayoutConfig {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default, rename = "cell")]
    pub cells: Vec<CellSpec>,
}

impl LayoutConfig {
    /// Parse and validate a layout
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let layout: Self = toml::from_str(content)?;
        layout.validate()?;
        Ok(layout)
    }

    /// Check geometry, cell placement and threshold ordering
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.display;
        for (name, value) in [
            ("width", d.width),
            ("height", d.height),
            ("cols", d.cols),
            ("rows", d.rows),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroGeometry(name));
            }
        }

        if d.cols > d.width || d.rows > d.height {
            return Err(ConfigError::GridTooFine {
                cols: d.cols,
                rows: d.rows,
                width: d.width,
                height: d.height,
            });
        }

        let mut occupied = HashSet::new();
        for cell in &self.cells {
            if cell.col >= d.cols || cell.row >= d.rows {
                return Err(ConfigError::CellOutOfBounds {
                    row: cell.row,
                    col: cell.col,
                    cols: d.cols,
                    rows: d.rows,
                });
            }

            if !occupied.insert((cell.row, cell.col)) {
                return Err(ConfigError::DuplicateCell {
                    row: cell.row,
                    col: cell.col,
                });
            }

            if let Some(t) = &cell.thresholds {
                if !t.is_ordered() {
                    return Err(ConfigError::ThresholdOrder {
                        row: cell.row,
                        col: cell.col,
                        warning: t.warning,
                        danger: t.danger,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Look up a built-in font by name
///
/// Names are `profont7` .. `profont24` and the embedded-graphics ISO-8859-1
/// sizes (`6x10`, `10x20`, ...). Unknown names log a warning and fall back
/// to [`FALLBACK_FONT`].
pub fn resolve_font(name: &str) -> &'static MonoFont<'static> {
    match name.trim().to_ascii_lowercase().as_str() {
        "profont7" => &profont::PROFONT_7_POINT,
        "profont9" => &profont::PROFONT_9_POINT,
        "profont10" => &profont::PROFONT_10_POINT,
        "profont12" => &profont::PROFONT_12_POINT,
        "profont14" => &profont::PROFONT_14_POINT,
        "profont18" => &profont::PROFONT_18_POINT,
        "profont24" => &profont::PROFONT_24_POINT,
        "6x10" => &iso_8859_1::FONT_6X10,
        "6x13" => &iso_8859_1::FONT_6X13,
        "7x13" => &iso_8859_1::FONT_7X13,
        "8x13" => &iso_8859_1::FONT_8X13,
        "9x15" => &iso_8859_1::FONT_9X15,
        "9x18" => &iso_8859_1::FONT_9X18,
        "10x20" => &iso_8859_1::FONT_10X20,
        other => {
            warn!("Unknown font '{}', using 6x10", other);
            FALLBACK_FONT
        }
    }
}
