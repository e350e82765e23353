//! Grid layout engine
//!
//! The canvas is split into `cols x rows` equal cells. Each configured cell
//! shows one sensor: an icon slot on the left and the formatted value to its
//! right, styled by the value's warning tier:
//!
//! - DANGER: cell filled black, icon and text drawn white
//! - WARNING: normal colors inside a 2px border
//! - NONE: normal colors, no border
//!
//! ```text
//! x      x+4         x+icon_size+12
//! ┌──────┬───────────┬──────────────────┐ y
//! │      │   icon    │ 2500             │
//! │      │ (centred) │                  │
//! └──────┴───────────┴──────────────────┘ y+cell_h
//! ```
//!
//! Rendering is a pure function of the snapshot and the layout. Cells never
//! read each other, so their order does not matter.

use std::convert::Infallible;

use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyleBuilder, Rectangle, StrokeAlignment};
use embedded_graphics::text::{Baseline, Text};

use crate::canvas::Canvas;
use crate::config::{resolve_font, CellSpec, LayoutConfig};
use crate::format::format_value;
use crate::icon::{IconCache, IconSource};
use crate::snapshot::SensorSnapshot;
use crate::threshold::{evaluate, Polarity, WarningTier};

/// Gap between the cell's left edge and the icon
const ICON_MARGIN: i32 = 4;

/// Gap between the icon slot and the text
const TEXT_GAP: i32 = 8;

/// Warning border thickness
const WARNING_BORDER: u32 = 2;

/// Everything needed to draw one occupied cell
#[derive(Debug, Clone, PartialEq)]
pub struct CellPlan {
    /// Cell rectangle on the canvas
    pub area: Rectangle,
    pub tier: WarningTier,
    pub polarity: Polarity,
    /// Formatted value including suffix
    pub text: String,
    /// Top-left of the text, top-aligned
    pub text_origin: Point,
    /// Icon name and the top-left of its slot
    pub icon: Option<(String, Point)>,
}

/// Renders sensor snapshots onto a canvas according to a layout
pub struct GridRenderer<S> {
    layout: LayoutConfig,
    font: &'static MonoFont<'static>,
    icons: IconCache<S>,
}

impl<S: IconSource> GridRenderer<S> {
    /// Create a renderer for a validated layout
    pub fn new(layout: LayoutConfig, icons: S) -> Self {
        let font = resolve_font(&layout.display.font);
        Self {
            layout,
            font,
            icons: IconCache::new(icons),
        }
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn icons(&self) -> &IconCache<S> {
        &self.icons
    }

    /// Cell rectangle for `cell`
    pub fn cell_area(&self, cell: &CellSpec) -> Rectangle {
        let (w, h) = self.layout.display.cell_size();
        Rectangle::new(
            Point::new((cell.col * w) as i32, (cell.row * h) as i32),
            Size::new(w, h),
        )
    }

    /// Lay out one cell; `None` for a blank cell
    pub fn plan_cell(&self, cell: &CellSpec, snapshot: &SensorSnapshot) -> Option<CellPlan> {
        let sensor = cell.sensor.as_deref().filter(|s| !s.is_empty())?;
        let area = self.cell_area(cell);
        let value = snapshot.value_or_missing(sensor);

        let tier = evaluate(value, cell.thresholds.as_ref());
        let polarity = tier.polarity();
        let text = format_value(value, cell.format, &cell.suffix);

        let icon_size = self.layout.display.icon_size as i32;
        let Point { x, y } = area.top_left;
        let h = area.size.height as i32;

        let icon = cell
            .icon
            .as_ref()
            .filter(|name| !name.is_empty())
            .map(|name| {
                let icon_y = y + (h - icon_size).div_euclid(2) + cell.icon_y_offset;
                (name.clone(), Point::new(x + ICON_MARGIN, icon_y))
            });

        Some(CellPlan {
            area,
            tier,
            polarity,
            text,
            text_origin: Point::new(x + ICON_MARGIN + icon_size + TEXT_GAP, y),
            icon,
        })
    }

    /// Render a full frame
    pub fn render(&mut self, snapshot: &SensorSnapshot) -> Canvas {
        let display = &self.layout.display;
        let mut canvas = Canvas::new(display.width, display.height);

        for index in 0..self.layout.cells.len() {
            let Ok(()) = self.draw_cell(&mut canvas, index, snapshot);
        }

        canvas
    }

    fn draw_cell(
        &mut self,
        canvas: &mut Canvas,
        index: usize,
        snapshot: &SensorSnapshot,
    ) -> Result<(), Infallible> {
        let cell = &self.layout.cells[index];

        if self.layout.display.debug_borders {
            self.cell_area(cell)
                .into_styled(
                    PrimitiveStyleBuilder::new()
                        .stroke_color(BinaryColor::On)
                        .stroke_width(1)
                        .stroke_alignment(StrokeAlignment::Inside)
                        .build(),
                )
                .draw(canvas)?;
        }

        let Some(plan) = self.plan_cell(cell, snapshot) else {
            return Ok(());
        };

        match plan.tier {
            WarningTier::Danger => canvas.fill_solid(&plan.area, plan.polarity.background())?,
            WarningTier::Warning => {
                plan.area
                    .into_styled(
                        PrimitiveStyleBuilder::new()
                            .stroke_color(plan.polarity.foreground())
                            .stroke_width(WARNING_BORDER)
                            .stroke_alignment(StrokeAlignment::Inside)
                            .build(),
                    )
                    .draw(canvas)?;
            }
            WarningTier::None => {}
        }

        if let Some((name, origin)) = &plan.icon {
            let size = self.layout.display.icon_size;
            if let Some(icon) = self.icons.resolve(name, size, plan.polarity) {
                canvas.blit(icon, *origin);
            }
        }

        let style = MonoTextStyle::new(self.font, plan.polarity.foreground());
        Text::with_baseline(&plan.text, plan.text_origin, style, Baseline::Top).draw(canvas)?;

        Ok(())
    }
}
