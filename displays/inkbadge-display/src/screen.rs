//! Receiver screens
//!
//! Everything the badge draws on its own: the start-up waiting message, the
//! large-text legacy scalar screen, and the paint routine that turns a
//! decoded image frame into pixels.

use embedded_graphics::mono_font::ascii::FONT_10X20;
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use inkbadge_protocol::PackedBitmap;
use profont::PROFONT_24_POINT;

/// Message shown until the first frame arrives
pub const WAITING_TEXT: &str = "Waiting for data...";

/// Title of the legacy scalar screen
pub const LEGACY_TITLE: &str = "Room CO2 Level";

/// Unit label of the legacy scalar screen
pub const LEGACY_UNIT: &str = "ppm";

const LABEL_FONT: &MonoFont<'static> = &FONT_10X20;
const VALUE_FONT: &MonoFont<'static> = &PROFONT_24_POINT;

fn draw_label<D>(
    display: &mut D,
    text: &str,
    x: i32,
    y: i32,
    font: &MonoFont<'_>,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let style = MonoTextStyle::new(font, BinaryColor::On);
    Text::with_baseline(text, Point::new(x, y), style, Baseline::Top).draw(display)?;
    Ok(())
}

/// Draw the start-up screen
pub fn draw_waiting<D>(display: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    display.clear(BinaryColor::Off)?;
    draw_label(display, WAITING_TEXT, 10, 55, LABEL_FONT)
}

/// Draw the legacy scalar screen for `value`
pub fn draw_legacy<D>(display: &mut D, value: &str) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    display.clear(BinaryColor::Off)?;
    draw_label(display, LEGACY_TITLE, 10, 10, LABEL_FONT)?;
    draw_label(display, value, 30, 50, VALUE_FONT)?;
    draw_label(display, LEGACY_UNIT, 30, 90, LABEL_FONT)
}

/// Paint a packed image onto the display
///
/// Clears to paper, then inks every pixel whose wire bit is clear. The
/// bitmap is read against its own geometry; pixels outside the display are
/// clipped by the draw target.
pub fn paint_image<D>(display: &mut D, image: PackedBitmap<'_>) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    display.clear(BinaryColor::Off)?;
    display.draw_iter(
        image
            .painted_pixels()
            .map(|(x, y)| Pixel(Point::new(x as i32, y as i32), BinaryColor::On)),
    )
}
