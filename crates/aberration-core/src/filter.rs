#![forbid(unsafe_code)]

//! Color-fringe filter construction.
//!
//! The fringe is a stack of `drop-shadow()` layers, each offset by the shadow
//! size and tinted with one palette color:
//! - two colors: right (`+s, 0`) and left (`-s, 0`),
//! - three colors: right, left, and down (`0, +s`).
//!
//! Every layer blurs by the same shadow size.

use core::fmt;

use crate::settings::Palette;

/// One `drop-shadow()` filter function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropShadow<'a> {
    pub dx: i64,
    pub dy: i64,
    pub blur: u32,
    pub color: &'a str,
}

impl fmt::Display for DropShadow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "drop-shadow(")?;
        write_length(f, self.dx)?;
        write!(f, " ")?;
        write_length(f, self.dy)?;
        write!(f, " {}px {})", self.blur, self.color)
    }
}

// Zero offsets are unitless.
fn write_length(f: &mut fmt::Formatter<'_>, value: i64) -> fmt::Result {
    if value == 0 {
        write!(f, "0")
    } else {
        write!(f, "{value}px")
    }
}

/// The shadow layers for `palette`, in paint order.
#[must_use]
pub fn filter_layers(shadow_size: u32, palette: &Palette) -> Vec<DropShadow<'_>> {
    let size = i64::from(shadow_size);
    match palette {
        Palette::Two { left, right } => vec![
            layer(size, 0, shadow_size, left),
            layer(-size, 0, shadow_size, right),
        ],
        Palette::Three { red, green, blue } => vec![
            layer(size, 0, shadow_size, red),
            layer(-size, 0, shadow_size, green),
            layer(0, size, shadow_size, blue),
        ],
    }
}

const fn layer(dx: i64, dy: i64, blur: u32, color: &str) -> DropShadow<'_> {
    DropShadow {
        dx,
        dy,
        blur,
        color,
    }
}

/// The CSS `filter` value for the overlay layer.
#[must_use]
pub fn build_filter(shadow_size: u32, palette: &Palette) -> String {
    filter_layers(shadow_size, palette)
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
