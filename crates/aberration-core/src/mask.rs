#![forbid(unsafe_code)]

//! Radial mask over an overlay layer.
//!
//! A painted mask is opaque out to the radius around the pointer, so the
//! fringed clone shows through only there. A cleared mask is a zero-radius,
//! fully transparent gradient: the overlay stays rendered but nothing of it
//! is visible. Pausing is a separate channel (opacity/visibility) and is not
//! expressed here.

use core::fmt;

use crate::dom::{DomHost, HostError};
use crate::geometry::Point;

/// Style properties that receive the mask value.
pub const MASK_PROPERTIES: [&str; 2] = ["mask", "-webkit-mask"];

/// Mask state of one overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaskImage {
    /// Nothing visible.
    Cleared,
    /// Visible inside `radius` around `center` (wrapper-relative).
    Spotlight { center: Point, radius: u32 },
}

impl fmt::Display for MaskImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cleared => write!(
                f,
                "radial-gradient(circle 0px at 0px 0px, transparent, transparent)"
            ),
            Self::Spotlight { center, radius } => {
                // `+ 0.0` folds negative zero so it prints as `0`.
                let x = center.x + 0.0;
                let y = center.y + 0.0;
                write!(
                    f,
                    "radial-gradient(circle {radius}px at {x}px {y}px, #000, transparent)"
                )
            }
        }
    }
}

/// Show the overlay inside `radius` around `center`.
pub fn paint_mask<H: DomHost + ?Sized>(
    host: &mut H,
    overlay: &H::Node,
    center: Point,
    radius: u32,
) -> Result<(), HostError> {
    apply_mask(host, overlay, MaskImage::Spotlight { center, radius })
}

/// Hide all overlay content without touching opacity or visibility.
pub fn clear_mask<H: DomHost + ?Sized>(host: &mut H, overlay: &H::Node) -> Result<(), HostError> {
    apply_mask(host, overlay, MaskImage::Cleared)
}

fn apply_mask<H: DomHost + ?Sized>(
    host: &mut H,
    overlay: &H::Node,
    image: MaskImage,
) -> Result<(), HostError> {
    let value = image.to_string();
    for property in MASK_PROPERTIES {
        host.set_style_property(overlay, property, &value)?;
    }
    Ok(())
}
