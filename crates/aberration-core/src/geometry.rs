#![forbid(unsafe_code)]

//! Geometric primitives in CSS pixel space.

/// A point in viewport (client) coordinates, or relative to a wrapper once
/// translated with [`Rect::local`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A bounding client rectangle, as reported by `getBoundingClientRect()`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge in viewport coordinates.
    pub left: f64,
    /// Top edge in viewport coordinates.
    pub top: f64,
    /// Width in CSS pixels.
    pub width: f64,
    /// Height in CSS pixels.
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Translate a viewport point into this rectangle's local space, with the
    /// origin at the top-left corner.
    #[inline]
    pub fn local(&self, client: Point) -> Point {
        Point::new(client.x - self.left, client.y - self.top)
    }

    /// Check whether a local point lies inside the rectangle.
    ///
    /// All four edges are inclusive, so a pointer resting exactly on the
    /// right or bottom border still counts as inside.
    #[inline]
    pub fn contains_local(&self, local: Point) -> bool {
        !(local.x < 0.0 || local.y < 0.0 || local.x > self.width || local.y > self.height)
    }
}
