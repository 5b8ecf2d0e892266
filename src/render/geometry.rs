//! Shared geometry calculations for measurement rendering
//!
//! Map coordinates are projected metres with y pointing north; pixel
//! coordinates have their origin top-left with y pointing down.

use crate::domain::{Coord, Extent};

/// Measured shape constants
pub mod shape {
    /// Ellipse bezier approximation constant: 4/3 * (sqrt(2) - 1)
    pub const BEZIER_K: f32 = 0.552_284_8;
    /// Dark halo drawn under strokes so they read on any basemap
    pub const SHADOW_ALPHA: u8 = 160;
    /// Extra halo width on each side of a stroke in pixels
    pub const OUTLINE: f32 = 1.5;
}

/// Maps an extent of the map onto a pixel grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    origin: Coord,
    scale_x: f64,
    scale_y: f64,
}

impl ViewTransform {
    /// Stretch `extent` over a `width` x `height` image
    ///
    /// Returns `None` for an empty extent or image.
    pub fn new(extent: &Extent, width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 || extent.width() <= 0.0 || extent.height() <= 0.0 {
            return None;
        }
        Some(Self {
            origin: Coord::new(extent.min_x, extent.max_y),
            scale_x: f64::from(width) / extent.width(),
            scale_y: f64::from(height) / extent.height(),
        })
    }

    /// Pixel position of a map coordinate
    #[inline]
    pub fn to_pixel(&self, c: Coord) -> (f32, f32) {
        (
            ((c.x - self.origin.x) * self.scale_x) as f32,
            ((self.origin.y - c.y) * self.scale_y) as f32,
        )
    }

    /// Pixel radii of a map distance; differ when the aspect is not kept
    #[inline]
    pub fn to_pixel_radii(&self, distance: f64) -> (f32, f32) {
        (
            (distance * self.scale_x) as f32,
            (distance * self.scale_y) as f32,
        )
    }
}
