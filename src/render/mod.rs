//! Measurement rendering module
//!
//! This module contains:
//! - The extent to pixel transform and drawing constants
//! - Image rendering using tiny-skia (for area captures)

pub mod geometry;
pub mod image;
