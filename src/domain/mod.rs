//! Pure domain types with minimal dependencies
//!
//! Planar geometry, value formatting and the measurement shapes. Nothing in
//! here touches the map or drawing surfaces.

pub mod format;
pub mod geometry;
pub mod measurement;

pub use format::*;
pub use geometry::{CIRCLE_SIDES, Coord, Extent};
pub use measurement::*;
