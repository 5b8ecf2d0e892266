//! Interactive measurement tools for map front-ends
//!
//! Distance, area, radius and angle measurements driven by map input, with
//! result popups and a registry of finished measurements. A two-click area
//! selection picks the region to capture. The map and the drawing layer are
//! reached through the traits in [`surface`].

pub mod config;
pub mod domain;
pub mod measure;
pub mod render;
pub mod replay;
pub mod session;
pub mod surface;
