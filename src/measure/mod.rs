//! Measurement tools
//!
//! This module contains:
//! - Per-kind tool descriptions
//! - Result popups
//! - The registry of finished measurements
//! - The controller applying session effects to the surfaces

pub mod handlers;
pub mod popup;
pub mod registry;
pub mod tool;
