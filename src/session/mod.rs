//! Measurement session management module
//!
//! This module contains:
//! - Session state and its reducer
//! - Rectangular area selection
//! - Message types for measurement interactions
//! - Keyboard and pointer shortcuts

pub mod messages;
pub mod selection;
pub mod shortcuts;
pub mod state;
