//! Message types for measurement sessions
//!
//! This module contains:
//! - MeasureEvent: map input a running session reacts to
//! - MeasureMsg: everything the controller accepts, tool switches included

use crate::domain::{Coord, MeasureKind};
use crate::measure::registry::MeasurementId;
use crate::surface::EventSource;

// ============================================================================
// Session events
// ============================================================================

/// Map input delivered to the active session
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeasureEvent {
    /// Primary click at a map coordinate
    Click(Coord),
    /// Pointer moved over the map
    PointerMove(Coord),
    /// Escape or right-click
    Cancel,
    /// Native draw interaction finished its sketch (double-click)
    DrawEnd,
}

impl MeasureEvent {
    /// Subscriptions that deliver this event; any one of them is enough
    pub fn sources(&self) -> &'static [EventSource] {
        match self {
            MeasureEvent::Click(_) => &[EventSource::Click],
            MeasureEvent::PointerMove(_) => &[EventSource::PointerMove],
            MeasureEvent::Cancel => &[EventSource::KeyDown, EventSource::ContextMenu],
            MeasureEvent::DrawEnd => &[EventSource::DrawEnd],
        }
    }
}

// ============================================================================
// Controller messages
// ============================================================================

/// All measurement messages
#[derive(Debug, Clone, PartialEq)]
pub enum MeasureMsg {
    /// Start a tool, tearing down whatever session is running
    Start(MeasureKind),
    /// Forward map input to the running session
    Event(MeasureEvent),
    /// Popup close button: hide the popup, keep the shape
    ClosePopup(MeasurementId),
    /// Popup delete button: remove popup and shape
    Delete(MeasurementId),
    /// Remove every measurement and stop the running tool
    Clear,
    /// Start a two-click rectangle selection, replacing the previous one
    SelectArea,
    /// Remove the selected rectangle
    ClearSelection,
}

impl MeasureMsg {
    pub fn start(kind: MeasureKind) -> Self {
        Self::Start(kind)
    }

    pub fn click(x: f64, y: f64) -> Self {
        Self::Event(MeasureEvent::Click(Coord::new(x, y)))
    }

    pub fn pointer_move(x: f64, y: f64) -> Self {
        Self::Event(MeasureEvent::PointerMove(Coord::new(x, y)))
    }

    pub fn cancel() -> Self {
        Self::Event(MeasureEvent::Cancel)
    }

    pub fn draw_end() -> Self {
        Self::Event(MeasureEvent::DrawEnd)
    }

    pub fn close_popup(id: MeasurementId) -> Self {
        Self::ClosePopup(id)
    }

    pub fn delete(id: MeasurementId) -> Self {
        Self::Delete(id)
    }

    pub fn clear() -> Self {
        Self::Clear
    }

    pub fn select_area() -> Self {
        Self::SelectArea
    }

    pub fn clear_selection() -> Self {
        Self::ClearSelection
    }
}
