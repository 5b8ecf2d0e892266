//! Rectangular area selection
//!
//! Two clicks span a rectangle: the first fixes a corner, pointer moves
//! redraw a preview, the second click fixes the opposite corner. The result is
//! a normalized `Extent` ready for capture. Like the measurement reducer this
//! is a pure state transition; the controller applies the effects.

use crate::domain::{Coord, Extent, Shape};
use crate::session::messages::MeasureEvent;
use crate::surface::EventSource;

const SELECTING_SOURCES: &[EventSource] = &[
    EventSource::Click,
    EventSource::PointerMove,
    EventSource::ContextMenu,
    EventSource::KeyDown,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionState {
    AwaitingFirstCorner,
    AwaitingSecondCorner,
    Selected,
    Cancelled,
}

impl SelectionState {
    pub fn is_selecting(&self) -> bool {
        matches!(
            self,
            SelectionState::AwaitingFirstCorner | SelectionState::AwaitingSecondCorner
        )
    }
}

/// Surface work requested by the selection reducer
#[derive(Clone, Debug, PartialEq)]
pub enum SelectionEffect {
    /// Add or move the dashed preview rectangle
    ShowPreview(Shape),
    HidePreview,
    /// Selection finished with this extent
    Select(Extent),
    Render,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AreaSelection {
    pub state: SelectionState,
    /// Corner fixed by the first click
    pub start: Option<Coord>,
}

impl Default for AreaSelection {
    fn default() -> Self {
        Self::new()
    }
}

impl AreaSelection {
    pub fn new() -> Self {
        Self {
            state: SelectionState::AwaitingFirstCorner,
            start: None,
        }
    }

    pub fn listened_sources(&self) -> &'static [EventSource] {
        if self.state.is_selecting() {
            SELECTING_SOURCES
        } else {
            &[]
        }
    }

    pub fn is_finished(&self) -> bool {
        !self.state.is_selecting()
    }
}

/// Advance `selection` by one map event
pub fn handle_selection_event(
    mut selection: AreaSelection,
    event: MeasureEvent,
) -> (AreaSelection, Vec<SelectionEffect>) {
    let mut effects = Vec::new();

    match (selection.state, event) {
        (SelectionState::AwaitingFirstCorner, MeasureEvent::Click(p)) => {
            selection.start = Some(p);
            selection.state = SelectionState::AwaitingSecondCorner;
        }
        (SelectionState::AwaitingSecondCorner, MeasureEvent::PointerMove(p)) => {
            if let Some(start) = selection.start {
                let extent = Extent::from_corners(start, p);
                effects.push(SelectionEffect::ShowPreview(Shape::Polygon(extent.ring())));
                effects.push(SelectionEffect::Render);
            }
        }
        (SelectionState::AwaitingSecondCorner, MeasureEvent::Click(p)) => {
            let Some(start) = selection.start else {
                return (selection, effects);
            };
            let extent = Extent::from_corners(start, p);
            if extent.is_empty() {
                log::debug!("Selection corner {:?} spans no area, still waiting", p);
                return (selection, effects);
            }
            selection.state = SelectionState::Selected;
            effects.push(SelectionEffect::HidePreview);
            effects.push(SelectionEffect::Select(extent));
            effects.push(SelectionEffect::Render);
        }
        (state, MeasureEvent::Cancel) if state.is_selecting() => {
            selection.state = SelectionState::Cancelled;
            selection.start = None;
            effects.push(SelectionEffect::HidePreview);
            effects.push(SelectionEffect::Render);
        }
        _ => {
            log::trace!("{:?} in {:?}: ignored", event, selection.state);
        }
    }

    (selection, effects)
}
