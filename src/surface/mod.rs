//! Contracts for the map and drawing surfaces the measurement tools drive
//!
//! The map SDK, the vector layer and the UI toolkit live outside this crate.
//! The controller only talks to them through these two traits.

pub mod memory;

use std::fmt;

use anyhow::Result;
use serde::Serialize;

use crate::domain::{FeatureRole, Label, Shape};
use crate::measure::popup::Popup;

/// Handle of a feature on the drawing surface
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FeatureId(pub u64);

/// Handle of a popup overlay anchored on the map
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OverlayId(pub u64);

/// Handle of one event subscription on the map
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "feature#{}", self.0)
    }
}

/// Input a measurement session can subscribe to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventSource {
    Click,
    PointerMove,
    /// Right-click on the map
    ContextMenu,
    /// Keyboard, for Escape
    KeyDown,
    /// The native draw interaction reported a finished sketch
    DrawEnd,
}

/// A feature handed to the drawing surface
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    pub shape: Shape,
    pub role: FeatureRole,
    pub label: Option<Label>,
}

impl Feature {
    pub fn new(role: FeatureRole, shape: Shape) -> Self {
        Self {
            shape,
            role,
            label: None,
        }
    }
}

/// The map view: event subscriptions and popup overlays
pub trait MapSurface {
    /// Start delivering events of `source`
    fn listen(&mut self, source: EventSource) -> Result<ListenerId>;

    /// Stop delivering events for a subscription
    fn unlisten(&mut self, id: ListenerId) -> Result<()>;

    /// Anchor a popup on the map
    fn add_overlay(&mut self, popup: &Popup) -> Result<OverlayId>;

    fn remove_overlay(&mut self, id: OverlayId) -> Result<()>;

    /// Ask for a redraw after live geometry changed
    fn render(&mut self) {}
}

/// The vector layer measurements are drawn on
pub trait DrawingSurface {
    fn add_feature(&mut self, feature: Feature) -> Result<FeatureId>;

    fn set_geometry(&mut self, id: FeatureId, shape: Shape) -> Result<()>;

    fn set_label(&mut self, id: FeatureId, label: Option<Label>) -> Result<()>;

    fn remove_feature(&mut self, id: FeatureId) -> Result<()>;

    /// Remove every feature on the layer
    fn clear(&mut self) -> Result<()>;
}
