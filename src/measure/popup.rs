//! Result popups
//!
//! A popup is a small card anchored on the map showing the measurement kind,
//! its formatted value and close/delete buttons.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::PopupTitles;
use crate::domain::{Coord, MeasureKind};
use crate::measure::registry::MeasurementId;
use crate::surface::{MapSurface, OverlayId};

/// Pixel offset of the card above its anchor
pub const POPUP_OFFSET: (i32, i32) = (0, -10);

/// Everything an overlay needs to draw one result card
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Popup {
    /// Measurement the close/delete buttons act on
    pub measurement: MeasurementId,
    pub kind: MeasureKind,
    pub title: String,
    pub value: String,
    pub anchor: Coord,
    pub offset: (i32, i32),
    /// Pointer input on the card must not reach the map
    pub stop_event: bool,
}

/// Creates and removes popup overlays on a map surface
#[derive(Clone, Debug, Default)]
pub struct PopupPresenter {
    titles: PopupTitles,
}

impl PopupPresenter {
    pub fn new(titles: PopupTitles) -> Self {
        Self { titles }
    }

    /// Build the popup for a measurement without showing it
    pub fn build(
        &self,
        measurement: MeasurementId,
        kind: MeasureKind,
        value: &str,
        anchor: Coord,
    ) -> Popup {
        Popup {
            measurement,
            kind,
            title: self.titles.title(kind).to_string(),
            value: value.to_string(),
            anchor,
            offset: POPUP_OFFSET,
            stop_event: true,
        }
    }

    /// Anchor a popup for a measurement on the map
    pub fn present<M: MapSurface + ?Sized>(
        &self,
        map: &mut M,
        measurement: MeasurementId,
        kind: MeasureKind,
        value: &str,
        anchor: Coord,
    ) -> Result<OverlayId> {
        let popup = self.build(measurement, kind, value, anchor);
        let id = map
            .add_overlay(&popup)
            .with_context(|| format!("Failed to show popup for {}", measurement))?;
        log::debug!("Popup for {} shown: {} - {}", measurement, popup.title, popup.value);
        Ok(id)
    }

    /// Remove the card only; the measured shape stays
    pub fn close<M: MapSurface + ?Sized>(&self, map: &mut M, overlay: OverlayId) -> Result<()> {
        map.remove_overlay(overlay)
            .context("Failed to remove popup overlay")
    }
}
