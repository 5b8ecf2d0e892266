//! Registry of finished measurements
//!
//! Every measurement that is still on the map has exactly one entry here.
//! The registry owns popup lifecycles and removes features from the drawing
//! surface together with its own bookkeeping.

use std::fmt;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Local};
use serde::Serialize;

use super::popup::PopupPresenter;
use crate::domain::{Coord, MeasureKind, Shape};
use crate::surface::{DrawingSurface, FeatureId, MapSurface, OverlayId};

/// Identifier of a finished measurement
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MeasurementId(pub u64);

impl fmt::Display for MeasurementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "measurement#{}", self.0)
    }
}

/// One finished measurement on the map
#[derive(Clone, Debug, Serialize)]
pub struct RegistryEntry {
    pub id: MeasurementId,
    pub kind: MeasureKind,
    pub shape: Shape,
    pub value: String,
    pub anchor: Coord,
    /// The measured shape on the drawing surface
    pub feature: FeatureId,
    /// Helper features removed together with the shape (radius center)
    pub linked: Vec<FeatureId>,
    /// `None` while the popup is closed
    pub popup: Option<OverlayId>,
    pub created_at: DateTime<Local>,
}

impl RegistryEntry {
    /// Every feature this entry owns on the drawing surface
    pub fn features(&self) -> impl Iterator<Item = FeatureId> + '_ {
        std::iter::once(self.feature).chain(self.linked.iter().copied())
    }
}

#[derive(Debug, Default)]
pub struct MeasurementRegistry {
    entries: Vec<RegistryEntry>,
    next_id: u64,
}

impl MeasurementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the id for the next entry
    pub fn next_id(&mut self) -> MeasurementId {
        self.next_id += 1;
        MeasurementId(self.next_id)
    }

    pub fn add(&mut self, entry: RegistryEntry) {
        log::info!("{} registered: {:?} {}", entry.id, entry.kind, entry.value);
        self.entries.push(entry);
    }

    pub fn get(&self, id: MeasurementId) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get_mut(&mut self, id: MeasurementId) -> Result<&mut RegistryEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| anyhow!("{} is not registered", id))
    }

    /// Hide the popup of a measurement, keeping its shape
    ///
    /// Returns whether a popup was open.
    pub fn close_popup<M: MapSurface + ?Sized>(
        &mut self,
        id: MeasurementId,
        map: &mut M,
        presenter: &PopupPresenter,
    ) -> Result<bool> {
        let entry = self.get_mut(id)?;
        let Some(overlay) = entry.popup else {
            return Ok(false);
        };
        // Still on the map if removal failed, so the entry keeps tracking it
        presenter.close(map, overlay)?;
        entry.popup = None;
        Ok(true)
    }

    /// Show the popup of a measurement again; never stacks a second card
    ///
    /// Returns whether a popup was created.
    pub fn reopen_popup<M: MapSurface + ?Sized>(
        &mut self,
        id: MeasurementId,
        map: &mut M,
        presenter: &PopupPresenter,
    ) -> Result<bool> {
        let entry = self.get_mut(id)?;
        if entry.popup.is_some() {
            return Ok(false);
        }
        let overlay = presenter.present(map, entry.id, entry.kind, &entry.value, entry.anchor)?;
        entry.popup = Some(overlay);
        Ok(true)
    }

    /// Remove a measurement with its popup and every feature it owns
    ///
    /// The entry is gone afterwards even when a surface call fails; the first
    /// failure is returned once everything else has been attempted.
    pub fn remove<M, D>(
        &mut self,
        id: MeasurementId,
        map: &mut M,
        canvas: &mut D,
    ) -> Result<Option<RegistryEntry>>
    where
        M: MapSurface + ?Sized,
        D: DrawingSurface + ?Sized,
    {
        let Some(index) = self.entries.iter().position(|e| e.id == id) else {
            return Ok(None);
        };
        let entry = self.entries.remove(index);
        let mut first_err = None;

        if let Some(overlay) = entry.popup
            && let Err(err) = map.remove_overlay(overlay)
        {
            first_err.get_or_insert(err);
        }
        for feature in entry.features() {
            if let Err(err) = canvas.remove_feature(feature) {
                first_err.get_or_insert(err);
            }
        }

        log::info!("{} removed", id);
        match first_err {
            Some(err) => Err(err.context(format!("Failed to fully remove {}", id))),
            None => Ok(Some(entry)),
        }
    }

    /// Remove every popup and tracked feature and empty the registry
    pub fn clear<M, D>(&mut self, map: &mut M, canvas: &mut D) -> Result<()>
    where
        M: MapSurface + ?Sized,
        D: DrawingSurface + ?Sized,
    {
        let mut first_err = None;
        for entry in self.entries.drain(..) {
            if let Some(overlay) = entry.popup
                && let Err(err) = map.remove_overlay(overlay)
            {
                first_err.get_or_insert(err);
            }
            for feature in entry.features() {
                if let Err(err) = canvas.remove_feature(feature) {
                    first_err.get_or_insert(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err.context("Failed to clear every measurement")),
            None => Ok(()),
        }
    }
}
