//! In-memory surfaces
//!
//! Record everything the controller does so tests and the replay CLI can
//! inspect the resulting map state without a real map SDK.

use std::collections::BTreeMap;

use anyhow::{Result, bail};

use super::{DrawingSurface, EventSource, Feature, FeatureId, ListenerId, MapSurface, OverlayId};
use crate::domain::{FeatureRole, Label, Shape};
use crate::measure::popup::Popup;

/// Map surface keeping subscriptions and overlays in maps
#[derive(Debug, Default)]
pub struct MemoryMap {
    next_id: u64,
    listeners: BTreeMap<ListenerId, EventSource>,
    overlays: BTreeMap<OverlayId, Popup>,
    renders: usize,
    /// Makes `add_overlay` fail, for exercising error paths
    pub fail_overlays: bool,
    /// Makes `remove_overlay` fail and leave the overlay in place
    pub fail_removals: bool,
}

impl MemoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Number of live subscriptions for one source
    pub fn listeners_for(&self, source: EventSource) -> usize {
        self.listeners.values().filter(|s| **s == source).count()
    }

    pub fn is_listening(&self, source: EventSource) -> bool {
        self.listeners_for(source) > 0
    }

    pub fn overlays(&self) -> impl Iterator<Item = (&OverlayId, &Popup)> {
        self.overlays.iter()
    }

    pub fn overlay(&self, id: OverlayId) -> Option<&Popup> {
        self.overlays.get(&id)
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    pub fn render_count(&self) -> usize {
        self.renders
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl MapSurface for MemoryMap {
    fn listen(&mut self, source: EventSource) -> Result<ListenerId> {
        let id = ListenerId(self.next());
        self.listeners.insert(id, source);
        Ok(id)
    }

    fn unlisten(&mut self, id: ListenerId) -> Result<()> {
        if self.listeners.remove(&id).is_none() {
            bail!("listener {:?} is not registered", id);
        }
        Ok(())
    }

    fn add_overlay(&mut self, popup: &Popup) -> Result<OverlayId> {
        if self.fail_overlays {
            bail!("overlay container is unavailable");
        }
        let id = OverlayId(self.next());
        self.overlays.insert(id, popup.clone());
        Ok(id)
    }

    fn remove_overlay(&mut self, id: OverlayId) -> Result<()> {
        if self.fail_removals {
            bail!("overlay container rejected removal of {:?}", id);
        }
        if self.overlays.remove(&id).is_none() {
            bail!("overlay {:?} is not on the map", id);
        }
        Ok(())
    }

    fn render(&mut self) {
        self.renders += 1;
    }
}

/// Drawing surface keeping features in a map
#[derive(Debug, Default)]
pub struct MemoryCanvas {
    next_id: u64,
    features: BTreeMap<FeatureId, Feature>,
    /// Makes `set_geometry` and `set_label` fail, for exercising error paths
    pub fail_updates: bool,
}

impl MemoryCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feature(&self, id: FeatureId) -> Option<&Feature> {
        self.features.get(&id)
    }

    pub fn features(&self) -> impl Iterator<Item = (&FeatureId, &Feature)> {
        self.features.iter()
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Features with the given role, in insertion order
    pub fn with_role(&self, role: FeatureRole) -> Vec<&Feature> {
        self.features.values().filter(|f| f.role == role).collect()
    }

    fn get_mut(&mut self, id: FeatureId) -> Result<&mut Feature> {
        match self.features.get_mut(&id) {
            Some(feature) => Ok(feature),
            None => bail!("{} is not on the layer", id),
        }
    }
}

impl DrawingSurface for MemoryCanvas {
    fn add_feature(&mut self, feature: Feature) -> Result<FeatureId> {
        self.next_id += 1;
        let id = FeatureId(self.next_id);
        self.features.insert(id, feature);
        Ok(id)
    }

    fn set_geometry(&mut self, id: FeatureId, shape: Shape) -> Result<()> {
        if self.fail_updates {
            bail!("layer rejected geometry update of {}", id);
        }
        self.get_mut(id)?.shape = shape;
        Ok(())
    }

    fn set_label(&mut self, id: FeatureId, label: Option<Label>) -> Result<()> {
        if self.fail_updates {
            bail!("layer rejected label update of {}", id);
        }
        self.get_mut(id)?.label = label;
        Ok(())
    }

    fn remove_feature(&mut self, id: FeatureId) -> Result<()> {
        if self.features.remove(&id).is_none() {
            bail!("{} is not on the layer", id);
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.features.clear();
        Ok(())
    }
}
