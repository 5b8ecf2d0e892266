//! Measurement controller
//!
//! Handles MeasureMsg: runs the session reducer and applies its effects to
//! the map and drawing surfaces. Subscriptions are derived from the session
//! state after every step, so a session can never leave a listener behind.
//! Area selection runs through the same loop with its own reducer.

use anyhow::{Result, bail};
use chrono::Local;
use image::RgbaImage;

use super::popup::PopupPresenter;
use super::registry::{MeasurementId, MeasurementRegistry, RegistryEntry};
use super::tool::ToolSpec;
use crate::config::MeasureConfig;
use crate::domain::{Extent, FeatureRole, MeasureKind, MeasureState, Shape};
use crate::render::image::capture_extent;
use crate::session::messages::{MeasureEvent, MeasureMsg};
use crate::session::selection::{AreaSelection, SelectionEffect, handle_selection_event};
use crate::session::state::{Effect, Session, handle_event};
use crate::surface::{DrawingSurface, EventSource, Feature, FeatureId, ListenerId, MapSurface};

/// The running session together with the surface handles it owns
#[derive(Debug)]
struct ActiveSession {
    spec: ToolSpec,
    session: Session,
    sketch: Option<FeatureId>,
    aux: Vec<(FeatureRole, FeatureId)>,
    listeners: Vec<(EventSource, ListenerId)>,
    /// Measurement produced by this session, once finalized
    result: Option<MeasurementId>,
}

impl ActiveSession {
    fn new(spec: ToolSpec) -> Self {
        Self {
            session: Session::new(spec.kind),
            spec,
            sketch: None,
            aux: Vec::new(),
            listeners: Vec::new(),
            result: None,
        }
    }

    fn accepts(&self, event: &MeasureEvent) -> bool {
        subscribed(&self.listeners, event)
    }

    fn take_aux(&mut self, role: FeatureRole) -> Option<FeatureId> {
        let index = self.aux.iter().position(|(r, _)| *r == role)?;
        Some(self.aux.remove(index).1)
    }
}

/// A running area selection and its preview rectangle
#[derive(Debug, Default)]
struct ActiveSelection {
    selection: AreaSelection,
    preview: Option<FeatureId>,
    listeners: Vec<(EventSource, ListenerId)>,
}

fn subscribed(listeners: &[(EventSource, ListenerId)], event: &MeasureEvent) -> bool {
    event
        .sources()
        .iter()
        .any(|source| listeners.iter().any(|(s, _)| s == source))
}

fn drop_listeners<M: MapSurface>(map: &mut M, listeners: &mut Vec<(EventSource, ListenerId)>) {
    for (source, id) in listeners.drain(..) {
        if let Err(err) = map.unlisten(id) {
            log::warn!("Failed to drop {:?} listener: {:#}", source, err);
        }
    }
}

/// Make `listeners` match `wanted`, releasing everything on any difference
fn reconcile_listeners<M: MapSurface>(
    map: &mut M,
    listeners: &mut Vec<(EventSource, ListenerId)>,
    wanted: &[EventSource],
) {
    if listeners.iter().map(|(s, _)| s).eq(wanted.iter()) {
        return;
    }
    drop_listeners(map, listeners);
    for &source in wanted {
        match map.listen(source) {
            Ok(id) => listeners.push((source, id)),
            Err(err) => log::error!("Failed to listen for {:?}: {:#}", source, err),
        }
    }
}

/// Drives the measurement tools over a map and a drawing surface
pub struct MeasureController<M: MapSurface, D: DrawingSurface> {
    map: M,
    canvas: D,
    config: MeasureConfig,
    presenter: PopupPresenter,
    registry: MeasurementRegistry,
    active: Option<ActiveSession>,
    selecting: Option<ActiveSelection>,
    /// Finished selection and the rectangle showing it
    selected: Option<(Extent, FeatureId)>,
}

impl<M: MapSurface, D: DrawingSurface> MeasureController<M, D> {
    pub fn new(map: M, canvas: D, config: MeasureConfig) -> Self {
        let presenter = PopupPresenter::new(config.titles.clone());
        Self {
            map,
            canvas,
            config,
            presenter,
            registry: MeasurementRegistry::new(),
            active: None,
            selecting: None,
            selected: None,
        }
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn canvas(&self) -> &D {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut D {
        &mut self.canvas
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn config(&self) -> &MeasureConfig {
        &self.config
    }

    pub fn registry(&self) -> &MeasurementRegistry {
        &self.registry
    }

    /// Kind and state of the running session, if any
    pub fn active(&self) -> Option<(MeasureKind, MeasureState)> {
        self.active
            .as_ref()
            .map(|a| (a.session.kind, a.session.state))
    }

    /// Whether a session or an area selection is still collecting points
    pub fn is_drawing(&self) -> bool {
        self.is_selecting()
            || self
                .active
                .as_ref()
                .is_some_and(|a| a.session.state.is_drawing())
    }

    pub fn is_selecting(&self) -> bool {
        self.selecting.is_some()
    }

    /// Extent of the last finished area selection
    pub fn selected_extent(&self) -> Option<Extent> {
        self.selected.map(|(extent, _)| extent)
    }

    /// Handle a MeasureMsg
    ///
    /// Failures are logged; a broken surface call never stops the tool.
    pub fn handle_msg(&mut self, msg: MeasureMsg) {
        let result = match msg {
            MeasureMsg::Start(kind) => {
                self.start(kind);
                Ok(())
            }
            MeasureMsg::Event(event) => {
                self.handle_event(event);
                Ok(())
            }
            MeasureMsg::ClosePopup(id) => self.close_popup(id).map(|_| ()),
            MeasureMsg::Delete(id) => self.delete(id).map(|_| ()),
            MeasureMsg::Clear => self.clear(),
            MeasureMsg::SelectArea => {
                self.select_area();
                Ok(())
            }
            MeasureMsg::ClearSelection => self.clear_selection().map(|_| ()),
        };
        if let Err(err) = result {
            log::error!("Measurement message failed: {:#}", err);
        }
    }

    /// Start a tool; the running session is torn down first
    pub fn start(&mut self, kind: MeasureKind) {
        self.teardown_active();
        self.teardown_selecting();
        if self.config.clear_completed_on_start
            && let Err(err) = self.registry.clear(&mut self.map, &mut self.canvas)
        {
            log::error!("Failed to clear measurements: {:#}", err);
        }

        let mut active = ActiveSession::new(ToolSpec::for_kind(kind, &self.config));
        self.sync_listeners(&mut active);
        log::debug!("{:?} tool started", kind);
        self.active = Some(active);
    }

    /// Feed one map event to the running session or selection
    pub fn handle_event(&mut self, event: MeasureEvent) {
        if self.selecting.is_some() {
            self.handle_selection(event);
            return;
        }
        let Some(mut active) = self.active.take() else {
            return;
        };
        if !active.accepts(&event) {
            log::trace!("{:?} dropped: not subscribed", event);
            self.active = Some(active);
            return;
        }

        let previous = active.session.state;
        let (session, effects) = handle_event(active.session.clone(), event, &active.spec);
        active.session = session;
        if previous != active.session.state {
            log::debug!(
                "{:?}: {:?} -> {:?}",
                active.spec.kind,
                previous,
                active.session.state
            );
        }

        for effect in effects {
            if let Err(err) = self.apply(&mut active, effect) {
                log::error!("{:?} measurement: {:#}", active.spec.kind, err);
            }
        }
        self.sync_listeners(&mut active);

        if !active.session.is_finished() {
            self.active = Some(active);
        }
    }

    /// Hide a popup, keeping the measured shape
    pub fn close_popup(&mut self, id: MeasurementId) -> Result<bool> {
        self.registry
            .close_popup(id, &mut self.map, &self.presenter)
    }

    /// Remove a measurement, its popup and its features
    pub fn delete(&mut self, id: MeasurementId) -> Result<bool> {
        if let Some(active) = self.active.as_mut()
            && active.result == Some(id)
        {
            active.result = None;
        }
        let removed = self.registry.remove(id, &mut self.map, &mut self.canvas)?;
        Ok(removed.is_some())
    }

    /// Stop the running tool and remove every measurement and the selection
    pub fn clear(&mut self) -> Result<()> {
        self.teardown_active();
        self.teardown_selecting();
        self.registry.clear(&mut self.map, &mut self.canvas)?;
        self.canvas.clear()?;
        self.selected = None;
        self.map.render();
        Ok(())
    }

    /// Start a two-click rectangle selection
    ///
    /// The running measurement stops and the previous rectangle is removed;
    /// finished measurements stay.
    pub fn select_area(&mut self) {
        self.teardown_active();
        self.teardown_selecting();
        if let Err(err) = self.clear_selection() {
            log::error!("Failed to remove previous selection: {:#}", err);
        }

        let mut selecting = ActiveSelection::default();
        reconcile_listeners(
            &mut self.map,
            &mut selecting.listeners,
            selecting.selection.listened_sources(),
        );
        log::debug!("Area selection started");
        self.selecting = Some(selecting);
    }

    /// Remove the selected rectangle; `false` if nothing was selected
    pub fn clear_selection(&mut self) -> Result<bool> {
        let Some((_, feature)) = self.selected else {
            return Ok(false);
        };
        self.canvas.remove_feature(feature)?;
        self.selected = None;
        self.map.render();
        Ok(true)
    }

    /// Rasterise the measurements inside the selected area
    pub fn capture_selection(&self, width: u32, height: u32) -> Result<RgbaImage> {
        let Some(extent) = self.selected_extent() else {
            bail!("No area selected");
        };
        capture_extent(
            self.registry.entries(),
            &extent,
            width,
            height,
            &self.config.style,
        )
    }

    fn handle_selection(&mut self, event: MeasureEvent) {
        let Some(mut selecting) = self.selecting.take() else {
            return;
        };
        if !subscribed(&selecting.listeners, &event) {
            log::trace!("{:?} dropped: not subscribed", event);
            self.selecting = Some(selecting);
            return;
        }

        let (selection, effects) = handle_selection_event(selecting.selection.clone(), event);
        selecting.selection = selection;
        for effect in effects {
            if let Err(err) = self.apply_selection(&mut selecting, effect) {
                log::error!("Area selection: {:#}", err);
            }
        }

        if selecting.selection.is_finished() {
            log::debug!("Area selection {:?}", selecting.selection.state);
            self.release_selection(selecting);
        } else {
            self.selecting = Some(selecting);
        }
    }

    fn apply_selection(
        &mut self,
        selecting: &mut ActiveSelection,
        effect: SelectionEffect,
    ) -> Result<()> {
        match effect {
            SelectionEffect::ShowPreview(shape) => match selecting.preview {
                Some(id) => self.canvas.set_geometry(id, shape)?,
                None => {
                    let id = self
                        .canvas
                        .add_feature(Feature::new(FeatureRole::SelectionPreview, shape))?;
                    selecting.preview = Some(id);
                }
            },
            SelectionEffect::HidePreview => {
                if let Some(id) = selecting.preview {
                    self.canvas.remove_feature(id)?;
                    selecting.preview = None;
                }
            }
            SelectionEffect::Select(extent) => {
                let shape = Shape::Polygon(extent.ring());
                // A rectangle that failed to go away earlier is reused
                let feature = match self.selected {
                    Some((_, id)) => {
                        self.canvas.set_geometry(id, shape)?;
                        id
                    }
                    None => self
                        .canvas
                        .add_feature(Feature::new(FeatureRole::Selection, shape))?,
                };
                self.selected = Some((extent, feature));
                log::info!(
                    "Selected area {},{} to {},{}",
                    extent.min_x,
                    extent.min_y,
                    extent.max_x,
                    extent.max_y
                );
            }
            SelectionEffect::Render => self.map.render(),
        }
        Ok(())
    }

    /// Stop a running selection, keeping any finished one
    fn teardown_selecting(&mut self) {
        if let Some(selecting) = self.selecting.take() {
            self.release_selection(selecting);
        }
    }

    fn release_selection(&mut self, mut selecting: ActiveSelection) {
        drop_listeners(&mut self.map, &mut selecting.listeners);
        if let Some(preview) = selecting.preview.take()
            && let Err(err) = self.canvas.remove_feature(preview)
        {
            log::warn!("Failed to remove selection preview {}: {:#}", preview, err);
        }
    }

    /// Release the running session: listeners, sketch and helpers
    ///
    /// Finished measurements stay registered.
    fn teardown_active(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        self.release_listeners(&mut active);
        if let Some(sketch) = active.sketch.take()
            && let Err(err) = self.canvas.remove_feature(sketch)
        {
            log::warn!("Failed to remove sketch {}: {:#}", sketch, err);
        }
        for (_, feature) in active.aux.drain(..) {
            if let Err(err) = self.canvas.remove_feature(feature) {
                log::warn!("Failed to remove helper {}: {:#}", feature, err);
            }
        }
        log::debug!("{:?} tool stopped", active.spec.kind);
    }

    fn release_listeners(&mut self, active: &mut ActiveSession) {
        drop_listeners(&mut self.map, &mut active.listeners);
    }

    /// Make the subscriptions match what the session state needs
    fn sync_listeners(&mut self, active: &mut ActiveSession) {
        let wanted = active.session.listened_sources(&active.spec);
        reconcile_listeners(&mut self.map, &mut active.listeners, wanted);
    }

    fn apply(&mut self, active: &mut ActiveSession, effect: Effect) -> Result<()> {
        match effect {
            Effect::ShowAux(role, shape) => {
                let existing = active
                    .aux
                    .iter()
                    .find(|(r, _)| *r == role)
                    .map(|&(_, id)| id);
                match existing {
                    Some(id) => self.canvas.set_geometry(id, shape)?,
                    None => {
                        let id = self.canvas.add_feature(Feature::new(role, shape))?;
                        active.aux.push((role, id));
                    }
                }
            }
            Effect::HideAux(role) => {
                if let Some(id) = active.take_aux(role) {
                    self.canvas.remove_feature(id)?;
                }
            }
            Effect::ShowSketch { shape, label } => match active.sketch {
                Some(id) => {
                    self.canvas.set_geometry(id, shape)?;
                    self.canvas.set_label(id, label)?;
                }
                None => {
                    let id = self.canvas.add_feature(Feature {
                        shape,
                        role: FeatureRole::Sketch,
                        label,
                    })?;
                    active.sketch = Some(id);
                }
            },
            Effect::DiscardSketch => {
                if let Some(id) = active.sketch.take() {
                    self.canvas.remove_feature(id)?;
                }
            }
            Effect::Finalize { shape, value, keep } => {
                let id = self.finalize(active, shape, value, &keep)?;
                active.result = Some(id);
            }
            Effect::ReopenPopup => {
                if let Some(id) = active.result {
                    self.registry
                        .reopen_popup(id, &mut self.map, &self.presenter)?;
                }
            }
            Effect::Render => self.map.render(),
        }
        Ok(())
    }

    /// Hand the sketch over to the registry and show its popup
    fn finalize(
        &mut self,
        active: &mut ActiveSession,
        shape: Shape,
        value: String,
        keep: &[FeatureRole],
    ) -> Result<MeasurementId> {
        let feature = match active.sketch.take() {
            Some(id) => {
                // The feature is on the surface either way; the entry must own it
                if let Err(err) = self
                    .canvas
                    .set_geometry(id, shape.clone())
                    .and_then(|_| self.canvas.set_label(id, None))
                {
                    log::error!("Failed to finish sketch {}: {:#}", id, err);
                }
                id
            }
            None => self
                .canvas
                .add_feature(Feature::new(FeatureRole::Sketch, shape.clone()))?,
        };
        let linked = keep.iter().filter_map(|role| active.take_aux(*role)).collect();

        let id = self.registry.next_id();
        let anchor = shape.anchor();
        let kind = active.spec.kind;
        // The entry owns the features from here on, even if the popup fails
        let popup = match self
            .presenter
            .present(&mut self.map, id, kind, &value, anchor)
        {
            Ok(overlay) => Some(overlay),
            Err(err) => {
                log::error!("{:#}", err);
                None
            }
        };
        self.registry.add(RegistryEntry {
            id,
            kind,
            shape,
            value,
            anchor,
            feature,
            linked,
            popup,
            created_at: Local::now(),
        });
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Coord;
    use crate::surface::memory::{MemoryCanvas, MemoryMap};

    type Controller = MeasureController<MemoryMap, MemoryCanvas>;

    fn controller() -> Controller {
        MeasureController::new(MemoryMap::new(), MemoryCanvas::new(), MeasureConfig::default())
    }

    fn send(ctrl: &mut Controller, msgs: &[MeasureMsg]) {
        for msg in msgs {
            ctrl.handle_msg(msg.clone());
        }
    }

    fn popup_values(ctrl: &Controller) -> Vec<String> {
        ctrl.map().overlays().map(|(_, p)| p.value.clone()).collect()
    }

    #[test]
    fn test_distance_scenario() {
        let mut ctrl = controller();
        send(
            &mut ctrl,
            &[
                MeasureMsg::start(MeasureKind::Distance),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::pointer_move(1500.0, 2000.0),
                MeasureMsg::click(3000.0, 4000.0),
                MeasureMsg::draw_end(),
            ],
        );
        assert_eq!(popup_values(&ctrl), vec!["5 km"]);
        let entry = &ctrl.registry().entries()[0];
        assert_eq!(entry.kind, MeasureKind::Distance);
        assert_eq!(ctrl.canvas().feature(entry.feature).unwrap().label, None);
        // only the post-completion cancel listener remains
        assert_eq!(ctrl.map().listener_count(), 2);
        assert!(!ctrl.map().is_listening(EventSource::Click));
    }

    #[test]
    fn test_area_scenario() {
        let mut ctrl = controller();
        send(
            &mut ctrl,
            &[
                MeasureMsg::start(MeasureKind::Area),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::click(4.0, 0.0),
                MeasureMsg::click(0.0, 3.0),
                MeasureMsg::draw_end(),
            ],
        );
        assert_eq!(popup_values(&ctrl), vec!["6 m²"]);
    }

    #[test]
    fn test_radius_scenarios() {
        let mut ctrl = controller();
        send(
            &mut ctrl,
            &[
                MeasureMsg::start(MeasureKind::Radius),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::click(100.0, 0.0),
                MeasureMsg::start(MeasureKind::Radius),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::pointer_move(500.0, 0.0),
                MeasureMsg::click(2000.0, 0.0),
            ],
        );
        assert_eq!(popup_values(&ctrl), vec!["100 m", "2 km"]);
    }

    #[test]
    fn test_angle_scenario_anchors_on_vertex() {
        let mut ctrl = controller();
        send(
            &mut ctrl,
            &[
                MeasureMsg::start(MeasureKind::Angle),
                MeasureMsg::pointer_move(0.9, 0.1),
                MeasureMsg::click(1.0, 0.0),
                MeasureMsg::pointer_move(0.5, 0.5),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::pointer_move(0.2, 0.8),
                MeasureMsg::click(0.0, 1.0),
            ],
        );
        let (_, popup) = ctrl.map().overlays().next().unwrap();
        assert_eq!(popup.value, "90.0 °");
        assert_eq!(popup.anchor, Coord::new(0.0, 0.0));
        // hover dot and temp line are gone, only the measured rays remain
        assert_eq!(ctrl.canvas().feature_count(), 1);
    }

    #[test]
    fn test_switching_tools_leaves_no_listeners_behind() {
        let mut ctrl = controller();
        send(
            &mut ctrl,
            &[
                MeasureMsg::start(MeasureKind::Angle),
                MeasureMsg::click(1.0, 0.0),
                MeasureMsg::pointer_move(3.0, 3.0),
                MeasureMsg::start(MeasureKind::Radius),
            ],
        );
        // exactly one subscription per source, all owned by the radius tool
        for source in [
            EventSource::Click,
            EventSource::PointerMove,
            EventSource::ContextMenu,
            EventSource::KeyDown,
        ] {
            assert_eq!(ctrl.map().listeners_for(source), 1);
        }
        assert_eq!(ctrl.map().listener_count(), 4);
        // the angle helpers were discarded with their session
        assert_eq!(ctrl.canvas().feature_count(), 0);

        send(&mut ctrl, &[MeasureMsg::click(0.0, 0.0), MeasureMsg::click(0.0, 10.0)]);
        assert_eq!(ctrl.registry().len(), 1);
        assert_eq!(ctrl.registry().entries()[0].kind, MeasureKind::Radius);
    }

    #[test]
    fn test_start_keeps_completed_measurements() {
        let mut ctrl = controller();
        send(
            &mut ctrl,
            &[
                MeasureMsg::start(MeasureKind::Radius),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::click(10.0, 0.0),
                MeasureMsg::start(MeasureKind::Distance),
            ],
        );
        assert_eq!(ctrl.registry().len(), 1);
        assert_eq!(ctrl.map().overlay_count(), 1);
    }

    #[test]
    fn test_start_clears_completed_when_configured() {
        let config = MeasureConfig {
            clear_completed_on_start: true,
            ..MeasureConfig::default()
        };
        let mut ctrl = MeasureController::new(MemoryMap::new(), MemoryCanvas::new(), config);
        send(
            &mut ctrl,
            &[
                MeasureMsg::start(MeasureKind::Radius),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::click(10.0, 0.0),
                MeasureMsg::start(MeasureKind::Distance),
            ],
        );
        assert!(ctrl.registry().is_empty());
        assert_eq!(ctrl.map().overlay_count(), 0);
        assert_eq!(ctrl.canvas().feature_count(), 0);
    }

    #[test]
    fn test_delete_radius_removes_center_marker() {
        let mut ctrl = controller();
        send(
            &mut ctrl,
            &[
                MeasureMsg::start(MeasureKind::Radius),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::click(100.0, 0.0),
            ],
        );
        assert_eq!(ctrl.canvas().with_role(FeatureRole::CenterMarker).len(), 1);
        assert_eq!(ctrl.canvas().with_role(FeatureRole::Sketch).len(), 1);

        let id = ctrl.registry().entries()[0].id;
        assert!(ctrl.delete(id).unwrap());
        assert_eq!(ctrl.canvas().feature_count(), 0);
        assert_eq!(ctrl.map().overlay_count(), 0);
        assert!(ctrl.registry().is_empty());
    }

    #[test]
    fn test_cancel_distance_after_two_clicks_shows_partial_length() {
        let mut ctrl = controller();
        send(
            &mut ctrl,
            &[
                MeasureMsg::start(MeasureKind::Distance),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::click(30.0, 40.0),
                MeasureMsg::click(30.0, 140.0),
                MeasureMsg::pointer_move(900.0, 900.0),
                MeasureMsg::cancel(),
            ],
        );
        assert_eq!(popup_values(&ctrl), vec!["150 m"]);
        assert_eq!(ctrl.map().listener_count(), 0);
        assert!(ctrl.active().is_none());
    }

    #[test]
    fn test_cancel_angle_after_one_click_leaves_nothing() {
        let mut ctrl = controller();
        send(
            &mut ctrl,
            &[
                MeasureMsg::start(MeasureKind::Angle),
                MeasureMsg::pointer_move(0.5, 0.5),
                MeasureMsg::click(1.0, 0.0),
                MeasureMsg::pointer_move(2.0, 2.0),
                MeasureMsg::cancel(),
            ],
        );
        assert_eq!(ctrl.map().overlay_count(), 0);
        assert_eq!(ctrl.canvas().feature_count(), 0);
        assert!(ctrl.registry().is_empty());
        assert_eq!(ctrl.map().listener_count(), 0);
    }

    #[test]
    fn test_completed_cancel_reopens_closed_popup_once() {
        let mut ctrl = controller();
        send(
            &mut ctrl,
            &[
                MeasureMsg::start(MeasureKind::Distance),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::click(10.0, 0.0),
                MeasureMsg::draw_end(),
            ],
        );
        let id = ctrl.registry().entries()[0].id;
        assert!(ctrl.close_popup(id).unwrap());
        assert_eq!(ctrl.map().overlay_count(), 0);

        send(&mut ctrl, &[MeasureMsg::cancel(), MeasureMsg::cancel()]);
        assert_eq!(ctrl.map().overlay_count(), 1);
        assert_eq!(ctrl.map().listener_count(), 0);
        assert!(ctrl.active().is_none());
    }

    #[test]
    fn test_completed_cancel_does_not_duplicate_open_popup() {
        let mut ctrl = controller();
        send(
            &mut ctrl,
            &[
                MeasureMsg::start(MeasureKind::Radius),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::click(5.0, 0.0),
                MeasureMsg::cancel(),
            ],
        );
        assert_eq!(ctrl.map().overlay_count(), 1);
        assert_eq!(ctrl.registry().len(), 1);
    }

    #[test]
    fn test_events_after_completion_are_dropped() {
        let mut ctrl = controller();
        send(
            &mut ctrl,
            &[
                MeasureMsg::start(MeasureKind::Radius),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::click(5.0, 0.0),
                MeasureMsg::pointer_move(500.0, 0.0),
                MeasureMsg::click(600.0, 0.0),
            ],
        );
        let entry = &ctrl.registry().entries()[0];
        assert_eq!(
            entry.shape,
            Shape::Circle {
                center: Coord::new(0.0, 0.0),
                radius: 5.0
            }
        );
        assert_eq!(ctrl.registry().len(), 1);
    }

    #[test]
    fn test_clear_tears_down_everything() {
        let mut ctrl = controller();
        send(
            &mut ctrl,
            &[
                MeasureMsg::start(MeasureKind::Radius),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::click(5.0, 0.0),
                MeasureMsg::start(MeasureKind::Distance),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::pointer_move(3.0, 3.0),
                MeasureMsg::clear(),
            ],
        );
        assert!(ctrl.registry().is_empty());
        assert_eq!(ctrl.map().overlay_count(), 0);
        assert_eq!(ctrl.canvas().feature_count(), 0);
        assert_eq!(ctrl.map().listener_count(), 0);
        assert!(ctrl.active().is_none());
    }

    #[test]
    fn test_popup_failure_still_registers_shape() {
        let mut map = MemoryMap::new();
        map.fail_overlays = true;
        let mut ctrl = MeasureController::new(map, MemoryCanvas::new(), MeasureConfig::default());
        send(
            &mut ctrl,
            &[
                MeasureMsg::start(MeasureKind::Radius),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::click(5.0, 0.0),
            ],
        );
        assert_eq!(ctrl.registry().len(), 1);
        assert_eq!(ctrl.registry().entries()[0].popup, None);
        // listeners still follow the session state
        assert_eq!(ctrl.map().listener_count(), 2);

        let id = ctrl.registry().entries()[0].id;
        ctrl.handle_msg(MeasureMsg::delete(id));
        assert_eq!(ctrl.canvas().feature_count(), 0);
    }

    #[test]
    fn test_failed_sketch_update_still_registers_feature() {
        let mut ctrl = controller();
        send(
            &mut ctrl,
            &[
                MeasureMsg::start(MeasureKind::Distance),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::pointer_move(5.0, 0.0),
            ],
        );
        assert_eq!(ctrl.canvas().feature_count(), 1);

        ctrl.canvas_mut().fail_updates = true;
        send(&mut ctrl, &[MeasureMsg::click(10.0, 0.0), MeasureMsg::draw_end()]);
        assert_eq!(ctrl.registry().len(), 1);
        let entry = &ctrl.registry().entries()[0];
        assert!(ctrl.canvas().feature(entry.feature).is_some());

        let id = entry.id;
        assert!(ctrl.delete(id).unwrap());
        assert_eq!(ctrl.canvas().feature_count(), 0);
        assert_eq!(ctrl.map().overlay_count(), 0);
    }

    #[test]
    fn test_cancel_angle_after_two_clicks_without_move() {
        let mut ctrl = controller();
        send(
            &mut ctrl,
            &[
                MeasureMsg::start(MeasureKind::Angle),
                MeasureMsg::pointer_move(0.5, 0.5),
                MeasureMsg::click(1.0, 0.0),
                MeasureMsg::pointer_move(0.2, 0.2),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::cancel(),
            ],
        );
        assert_eq!(popup_values(&ctrl), vec!["0.0 °"]);
        assert_eq!(ctrl.canvas().feature_count(), 1);
        assert_eq!(ctrl.map().listener_count(), 0);
    }

    #[test]
    fn test_cancel_radius_after_center_without_move() {
        let mut ctrl = controller();
        send(
            &mut ctrl,
            &[
                MeasureMsg::start(MeasureKind::Radius),
                MeasureMsg::pointer_move(4.0, 4.0),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::cancel(),
            ],
        );
        assert_eq!(popup_values(&ctrl), vec!["0 m"]);
        // circle plus its center marker, both owned by the entry
        assert_eq!(ctrl.canvas().feature_count(), 2);
        assert_eq!(ctrl.registry().entries()[0].linked.len(), 1);
    }

    #[test]
    fn test_failed_popup_close_does_not_duplicate_on_cancel() {
        let mut ctrl = controller();
        send(
            &mut ctrl,
            &[
                MeasureMsg::start(MeasureKind::Radius),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::click(5.0, 0.0),
            ],
        );
        let id = ctrl.registry().entries()[0].id;
        ctrl.map_mut().fail_removals = true;
        assert!(ctrl.close_popup(id).is_err());
        send(&mut ctrl, &[MeasureMsg::cancel()]);
        assert_eq!(ctrl.map().overlay_count(), 1);
    }

    #[test]
    fn test_area_selection_scenario() {
        let mut ctrl = controller();
        send(
            &mut ctrl,
            &[
                MeasureMsg::select_area(),
                MeasureMsg::pointer_move(10.0, 10.0),
            ],
        );
        assert!(ctrl.is_selecting());
        assert!(ctrl.is_drawing());
        assert_eq!(ctrl.map().listener_count(), 4);
        assert_eq!(ctrl.canvas().feature_count(), 0);

        send(
            &mut ctrl,
            &[
                MeasureMsg::click(100.0, 0.0),
                MeasureMsg::pointer_move(50.0, 50.0),
            ],
        );
        let preview = ctrl.canvas().with_role(FeatureRole::SelectionPreview);
        assert_eq!(preview.len(), 1);
        assert_eq!(
            preview[0].shape,
            Shape::Polygon(Extent::from_corners(Coord::new(50.0, 0.0), Coord::new(100.0, 50.0)).ring())
        );

        send(&mut ctrl, &[MeasureMsg::click(0.0, 80.0)]);
        let expected = Extent::from_corners(Coord::new(0.0, 0.0), Coord::new(100.0, 80.0));
        assert_eq!(ctrl.selected_extent(), Some(expected));
        assert!(ctrl.canvas().with_role(FeatureRole::SelectionPreview).is_empty());
        assert_eq!(ctrl.canvas().with_role(FeatureRole::Selection).len(), 1);
        assert!(!ctrl.is_selecting());
        assert_eq!(ctrl.map().listener_count(), 0);
    }

    #[test]
    fn test_capture_selection_uses_selected_extent() {
        let mut ctrl = controller();
        assert!(ctrl.capture_selection(10, 10).is_err());
        send(
            &mut ctrl,
            &[
                MeasureMsg::start(MeasureKind::Distance),
                MeasureMsg::click(10.0, 40.0),
                MeasureMsg::click(90.0, 40.0),
                MeasureMsg::draw_end(),
                MeasureMsg::select_area(),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::click(100.0, 80.0),
            ],
        );
        // the finished measurement survives starting a selection
        assert_eq!(ctrl.registry().len(), 1);
        let img = ctrl.capture_selection(100, 80).unwrap();
        assert_eq!(img.dimensions(), (100, 80));
        assert_eq!(img.get_pixel(50, 40).0[3], 255);
        assert_eq!(img.get_pixel(50, 5).0[3], 0);
    }

    #[test]
    fn test_cancel_selection_leaves_nothing() {
        let mut ctrl = controller();
        send(
            &mut ctrl,
            &[
                MeasureMsg::select_area(),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::pointer_move(3.0, 3.0),
                MeasureMsg::cancel(),
            ],
        );
        assert_eq!(ctrl.selected_extent(), None);
        assert_eq!(ctrl.canvas().feature_count(), 0);
        assert_eq!(ctrl.map().listener_count(), 0);
        assert!(!ctrl.is_selecting());
    }

    #[test]
    fn test_new_selection_replaces_previous() {
        let mut ctrl = controller();
        send(
            &mut ctrl,
            &[
                MeasureMsg::select_area(),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::click(10.0, 10.0),
                MeasureMsg::select_area(),
            ],
        );
        assert_eq!(ctrl.selected_extent(), None);
        assert!(ctrl.canvas().with_role(FeatureRole::Selection).is_empty());

        send(
            &mut ctrl,
            &[MeasureMsg::click(20.0, 20.0), MeasureMsg::click(30.0, 25.0)],
        );
        assert_eq!(ctrl.canvas().with_role(FeatureRole::Selection).len(), 1);
        assert_eq!(ctrl.selected_extent().map(|e| e.width()), Some(10.0));

        assert!(ctrl.clear_selection().unwrap());
        assert!(!ctrl.clear_selection().unwrap());
        assert_eq!(ctrl.canvas().feature_count(), 0);
    }

    #[test]
    fn test_starting_a_tool_stops_selection() {
        let mut ctrl = controller();
        send(
            &mut ctrl,
            &[
                MeasureMsg::select_area(),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::pointer_move(5.0, 5.0),
                MeasureMsg::start(MeasureKind::Radius),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::click(5.0, 0.0),
            ],
        );
        assert!(!ctrl.is_selecting());
        assert!(ctrl.canvas().with_role(FeatureRole::SelectionPreview).is_empty());
        assert_eq!(popup_values(&ctrl), vec!["5 m"]);
        assert_eq!(ctrl.selected_extent(), None);
    }

    #[test]
    fn test_clear_removes_selection() {
        let mut ctrl = controller();
        send(
            &mut ctrl,
            &[
                MeasureMsg::select_area(),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::click(10.0, 10.0),
                MeasureMsg::clear(),
            ],
        );
        assert_eq!(ctrl.selected_extent(), None);
        assert_eq!(ctrl.canvas().feature_count(), 0);
    }

    #[test]
    fn test_live_label_while_drawing() {
        let mut ctrl = controller();
        send(
            &mut ctrl,
            &[
                MeasureMsg::start(MeasureKind::Distance),
                MeasureMsg::click(0.0, 0.0),
                MeasureMsg::pointer_move(0.0, 250.0),
            ],
        );
        let sketches = ctrl.canvas().with_role(FeatureRole::Sketch);
        assert_eq!(sketches.len(), 1);
        let label = sketches[0].label.as_ref().unwrap();
        assert_eq!(label.text, "250 m");
        assert_eq!(label.at, Coord::new(0.0, 250.0));
        assert!(ctrl.is_drawing());
    }

    #[test]
    fn test_events_without_session_are_ignored() {
        let mut ctrl = controller();
        send(&mut ctrl, &[MeasureMsg::click(1.0, 1.0), MeasureMsg::cancel()]);
        assert_eq!(ctrl.canvas().feature_count(), 0);
        assert_eq!(ctrl.map().render_count(), 0);
    }
}
