//! Measurement session state and its reducer
//!
//! A session is a plain value. `handle_event` consumes it together with one
//! map event and returns the next value plus the effects the controller has to
//! apply to the map and drawing surfaces. Nothing in here touches a surface.

use crate::domain::{Coord, FeatureRole, Label, MeasureKind, MeasureState, Shape, measure_value};
use crate::measure::tool::ToolSpec;
use crate::session::messages::MeasureEvent;
use crate::surface::EventSource;

/// Sources a drawing session listens to
const DRAWING_SOURCES: &[EventSource] = &[
    EventSource::Click,
    EventSource::PointerMove,
    EventSource::ContextMenu,
    EventSource::KeyDown,
];

/// Sources a native-draw session listens to
const NATIVE_DRAWING_SOURCES: &[EventSource] = &[
    EventSource::Click,
    EventSource::PointerMove,
    EventSource::ContextMenu,
    EventSource::KeyDown,
    EventSource::DrawEnd,
];

/// Sources of the one-shot cancel listener armed after completion
const COMPLETED_SOURCES: &[EventSource] = &[EventSource::ContextMenu, EventSource::KeyDown];

/// Surface work requested by the reducer
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Add or move a helper feature
    ShowAux(FeatureRole, Shape),
    /// Remove a helper feature if present
    HideAux(FeatureRole),
    /// Add or update the measured shape
    ShowSketch { shape: Shape, label: Option<Label> },
    /// Remove the measured shape, nothing is kept
    DiscardSketch,
    /// Turn the sketch into a registered measurement with a popup
    Finalize {
        shape: Shape,
        value: String,
        /// Helper features that stay linked to the measurement
        keep: Vec<FeatureRole>,
    },
    /// Show the popup of this session's measurement again if it was closed
    ReopenPopup,
    /// Redraw the map
    Render,
}

/// One in-progress or finished measurement
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub kind: MeasureKind,
    pub state: MeasureState,
    pub vertices: Vec<Coord>,
    /// Live pointer position, never part of a finished shape
    pub preview: Option<Coord>,
    /// The post-completion cancel listener is still armed
    pub rearm: bool,
}

impl Session {
    pub fn new(kind: MeasureKind) -> Self {
        Self {
            kind,
            state: MeasureState::AwaitingFirstPoint,
            vertices: Vec::new(),
            preview: None,
            rearm: false,
        }
    }

    /// Event sources this session needs right now
    pub fn listened_sources(&self, spec: &ToolSpec) -> &'static [EventSource] {
        match self.state {
            s if s.is_drawing() && spec.is_native() => NATIVE_DRAWING_SOURCES,
            s if s.is_drawing() => DRAWING_SOURCES,
            MeasureState::Completed if self.rearm => COMPLETED_SOURCES,
            _ => &[],
        }
    }

    /// Nothing left to do; the controller may drop the session
    pub fn is_finished(&self) -> bool {
        match self.state {
            MeasureState::Cancelled => true,
            MeasureState::Completed => !self.rearm,
            _ => false,
        }
    }

    fn drawing_state(&self, spec: &ToolSpec) -> MeasureState {
        match (self.vertices.len(), spec.click_arity()) {
            (0, _) => MeasureState::AwaitingFirstPoint,
            (n, Some(arity)) if n + 1 >= arity => MeasureState::AwaitingFinalPoint,
            _ => MeasureState::AwaitingNextPoint,
        }
    }

    /// Redraw the live sketch and helpers from vertices and pointer
    fn push_sketch(&self, spec: &ToolSpec, effects: &mut Vec<Effect>) {
        if self.vertices.is_empty() {
            if spec.hover_marker
                && let Some(p) = self.preview
            {
                effects.push(Effect::ShowAux(FeatureRole::Hover, Shape::Point(p)));
            }
            return;
        }

        if spec.temp_line && self.vertices.len() == 1 {
            if let Some(p) = self.preview {
                effects.push(Effect::ShowAux(
                    FeatureRole::TempLine,
                    Shape::LineString(vec![self.vertices[0], p]),
                ));
            }
            return;
        }

        if let Some(shape) = spec.sketch_shape(&self.vertices, self.preview) {
            let label = spec.live_label(&shape);
            effects.push(Effect::ShowSketch { shape, label });
        }
    }

    /// Materialise the committed vertices as a measurement
    fn finalize(&mut self, spec: &ToolSpec, effects: &mut Vec<Effect>) -> bool {
        self.preview = None;
        let Some(shape) = spec.sketch_shape(&self.vertices, None) else {
            return false;
        };
        let keep = spec.kept_roles();
        for role in spec.aux_roles() {
            if !keep.contains(&role) {
                effects.push(Effect::HideAux(role));
            }
        }
        let value = measure_value(spec.kind, &shape);
        effects.push(Effect::Finalize { shape, value, keep });
        true
    }

    fn discard(&mut self, spec: &ToolSpec, effects: &mut Vec<Effect>) {
        self.preview = None;
        for role in spec.aux_roles() {
            effects.push(Effect::HideAux(role));
        }
        effects.push(Effect::DiscardSketch);
    }

    fn complete(mut self, spec: &ToolSpec, mut effects: Vec<Effect>) -> (Self, Vec<Effect>) {
        if self.finalize(spec, &mut effects) {
            self.state = MeasureState::Completed;
            self.rearm = true;
        } else {
            self.discard(spec, &mut effects);
            self.state = MeasureState::Cancelled;
        }
        effects.push(Effect::Render);
        (self, effects)
    }
}

/// Advance `session` by one map event
///
/// Events the current state does not expect are ignored and return no
/// effects, so late pointer moves never touch a finished shape.
pub fn handle_event(
    mut session: Session,
    event: MeasureEvent,
    spec: &ToolSpec,
) -> (Session, Vec<Effect>) {
    let mut effects = Vec::new();
    let drawing = session.state.is_drawing();

    match event {
        MeasureEvent::Click(p) if drawing => {
            session.vertices.push(p);
            session.preview = None;
            if session.vertices.len() == 1 {
                if spec.hover_marker {
                    effects.push(Effect::HideAux(FeatureRole::Hover));
                }
                if spec.center_marker {
                    effects.push(Effect::ShowAux(FeatureRole::CenterMarker, Shape::Point(p)));
                }
            }
            if spec.temp_line && session.vertices.len() == 2 {
                effects.push(Effect::HideAux(FeatureRole::TempLine));
            }
            if spec
                .click_arity()
                .is_some_and(|arity| session.vertices.len() >= arity)
            {
                return session.complete(spec, effects);
            }
            session.state = session.drawing_state(spec);
            session.push_sketch(spec, &mut effects);
            effects.push(Effect::Render);
        }
        MeasureEvent::PointerMove(p) if drawing => {
            session.preview = Some(p);
            session.push_sketch(spec, &mut effects);
            effects.push(Effect::Render);
        }
        MeasureEvent::DrawEnd if drawing => {
            if spec.is_native() && session.vertices.len() >= spec.min_vertices() {
                return session.complete(spec, effects);
            }
            log::debug!(
                "{:?}: draw end with {} vertices ignored",
                spec.kind,
                session.vertices.len()
            );
        }
        MeasureEvent::Cancel if drawing => {
            // One short: the visible sketch is kept, ending at the pointer or
            // collapsed onto the last vertex when the pointer has not moved
            if spec.cancel_commits_preview
                && session.vertices.len() + 1 == spec.min_vertices()
                && let Some(p) = session.preview.or(session.vertices.last().copied())
            {
                session.vertices.push(p);
            }
            if session.vertices.len() >= spec.min_vertices() {
                session.finalize(spec, &mut effects);
            } else {
                session.discard(spec, &mut effects);
            }
            session.state = MeasureState::Cancelled;
            effects.push(Effect::Render);
        }
        MeasureEvent::Cancel if session.state == MeasureState::Completed && session.rearm => {
            session.rearm = false;
            effects.push(Effect::ReopenPopup);
        }
        _ => {
            log::trace!("{:?} in {:?}: ignored", event, session.state);
        }
    }

    (session, effects)
}
