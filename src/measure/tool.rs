//! Per-kind tool descriptions
//!
//! The four tools share one state machine. What differs between them is
//! data: how a session ends, how the live sketch is built from the clicked
//! points and which helper features are shown while drawing.

use crate::config::MeasureConfig;
use crate::domain::{Coord, FeatureRole, Label, MeasureKind, Shape, geometry, measure_value};

/// How a session reaches completion
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// The native draw interaction ends the sketch; needs this many vertices
    Native { min_vertices: usize },
    /// Completes on the click that commits the n-th vertex
    Clicks(usize),
}

/// How committed vertices and the pointer become the live shape
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SketchRule {
    /// Open polyline through every vertex
    Polyline,
    /// Closed ring through every vertex
    Ring,
    /// Circle around the first vertex through the second
    CircleFromCenter,
    /// Two rays meeting at the second vertex
    Rays,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToolSpec {
    pub kind: MeasureKind,
    pub termination: Termination,
    pub sketch: SketchRule,
    /// Dot following the pointer until the first click
    pub hover_marker: bool,
    /// Line from the first vertex to the pointer until the second click
    pub temp_line: bool,
    /// Dot on the first vertex, kept with the finished shape
    pub center_marker: bool,
    /// Value text next to the sketch while drawing
    pub live_label: bool,
    /// On cancel one vertex short of completion, the pointer (or the last
    /// vertex if it has not moved) becomes the final vertex
    pub cancel_commits_preview: bool,
    /// Draw circles as polygons with this many sides instead of native circles
    pub circle_sides: Option<usize>,
}

impl ToolSpec {
    /// Tool description for `kind` under the given configuration
    pub fn for_kind(kind: MeasureKind, config: &MeasureConfig) -> Self {
        let circle_sides = config
            .approximate_circles
            .then_some(config.circle_sides);
        let base = Self {
            kind,
            termination: Termination::Native {
                min_vertices: kind.min_vertices(),
            },
            sketch: SketchRule::Polyline,
            hover_marker: false,
            temp_line: false,
            center_marker: false,
            live_label: config.live_labels,
            cancel_commits_preview: false,
            circle_sides: None,
        };
        match kind {
            MeasureKind::Distance => base,
            MeasureKind::Area => Self {
                sketch: SketchRule::Ring,
                ..base
            },
            MeasureKind::Radius => Self {
                termination: Termination::Clicks(2),
                sketch: SketchRule::CircleFromCenter,
                hover_marker: config.hover_marker,
                center_marker: true,
                cancel_commits_preview: true,
                circle_sides,
                ..base
            },
            MeasureKind::Angle => Self {
                termination: Termination::Clicks(3),
                sketch: SketchRule::Rays,
                hover_marker: config.hover_marker,
                temp_line: true,
                cancel_commits_preview: true,
                ..base
            },
        }
    }

    /// Whether completion comes from the native draw-end signal
    pub fn is_native(&self) -> bool {
        matches!(self.termination, Termination::Native { .. })
    }

    /// Vertex count that completes the session by clicking, if any
    pub fn click_arity(&self) -> Option<usize> {
        match self.termination {
            Termination::Clicks(n) => Some(n),
            Termination::Native { .. } => None,
        }
    }

    /// Fewest committed vertices that form a shape worth keeping
    pub fn min_vertices(&self) -> usize {
        match self.termination {
            Termination::Native { min_vertices } => min_vertices,
            Termination::Clicks(n) => n,
        }
    }

    /// Helper features this tool may show while drawing
    pub fn aux_roles(&self) -> Vec<FeatureRole> {
        let mut roles = Vec::new();
        if self.hover_marker {
            roles.push(FeatureRole::Hover);
        }
        if self.temp_line {
            roles.push(FeatureRole::TempLine);
        }
        if self.center_marker {
            roles.push(FeatureRole::CenterMarker);
        }
        roles
    }

    /// Helper features handed over to the finished measurement
    pub fn kept_roles(&self) -> Vec<FeatureRole> {
        if self.center_marker {
            vec![FeatureRole::CenterMarker]
        } else {
            Vec::new()
        }
    }

    /// Build the measured shape from committed vertices and the pointer
    ///
    /// Returns `None` while there is not enough to draw.
    pub fn sketch_shape(&self, committed: &[Coord], pointer: Option<Coord>) -> Option<Shape> {
        let first = *committed.first()?;
        match self.sketch {
            SketchRule::Polyline | SketchRule::Ring => {
                let mut points = committed.to_vec();
                points.extend(pointer);
                if points.len() < 2 {
                    return None;
                }
                Some(match self.sketch {
                    SketchRule::Ring => Shape::Polygon(points),
                    _ => Shape::LineString(points),
                })
            }
            SketchRule::CircleFromCenter => {
                let rim = committed.get(1).copied().or(pointer).unwrap_or(first);
                let radius = geometry::radius(first, rim);
                Some(match self.circle_sides {
                    Some(sides) => Shape::Polygon(geometry::circle_polygon(first, radius, sides)),
                    None => Shape::Circle {
                        center: first,
                        radius,
                    },
                })
            }
            SketchRule::Rays => {
                let vertex = *committed.get(1)?;
                let end = committed.get(2).copied().or(pointer).unwrap_or(vertex);
                Some(Shape::LineString(vec![first, vertex, end]))
            }
        }
    }

    /// Live value text for a sketch, placed where the tool shows it
    pub fn live_label(&self, shape: &Shape) -> Option<Label> {
        if !self.live_label {
            return None;
        }
        let at = match (self.sketch, shape) {
            (SketchRule::Rays, Shape::LineString(points)) => *points.get(1)?,
            (SketchRule::CircleFromCenter, _) => shape.anchor(),
            (_, Shape::LineString(points) | Shape::Polygon(points)) => *points.last()?,
            _ => shape.anchor(),
        };
        Some(Label {
            at,
            text: measure_value(self.kind, shape),
        })
    }
}
