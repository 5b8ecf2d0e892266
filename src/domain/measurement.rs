//! Measurement types shared by the tools, the registry and the renderers
//!
//! All shapes store coordinates in projected map units.

use serde::{Deserialize, Serialize};

use super::format::{format_angle, format_area, format_length, format_radius};
use super::geometry::{self, Coord};

/// The four measurement tools
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasureKind {
    Distance,
    Area,
    Radius,
    Angle,
}

impl MeasureKind {
    pub const ALL: [MeasureKind; 4] = [
        MeasureKind::Distance,
        MeasureKind::Area,
        MeasureKind::Radius,
        MeasureKind::Angle,
    ];

    /// Default popup heading for this kind
    pub fn default_title(self) -> &'static str {
        match self {
            MeasureKind::Distance => "Distance",
            MeasureKind::Area => "Area",
            MeasureKind::Radius => "Radius",
            MeasureKind::Angle => "Angle",
        }
    }

    /// Smallest number of committed vertices that forms a valid shape
    pub fn min_vertices(self) -> usize {
        match self {
            MeasureKind::Distance | MeasureKind::Radius => 2,
            MeasureKind::Area | MeasureKind::Angle => 3,
        }
    }
}

/// Progress of one measurement session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MeasureState {
    AwaitingFirstPoint,
    AwaitingNextPoint,
    AwaitingFinalPoint,
    Completed,
    Cancelled,
}

impl MeasureState {
    /// Whether clicks and pointer moves still shape the measurement
    pub fn is_drawing(self) -> bool {
        matches!(
            self,
            MeasureState::AwaitingFirstPoint
                | MeasureState::AwaitingNextPoint
                | MeasureState::AwaitingFinalPoint
        )
    }
}

/// Geometry of one feature on the drawing surface
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Point(Coord),
    LineString(Vec<Coord>),
    /// Ring, implicitly closed
    Polygon(Vec<Coord>),
    Circle { center: Coord, radius: f64 },
}

impl Shape {
    /// Where a result popup is anchored
    ///
    /// Lines anchor on their middle vertex (the vertex for angles), areas on
    /// an interior point and circles on their center.
    pub fn anchor(&self) -> Coord {
        match self {
            Shape::Point(p) => *p,
            Shape::LineString(points) => points.get(points.len() / 2).copied().unwrap_or_default(),
            Shape::Polygon(ring) => geometry::interior_point(ring),
            Shape::Circle { center, .. } => *center,
        }
    }

    /// Vertices of the shape; circles are expanded to `sides` ring vertices
    pub fn to_coords(&self, sides: usize) -> Vec<Coord> {
        match self {
            Shape::Point(p) => vec![*p],
            Shape::LineString(points) | Shape::Polygon(points) => points.clone(),
            Shape::Circle { center, radius } => geometry::circle_polygon(*center, *radius, sides),
        }
    }
}

/// Text drawn next to a feature while it is being sketched
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Label {
    pub at: Coord,
    pub text: String,
}

/// What a feature is for; the drawing surface styles by role
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FeatureRole {
    /// The measured shape itself
    Sketch,
    /// Dot following the pointer before the first click
    Hover,
    /// Line from the first point to the pointer (angle tool)
    TempLine,
    /// Center dot of a radius measurement
    CenterMarker,
    /// Rectangle following the pointer during area selection, drawn dashed
    SelectionPreview,
    /// Finished area selection
    Selection,
}

/// Compute the formatted value of a finished shape
pub fn measure_value(kind: MeasureKind, shape: &Shape) -> String {
    match (kind, shape) {
        (MeasureKind::Distance, Shape::LineString(points)) => format_length(geometry::length(points)),
        (MeasureKind::Area, Shape::Polygon(ring)) => format_area(geometry::area(ring)),
        (MeasureKind::Radius, Shape::Circle { radius, .. }) => format_radius(*radius),
        (MeasureKind::Radius, Shape::Polygon(ring)) => format_radius(geometry::polygon_radius(ring)),
        (MeasureKind::Angle, Shape::LineString(points)) if points.len() >= 3 => {
            format_angle(geometry::angle_degrees(
                points[0],
                points[1],
                points[points.len() - 1],
            ))
        }
        (MeasureKind::Angle, _) => format_angle(0.0),
        (MeasureKind::Area, _) => format_area(0.0),
        _ => format_length(0.0),
    }
}
