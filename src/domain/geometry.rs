//! Planar geometry for measurements
//!
//! All coordinates are projected map units (metres). Nothing here knows about
//! the map SDK; these are the functions the measurement tools compute with.

use serde::{Deserialize, Serialize};

/// Number of sides used when a circle has to be drawn as a polygon
pub const CIRCLE_SIDES: usize = 128;

/// A projected planar coordinate
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another coordinate
    pub fn distance_to(&self, other: Coord) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

impl From<[f64; 2]> for Coord {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Coord> for [f64; 2] {
    fn from(c: Coord) -> Self {
        [c.x, c.y]
    }
}

/// Axis-aligned bounding box in projected units
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    /// Create an extent from two arbitrary corners
    pub fn from_corners(a: Coord, b: Coord) -> Self {
        Self {
            min_x: a.x.min(b.x),
            min_y: a.y.min(b.y),
            max_x: a.x.max(b.x),
            max_y: a.y.max(b.y),
        }
    }

    /// Bounding box of a coordinate sequence, `None` when empty
    pub fn of(points: &[Coord]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut extent = Self::from_corners(*first, *first);
        for p in rest {
            extent.min_x = extent.min_x.min(p.x);
            extent.min_y = extent.min_y.min(p.y);
            extent.max_x = extent.max_x.max(p.x);
            extent.max_y = extent.max_y.max(p.y);
        }
        Some(extent)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Coord {
        Coord::new(
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }

    /// Zero width or height, nothing to capture
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Corner ring, counter-clockwise from the lower left
    pub fn ring(&self) -> Vec<Coord> {
        vec![
            Coord::new(self.min_x, self.min_y),
            Coord::new(self.max_x, self.min_y),
            Coord::new(self.max_x, self.max_y),
            Coord::new(self.min_x, self.max_y),
        ]
    }
}

/// Sum of segment lengths along an open polyline
pub fn length(points: &[Coord]) -> f64 {
    points.windows(2).map(|w| w[0].distance_to(w[1])).sum()
}

/// Unsigned planar area of a ring (shoelace), the ring is implicitly closed
pub fn area(ring: &[Coord]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for (i, a) in ring.iter().enumerate() {
        let b = ring[(i + 1) % ring.len()];
        twice += a.x * b.y - b.x * a.y;
    }
    (twice * 0.5).abs()
}

/// Distance between a circle's center and a point on its rim
pub fn radius(center: Coord, rim: Coord) -> f64 {
    center.distance_to(rim)
}

/// Angle at `vertex` between the rays to `a` and `c`, in degrees rounded to 0.1
///
/// Returns 0 when either ray has zero length.
pub fn angle_degrees(a: Coord, vertex: Coord, c: Coord) -> f64 {
    let (ux, uy) = (a.x - vertex.x, a.y - vertex.y);
    let (vx, vy) = (c.x - vertex.x, c.y - vertex.y);
    let nu = ux.hypot(uy);
    let nv = vx.hypot(vy);
    if nu == 0.0 || nv == 0.0 {
        return 0.0;
    }
    let cos_theta = ((ux * vx + uy * vy) / (nu * nv)).clamp(-1.0, 1.0);
    let degrees = cos_theta.acos().to_degrees();
    (degrees * 10.0).round() / 10.0
}

/// Regular polygon approximating a circle, vertex `i` at angle `2πi/sides`
pub fn circle_polygon(center: Coord, radius: f64, sides: usize) -> Vec<Coord> {
    let sides = sides.max(3);
    (0..sides)
        .map(|i| {
            let angle = std::f64::consts::TAU * i as f64 / sides as f64;
            Coord::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            )
        })
        .collect()
}

/// Even-odd point in ring test
pub fn ring_contains(ring: &[Coord], p: Coord) -> bool {
    let mut inside = false;
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// A point guaranteed to lie inside the ring where possible
///
/// Casts a horizontal line through the middle of the ring's extent and takes
/// the midpoint of the widest span that lies inside. Falls back to the extent
/// center for degenerate rings.
pub fn interior_point(ring: &[Coord]) -> Coord {
    let Some(extent) = Extent::of(ring) else {
        return Coord::default();
    };
    let center = extent.center();
    let y = center.y;

    let mut crossings = Vec::new();
    let mut prev = ring[ring.len() - 1];
    for &cur in ring {
        let spans = (prev.y <= y && y <= cur.y) || (cur.y <= y && y <= prev.y);
        if spans && cur.y != prev.y {
            crossings.push((y - prev.y) / (cur.y - prev.y) * (cur.x - prev.x) + prev.x);
        }
        prev = cur;
    }
    crossings.sort_by(f64::total_cmp);

    let mut best: Option<(f64, f64)> = None;
    for pair in crossings.windows(2) {
        let width = (pair[1] - pair[0]).abs();
        if best.is_some_and(|(_, w)| width <= w) {
            continue;
        }
        let mid = (pair[0] + pair[1]) * 0.5;
        if ring_contains(ring, Coord::new(mid, y)) {
            best = Some((mid, width));
        }
    }

    match best {
        Some((x, _)) => Coord::new(x, y),
        None => center,
    }
}

/// Radius of a polygon-approximated circle: interior point to first vertex
pub fn polygon_radius(ring: &[Coord]) -> f64 {
    match ring.first() {
        Some(first) => interior_point(ring).distance_to(*first),
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: f64, y: f64) -> Coord {
        Coord::new(x, y)
    }

    #[test]
    fn test_length_sums_segments() {
        let line = [c(0.0, 0.0), c(3.0, 4.0), c(3.0, 10.0)];
        assert_eq!(length(&line), 11.0);
        assert_eq!(length(&[c(1.0, 1.0)]), 0.0);
        assert_eq!(length(&[]), 0.0);
    }

    #[test]
    fn test_length_reversal_invariant() {
        let line = vec![c(0.0, 0.0), c(12.5, -3.0), c(40.0, 7.25), c(41.0, 100.0)];
        let mut reversed = line.clone();
        reversed.reverse();
        assert!((length(&line) - length(&reversed)).abs() < 1e-9);
    }

    #[test]
    fn test_area_triangle() {
        assert_eq!(area(&[c(0.0, 0.0), c(4.0, 0.0), c(0.0, 3.0)]), 6.0);
    }

    #[test]
    fn test_area_rotation_and_direction_invariant() {
        let ring = vec![c(0.0, 0.0), c(10.0, 0.0), c(12.0, 8.0), c(3.0, 11.0), c(-2.0, 5.0)];
        let expected = area(&ring);
        for k in 0..ring.len() {
            let mut rotated = ring.clone();
            rotated.rotate_left(k);
            assert!((area(&rotated) - expected).abs() < 1e-9);
            rotated.reverse();
            assert!((area(&rotated) - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_area_degenerate() {
        assert_eq!(area(&[c(0.0, 0.0), c(5.0, 5.0)]), 0.0);
    }

    #[test]
    fn test_angle_right() {
        assert_eq!(angle_degrees(c(1.0, 0.0), c(0.0, 0.0), c(0.0, 1.0)), 90.0);
    }

    #[test]
    fn test_angle_symmetric() {
        let cases = [
            (c(5.0, 1.0), c(0.0, 0.0), c(-3.0, 4.0)),
            (c(10.0, 10.0), c(2.0, -1.0), c(7.5, 0.0)),
            (c(-1.0, -1.0), c(1.0, 1.0), c(3.0, 2.0)),
        ];
        for (a, b, cc) in cases {
            assert_eq!(angle_degrees(a, b, cc), angle_degrees(cc, b, a));
        }
    }

    #[test]
    fn test_angle_same_ray_is_zero() {
        assert_eq!(angle_degrees(c(4.0, 2.0), c(1.0, 1.0), c(4.0, 2.0)), 0.0);
    }

    #[test]
    fn test_angle_degenerate_ray() {
        assert_eq!(angle_degrees(c(0.0, 0.0), c(0.0, 0.0), c(1.0, 1.0)), 0.0);
        assert_eq!(angle_degrees(c(1.0, 1.0), c(0.0, 0.0), c(0.0, 0.0)), 0.0);
    }

    #[test]
    fn test_angle_straight() {
        assert_eq!(angle_degrees(c(-1.0, 0.0), c(0.0, 0.0), c(1.0, 0.0)), 180.0);
    }

    #[test]
    fn test_interior_point_square() {
        let square = [c(0.0, 0.0), c(10.0, 0.0), c(10.0, 10.0), c(0.0, 10.0)];
        assert_eq!(interior_point(&square), c(5.0, 5.0));
    }

    #[test]
    fn test_interior_point_concave_stays_inside() {
        // U shape whose extent center falls in the notch
        let ring = [
            c(0.0, 0.0),
            c(30.0, 0.0),
            c(30.0, 30.0),
            c(20.0, 30.0),
            c(20.0, 10.0),
            c(10.0, 10.0),
            c(10.0, 30.0),
            c(0.0, 30.0),
        ];
        let p = interior_point(&ring);
        assert!(ring_contains(&ring, p));
    }

    #[test]
    fn test_polygon_radius_recovers_circle() {
        let ring = circle_polygon(c(0.0, 0.0), 100.0, CIRCLE_SIDES);
        assert_eq!(ring.len(), CIRCLE_SIDES);
        assert!((polygon_radius(&ring) - 100.0).abs() < 1e-6);

        let ring = circle_polygon(c(500.0, -200.0), 2000.0, CIRCLE_SIDES);
        assert!((polygon_radius(&ring) - 2000.0).abs() < 1e-6);
    }

    #[test]
    fn test_extent_of() {
        let e = Extent::of(&[c(3.0, -1.0), c(-2.0, 4.0), c(0.0, 0.0)]).unwrap();
        assert_eq!(e, Extent::from_corners(c(-2.0, -1.0), c(3.0, 4.0)));
        assert_eq!(e.center(), c(0.5, 1.5));
        assert!(Extent::of(&[]).is_none());
    }

    #[test]
    fn test_extent_ring_and_emptiness() {
        let e = Extent::from_corners(c(4.0, 3.0), c(0.0, 0.0));
        assert_eq!(e.ring(), vec![c(0.0, 0.0), c(4.0, 0.0), c(4.0, 3.0), c(0.0, 3.0)]);
        assert_eq!(area(&e.ring()), 12.0);
        assert!(!e.is_empty());
        assert!(Extent::from_corners(c(1.0, 0.0), c(1.0, 5.0)).is_empty());
    }

    #[test]
    fn test_coord_serde_as_pair() {
        let parsed: Coord = serde_json::from_str("[3.5, -2]").unwrap();
        assert_eq!(parsed, c(3.5, -2.0));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "[3.5,-2.0]");
    }
}
