//! Display formatting for measurement values

const KM: f64 = 1_000.0;
const KM2: f64 = 1_000_000.0;

/// Round to two decimals; `Display` then drops trailing zeros ("5", "2.35")
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format a length in metres, switching to km from 1000 m
///
/// The threshold applies to the rounded value, so nothing prints as "1000 m".
pub fn format_length(metres: f64) -> String {
    if round2(metres) >= KM {
        format!("{} km", round2(metres / KM))
    } else {
        format!("{} m", round2(metres))
    }
}

/// Format an area in square metres, switching to km² from 1 000 000 m²
pub fn format_area(square_metres: f64) -> String {
    if round2(square_metres) >= KM2 {
        format!("{} km²", round2(square_metres / KM2))
    } else {
        format!("{} m²", round2(square_metres))
    }
}

/// Radii use the same units as lengths
pub fn format_radius(metres: f64) -> String {
    format_length(metres)
}

/// Format an angle in degrees, always with one decimal
pub fn format_angle(degrees: f64) -> String {
    format!("{degrees:.1} °")
}
