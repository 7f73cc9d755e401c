//! Conversions between scale denominators, web-map zoom levels and
//! the distance/altitude figures used by Google Maps and Google Earth.

/// Zoom used when a scale cannot be interpreted
pub const DEFAULT_ZOOM: f64 = 16.0;
/// Scale used when a zoom cannot be interpreted
pub const DEFAULT_SCALE: f64 = 20_000.0;
pub const MAX_ZOOM: f64 = 30.0;

/// Scale denominators for zoom 0..=23; higher zooms halve from the last entry
const SCALE_TABLE: [f64; 24] = [
    400_000_000.0,
    200_000_000.0,
    100_000_000.0,
    60_000_000.0,
    30_000_000.0,
    15_000_000.0,
    8_000_000.0,
    4_000_000.0,
    2_000_000.0,
    1_000_000.0,
    600_000.0,
    300_000.0,
    150_000.0,
    75_000.0,
    40_000.0,
    20_000.0,
    10_000.0,
    5_000.0,
    2_500.0,
    1_250.0,
    600.0,
    300.0,
    150.0,
    75.0,
];

/// Metres across the screen at a rounded zoom, as used by the `m` suffix of Google Maps links
const EARTH_DISTANCES: [f64; 21] = [
    20_000_000.0,
    10_000_000.0,
    5_000_000.0,
    2_000_000.0,
    1_000_000.0,
    500_000.0,
    200_000.0,
    100_000.0,
    50_000.0,
    20_000.0,
    10_000.0,
    5_000.0,
    2_000.0,
    1_000.0,
    500.0,
    200.0,
    100.0,
    50.0,
    20.0,
    10.0,
    5.0,
];

/// Scale denominator for an integer zoom level 0..=30
fn table_scale(zoom: usize) -> f64 {
    match SCALE_TABLE.get(zoom) {
        Some(scale) => *scale,
        None => {
            let last = SCALE_TABLE.len() - 1;
            let steps = zoom.min(MAX_ZOOM as usize) - last;
            SCALE_TABLE[last] / 2f64.powi(steps as i32)
        }
    }
}

/// Continuous zoom level for a scale denominator, by log-linear interpolation.
pub fn estimate_zoom_from_scale(scale: f64) -> f64 {
    if !scale.is_finite() || scale <= 0.0 {
        return DEFAULT_ZOOM;
    }
    if scale >= table_scale(0) {
        return 0.0;
    }
    let max = MAX_ZOOM as usize;
    if scale <= table_scale(max) {
        return MAX_ZOOM;
    }

    let target = scale.ln();
    for z in 0..max {
        let (s1, s2) = (table_scale(z), table_scale(z + 1));
        if s1 >= scale && scale >= s2 {
            let (l1, l2) = (s1.ln(), s2.ln());
            let t = if l1 != l2 { (target - l1) / (l2 - l1) } else { 0.0 };
            return (z as f64 + t).clamp(0.0, MAX_ZOOM);
        }
    }
    DEFAULT_ZOOM
}

/// Scale denominator for a (possibly fractional) zoom level.
pub fn estimate_scale_from_zoom(zoom: f64) -> f64 {
    if !zoom.is_finite() {
        return DEFAULT_SCALE;
    }
    let z = zoom.clamp(0.0, MAX_ZOOM);
    let (lower, upper) = (z.floor(), z.ceil());
    if lower == upper {
        return table_scale(lower as usize);
    }

    let (l1, l2) = (
        table_scale(lower as usize).ln(),
        table_scale(upper as usize).ln(),
    );
    let t = z - lower;
    (l1 + t * (l2 - l1)).exp()
}

/// Metres visible at a zoom level, from the Google Maps distance table
pub fn zoom_to_earth_distance(zoom: f64) -> f64 {
    if !zoom.is_finite() {
        return 5_000.0;
    }
    let idx = zoom.round_ties_even().clamp(0.0, (EARTH_DISTANCES.len() - 1) as f64) as usize;
    EARTH_DISTANCES[idx]
}

/// Best 0.1-step zoom for a Google Maps `...,<n>m` distance
pub fn zoom_from_earth_distance(metres: f64) -> f64 {
    let mut best_zoom = DEFAULT_ZOOM;
    let mut best_diff = f64::INFINITY;
    for step in 0..=300 {
        let zoom = step as f64 / 10.0;
        let diff = (zoom_to_earth_distance(zoom) - metres).abs();
        if diff < best_diff {
            best_diff = diff;
            best_zoom = zoom;
        }
    }
    best_zoom
}

/// Camera altitude in metres for a Google Earth link at this zoom
pub fn google_earth_altitude(zoom: f64) -> u64 {
    let altitude = 40_000_000.0 / 2f64.powf(zoom - 1.0);
    altitude.max(100.0) as u64
}

/// Inverse of [`google_earth_altitude`], for `@lat,lon,<n>a` links
pub fn zoom_from_google_earth_altitude(altitude: f64) -> f64 {
    if !altitude.is_finite() || altitude <= 0.0 {
        return DEFAULT_ZOOM;
    }
    (1.0 + (40_000_000.0 / altitude).log2()).clamp(0.0, MAX_ZOOM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_extrapolation() {
        assert_eq!(table_scale(23), 75.0);
        assert_eq!(table_scale(24), 37.5);
        assert_eq!(table_scale(30), 75.0 / 128.0);
    }

    #[test]
    fn test_zoom_from_scale_exact() {
        assert!((estimate_zoom_from_scale(10_000.0) - 16.0).abs() < 1e-9);
        assert!((estimate_zoom_from_scale(600_000.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_from_scale_interpolated() {
        let z = estimate_zoom_from_scale(1_000.0);
        assert!(z > 19.0 && z < 20.0, "{z}");
        assert_eq!(z.round(), 19.0);
    }

    #[test]
    fn test_zoom_from_scale_bounds() {
        assert_eq!(estimate_zoom_from_scale(1e12), 0.0);
        assert_eq!(estimate_zoom_from_scale(0.01), MAX_ZOOM);
        assert_eq!(estimate_zoom_from_scale(0.0), DEFAULT_ZOOM);
        assert_eq!(estimate_zoom_from_scale(-5.0), DEFAULT_ZOOM);
        assert_eq!(estimate_zoom_from_scale(f64::NAN), DEFAULT_ZOOM);
    }

    #[test]
    fn test_scale_from_zoom() {
        assert_eq!(estimate_scale_from_zoom(16.0), 10_000.0);
        assert_eq!(estimate_scale_from_zoom(-3.0), 400_000_000.0);
        assert_eq!(estimate_scale_from_zoom(f64::INFINITY), DEFAULT_SCALE);
        let s = estimate_scale_from_zoom(16.5);
        assert!(s < 10_000.0 && s > 5_000.0);
    }

    #[test]
    fn test_zoom_scale_inverse() {
        for zoom in [3.25, 9.5, 14.75, 21.1, 27.0] {
            let back = estimate_zoom_from_scale(estimate_scale_from_zoom(zoom));
            assert!((back - zoom).abs() < 1e-9, "{zoom} -> {back}");
        }
    }

    #[test]
    fn test_earth_distance() {
        assert_eq!(zoom_to_earth_distance(15.0), 200.0);
        assert_eq!(zoom_to_earth_distance(25.0), 5.0);
        assert_eq!(zoom_from_earth_distance(200.0), 14.6);
        assert_eq!(zoom_from_earth_distance(220.0), 14.6);
    }

    #[test]
    fn test_earth_distance_halves_round_to_even() {
        assert_eq!(zoom_to_earth_distance(14.5), zoom_to_earth_distance(14.0));
        assert_eq!(zoom_to_earth_distance(15.5), zoom_to_earth_distance(16.0));
        assert_eq!(zoom_to_earth_distance(14.51), 200.0);
    }

    #[test]
    fn test_google_earth_altitude() {
        assert_eq!(google_earth_altitude(1.0), 40_000_000);
        assert_eq!(google_earth_altitude(17.0), 610);
        assert_eq!(google_earth_altitude(25.0), 100);
        assert!((zoom_from_google_earth_altitude(610.3515625) - 17.0).abs() < 1e-9);
    }
}
