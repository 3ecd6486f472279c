//! Great-circle distance between coordinates.

use super::types::Coordinate;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters.
pub fn distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Shift a coordinate north by `meters` (negative moves south).
pub fn offset_north(c: &Coordinate, meters: f64) -> Coordinate {
    let dlat = (meters / EARTH_RADIUS_M).to_degrees();
    Coordinate::new(c.lat + dlat, c.lon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_no_distance() {
        let c = Coordinate::new(37.0, -122.0);
        assert_eq!(distance(&c, &c), 0.0);
    }

    #[test]
    fn test_real_distance() {
        let stuttgart = Coordinate::new(48.7755, 9.1827);
        let mannheim = Coordinate::new(49.4836, 8.4630);
        let d = distance(&stuttgart, &mannheim);
        assert!(d > 92_000.0 && d < 96_000.0, "got {}", d);
    }

    #[test]
    fn test_symmetric() {
        let a = Coordinate::new(80.0, 0.0);
        let b = Coordinate::new(90.0, 20.0);
        assert_eq!(distance(&a, &b), distance(&b, &a));
    }

    #[test]
    fn test_offset_north_round_trips_distance() {
        let origin = Coordinate::new(37.0, -122.0);
        let moved = offset_north(&origin, 500.0);
        assert_relative_eq!(distance(&origin, &moved), 500.0, epsilon = 1e-6);
    }

    #[test]
    fn test_nan_propagates() {
        let a = Coordinate::new(10.0, f64::NAN);
        let b = Coordinate::new(20.0, 20.0);
        assert!(distance(&a, &b).is_nan());
    }
}
