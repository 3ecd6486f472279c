//! Core types for the location subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::LocationError;

/// A point on the globe, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = if self.lat >= 0.0 { 'N' } else { 'S' };
        let ew = if self.lon >= 0.0 { 'E' } else { 'W' };
        write!(f, "{:.4}\u{00B0}{}, {:.4}\u{00B0}{}", self.lat.abs(), ns, self.lon.abs(), ew)
    }
}

/// A raw fix as delivered by a positioning provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub coordinate: Coordinate,
    /// Radius of uncertainty in meters. Negative means unknown.
    pub horizontal_accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

impl Position {
    /// A fix stamped with the current time and unknown accuracy.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            coordinate: Coordinate::new(lat, lon),
            horizontal_accuracy: -1.0,
            timestamp: Utc::now(),
        }
    }

    pub fn with_accuracy(mut self, meters: f64) -> Self {
        self.horizontal_accuracy = meters;
        self
    }

    /// Great-circle distance to another fix, in meters.
    pub fn distance_from(&self, other: &Position) -> f64 {
        super::geo::distance(&self.coordinate, &other.coordinate)
    }
}

/// A resolved place. Equality only considers the raw fix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub physical: Position,
    pub city: String,
    pub state: String,
    pub neighborhood: String,
}

impl Location {
    pub fn new(
        physical: Position,
        city: impl Into<String>,
        state: impl Into<String>,
        neighborhood: impl Into<String>,
    ) -> Self {
        Self {
            physical,
            city: city.into(),
            state: state.into(),
            neighborhood: neighborhood.into(),
        }
    }

    pub fn display_line(&self) -> String {
        format!(
            "{}, {} ({}) @ {}",
            self.neighborhood, self.city, self.state, self.physical.coordinate
        )
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.physical == other.physical
    }
}

/// Why no location is available.
#[derive(Debug, Clone, PartialEq)]
pub enum Reason {
    /// Nothing has been resolved yet.
    NoData,
    Other(LocationError),
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoData => write!(f, "No location data yet"),
            Self::Other(e) => write!(f, "{}", e),
        }
    }
}

/// What the tracker currently believes the location is.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationResult {
    Success(Location),
    Failure(Reason),
}

impl LocationResult {
    pub fn location(&self) -> Option<&Location> {
        match self {
            Self::Success(location) => Some(location),
            Self::Failure(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl Default for LocationResult {
    fn default() -> Self {
        Self::Failure(Reason::NoData)
    }
}

/// Accuracy requested from the positioning provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Accuracy {
    #[default]
    Best,
    NearestTenMeters,
    HundredMeters,
    Kilometer,
}

/// Permission state reported by the positioning provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    NotDetermined,
    Restricted,
    Denied,
    AuthorizedAlways,
    AuthorizedWhenInUse,
}

/// Whether the platform gates location access behind a runtime prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationModel {
    /// Phone-style: updates only flow once "when in use" is granted.
    #[default]
    RuntimePermission,
    /// Desktop-style: no runtime prompt, updates always run.
    Unrestricted,
}

/// Application lifecycle transitions the tracker reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    EnterBackground,
    EnterForeground,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_equality_ignores_place_names() {
        let fix = Position::new(37.0, -122.0);
        let a = Location::new(fix.clone(), "SF", "CA", "SoMa");
        let b = Location::new(fix, "Oakland", "CA", "Downtown");
        assert_eq!(a, b);
    }

    #[test]
    fn test_location_inequality_on_position() {
        let a = Location::new(Position::new(37.0, -122.0), "SF", "CA", "SoMa");
        let b = Location::new(Position::new(37.001, -122.0), "SF", "CA", "SoMa");
        assert_ne!(a, b);
    }

    #[test]
    fn test_default_result_is_no_data() {
        assert_eq!(LocationResult::default(), LocationResult::Failure(Reason::NoData));
        assert!(LocationResult::default().location().is_none());
    }

    #[test]
    fn test_coordinate_display() {
        let c = Coordinate::new(37.7749, -122.4194);
        assert_eq!(c.to_string(), "37.7749\u{00B0}N, 122.4194\u{00B0}W");
    }

    #[test]
    fn test_coordinate_validity() {
        assert!(Coordinate::new(90.0, -180.0).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, 180.5).is_valid());
    }
}
