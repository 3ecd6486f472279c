//! Location tracking subsystem for Luna.
//!
//! Receives raw fixes from a positioning provider, filters out small moves,
//! reverse-geocodes the rest into city/state/neighborhood, and notifies
//! observers when the resolved location changes.

pub mod error;
pub mod geo;
pub mod geocoder;
pub mod providers;
pub mod tracker;
pub mod types;

pub use error::{GeocodeError, LocationError, ProviderError};
pub use geocoder::{BuiltinGeocoder, NominatimGeocoder, Placemark, ReverseGeocoder};
pub use providers::{PositioningDelegate, PositioningProvider, ReplayEvent, ReplayProvider};
pub use tracker::{LocationTracker, ObserverId, UPDATE_THRESHOLD_M};
pub use types::{
    Accuracy, AuthorizationModel, AuthorizationStatus, Coordinate, LifecycleEvent, Location,
    LocationResult, Position, Reason,
};
