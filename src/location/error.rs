//! Errors carried inside `Reason::Other`.

use thiserror::Error;

/// Failure reported by a positioning provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Location access denied")]
    Denied,
    #[error("Location currently unknown")]
    LocationUnknown,
    #[error("Positioning error: {0}")]
    Other(String),
}

/// Failure reported by a reverse geocoder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodeError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid geocoder response: {0}")]
    InvalidResponse(String),
}

/// Anything that stops a fix from becoming a `Location`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error("Geocoder returned no placemark")]
    NoPlacemark,

    #[error("Placemark is missing {missing}")]
    IncompletePlacemark { missing: &'static str },
}
