//! Reverse geocoders: Nominatim and a built-in offline dataset.

use std::time::Duration;

use log::debug;
use serde::Deserialize;

use super::error::GeocodeError;
use super::geo;
use super::types::{Coordinate, Position};

/// A place candidate returned by a reverse geocoder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placemark {
    /// City.
    pub locality: Option<String>,
    /// State, province or region.
    pub administrative_area: Option<String>,
    /// Neighborhood.
    pub sub_locality: Option<String>,
    /// ISO 3166-1 alpha-2, upper case.
    pub country_code: Option<String>,
}

pub type GeocodeResponse = Result<Vec<Placemark>, GeocodeError>;

/// Called exactly once with the geocoder's answer.
pub type GeocodeCompletion = Box<dyn FnOnce(GeocodeResponse)>;

/// Resolves a fix to place candidates.
///
/// The completion may run before `reverse_geocode` returns or at any later
/// point on the same thread. Callers must not hold borrows across the call.
pub trait ReverseGeocoder {
    fn reverse_geocode(&self, position: &Position, completion: GeocodeCompletion);
}

// ─── Nominatim ──────────────────────────────────────────────────

pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = concat!("Luna/", env!("CARGO_PKG_VERSION"));

#[derive(Deserialize, Debug, Default)]
struct NominatimReverse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    address: Option<NominatimAddress>,
}

#[derive(Deserialize, Debug, Default)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    state: Option<String>,
    region: Option<String>,
    suburb: Option<String>,
    neighbourhood: Option<String>,
    quarter: Option<String>,
    city_district: Option<String>,
    country_code: Option<String>,
}

impl NominatimReverse {
    fn into_placemarks(self) -> Vec<Placemark> {
        if let Some(msg) = self.error {
            debug!("Nominatim reverse returned no place: {}", msg);
            return Vec::new();
        }
        let Some(a) = self.address else {
            return Vec::new();
        };
        vec![Placemark {
            locality: a.city.or(a.town).or(a.village).or(a.municipality),
            administrative_area: a.state.or(a.region),
            sub_locality: a.suburb.or(a.neighbourhood).or(a.quarter).or(a.city_district),
            country_code: a.country_code.map(|cc| cc.to_uppercase()),
        }]
    }
}

/// Reverse geocoding against a Nominatim server. Requests are blocking; the
/// completion runs before `reverse_geocode` returns.
pub struct NominatimGeocoder {
    base_url: String,
    user_agent: String,
    language: Option<String>,
    timeout: Duration,
}

impl NominatimGeocoder {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_NOMINATIM_URL.into(),
            user_agent: DEFAULT_USER_AGENT.into(),
            language: None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn fetch(&self, coordinate: &Coordinate) -> GeocodeResponse {
        let url = format!("{}/reverse", self.base_url);
        let mut request = ureq::get(&url)
            .set("User-Agent", &self.user_agent)
            .timeout(self.timeout)
            .query("format", "jsonv2")
            .query("lat", &coordinate.lat.to_string())
            .query("lon", &coordinate.lon.to_string())
            .query("zoom", "18")
            .query("addressdetails", "1");
        if let Some(ref lang) = self.language {
            request = request.query("accept-language", lang);
        }

        let response = request
            .call()
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        let body: NominatimReverse = response
            .into_json()
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

        Ok(body.into_placemarks())
    }
}

impl Default for NominatimGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReverseGeocoder for NominatimGeocoder {
    fn reverse_geocode(&self, position: &Position, completion: GeocodeCompletion) {
        debug!("Nominatim reverse lookup for {}", position.coordinate);
        completion(self.fetch(&position.coordinate));
    }
}

// ─── Built-in dataset ───────────────────────────────────────────

struct BuiltinNeighborhood {
    neighborhood: &'static str,
    city: &'static str,
    state: &'static str,
    country_code: &'static str,
    lat: f64,
    lon: f64,
}

const BUILTIN_NEIGHBORHOODS: &[BuiltinNeighborhood] = &[
    BuiltinNeighborhood {
        neighborhood: "SoMa", city: "San Francisco", state: "CA",
        country_code: "US", lat: 37.7785, lon: -122.4056,
    },
    BuiltinNeighborhood {
        neighborhood: "Mission District", city: "San Francisco", state: "CA",
        country_code: "US", lat: 37.7599, lon: -122.4148,
    },
    BuiltinNeighborhood {
        neighborhood: "Downtown", city: "Oakland", state: "CA",
        country_code: "US", lat: 37.8044, lon: -122.2712,
    },
    BuiltinNeighborhood {
        neighborhood: "Williamsburg", city: "New York", state: "NY",
        country_code: "US", lat: 40.7081, lon: -73.9571,
    },
    BuiltinNeighborhood {
        neighborhood: "Camden Town", city: "London", state: "England",
        country_code: "GB", lat: 51.5390, lon: -0.1426,
    },
    BuiltinNeighborhood {
        neighborhood: "Le Marais", city: "Paris", state: "Île-de-France",
        country_code: "FR", lat: 48.8575, lon: 2.3588,
    },
    BuiltinNeighborhood {
        neighborhood: "Kreuzberg", city: "Berlin", state: "Berlin",
        country_code: "DE", lat: 52.4986, lon: 13.4030,
    },
    BuiltinNeighborhood {
        neighborhood: "Södermalm", city: "Stockholm", state: "Stockholm County",
        country_code: "SE", lat: 59.3150, lon: 18.0710,
    },
    BuiltinNeighborhood {
        neighborhood: "Shibuya", city: "Tokyo", state: "Tokyo",
        country_code: "JP", lat: 35.6618, lon: 139.7041,
    },
];

/// Offline geocoder: nearest built-in neighborhood within a radius.
pub struct BuiltinGeocoder {
    radius_m: f64,
}

impl BuiltinGeocoder {
    pub const DEFAULT_RADIUS_M: f64 = 5_000.0;

    pub fn new() -> Self {
        Self { radius_m: Self::DEFAULT_RADIUS_M }
    }

    pub fn with_radius(radius_m: f64) -> Self {
        Self { radius_m }
    }

    pub fn lookup(&self, coordinate: &Coordinate) -> Option<Placemark> {
        BUILTIN_NEIGHBORHOODS
            .iter()
            .map(|n| (n, geo::distance(coordinate, &Coordinate::new(n.lat, n.lon))))
            .filter(|(_, d)| *d <= self.radius_m)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(n, _)| Placemark {
                locality: Some(n.city.into()),
                administrative_area: Some(n.state.into()),
                sub_locality: Some(n.neighborhood.into()),
                country_code: Some(n.country_code.into()),
            })
    }
}

impl Default for BuiltinGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReverseGeocoder for BuiltinGeocoder {
    fn reverse_geocode(&self, position: &Position, completion: GeocodeCompletion) {
        completion(Ok(self.lookup(&position.coordinate).into_iter().collect()));
    }
}
