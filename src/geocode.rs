use reqwest::Client;
use serde::Deserialize;
use std::{fmt, str::FromStr};
use tracing::{info, instrument};

use crate::bounding_box::BoundingBox;
use crate::error::{Error, Result};

pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/";

/// What kind of place a geocoding query names.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlaceKind {
    Country,
    City,
}

impl PlaceKind {
    /// Query parameter carrying the place name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceKind::Country => "country",
            PlaceKind::City => "city",
        }
    }
}

impl fmt::Display for PlaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved place.
#[derive(Clone, Debug, PartialEq)]
pub struct Place {
    pub bounding_box: BoundingBox,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    boundingbox: Vec<Coordinate>,
    display_name: Option<String>,
}

/// Nominatim encodes coordinates as strings; accept plain numbers too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Coordinate {
    Text(String),
    Number(f64),
}

impl Coordinate {
    fn value(&self) -> Option<f64> {
        match self {
            Coordinate::Text(text) => f64::from_str(text.trim()).ok(),
            Coordinate::Number(value) => Some(*value),
        }
    }
}

impl SearchResult {
    /// `boundingbox` is `[lat, lat, lon, lon]` without a guaranteed order.
    fn into_place(self) -> Option<Place> {
        let values = self
            .boundingbox
            .iter()
            .map(Coordinate::value)
            .collect::<Option<Vec<f64>>>()?;

        match values.as_slice() {
            &[lat1, lat2, lon1, lon2] => Some(Place {
                bounding_box: BoundingBox::from_corners(lat1, lat2, lon1, lon2),
                display_name: self.display_name,
            }),
            _ => None,
        }
    }
}

/// Client for a Nominatim-compatible search endpoint.
#[derive(Clone, Debug)]
pub struct Geocoder {
    client: Client,
    endpoint: String,
}

impl Geocoder {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Looks up `name` and returns the bounding box of the first result.
    #[instrument(skip(self))]
    pub async fn lookup(&self, kind: PlaceKind, name: &str) -> Result<Place> {
        let res = self
            .client
            .get(&self.endpoint)
            .query(&[(kind.as_str(), name), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(|e| Error::LookupFailed(format!("{} '{}': {}", kind, name, e)))?;

        info!(status = %res.status(), "fetched geocoding results");

        let results = res.json::<Vec<SearchResult>>().await.map_err(|e| {
            Error::LookupFailed(format!("{} '{}': unparseable response: {}", kind, name, e))
        })?;

        results
            .into_iter()
            .next()
            .ok_or_else(|| Error::LookupFailed(format!("no results for {} '{}'", kind, name)))?
            .into_place()
            .ok_or_else(|| {
                Error::LookupFailed(format!(
                    "{} '{}': result has no usable bounding box",
                    kind, name
                ))
            })
    }
}
