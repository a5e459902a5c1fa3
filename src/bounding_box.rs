use std::{fmt, str::FromStr};

use crate::error::{Error, Result};
use crate::tile::TileIndex;
use crate::zoom::ZoomRange;

/// A geographic bounding box in degrees.
///
/// # Example
/// ```rust
/// # use download_tiles::BoundingBox;
/// let aachen_germany: BoundingBox = "6.031,50.7492,6.1649,50.811".parse().unwrap();
/// assert_eq!(aachen_germany.min_lon, 6.031);
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// The whole world, `-180,-90,180,90`.
    pub const WORLD: BoundingBox = BoundingBox {
        min_lon: -180.0,
        min_lat: -90.0,
        max_lon: 180.0,
        max_lat: 90.0,
    };

    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Builds a bounding box from two corners given in any order.
    pub fn from_corners(lat1: f64, lat2: f64, lon1: f64, lon2: f64) -> Self {
        Self::new(lon1.min(lon2), lat1.min(lat2), lon1.max(lon2), lat1.max(lat2))
    }

    /// Creates an iterator over all tiles in the bounding box, ascending by
    /// zoom level and row-major within a level.
    pub fn tiles(&self, zoom: ZoomRange) -> impl Iterator<Item = TileIndex> + fmt::Debug {
        let bbox = *self;

        zoom.levels().flat_map(move |zoom| {
            let nw = TileIndex::from_coords_and_zoom(bbox.max_lat, bbox.min_lon, zoom);
            let se = TileIndex::from_coords_and_zoom(bbox.min_lat, bbox.max_lon, zoom);

            (nw.y..=se.y).flat_map(move |y| (nw.x..=se.x).map(move |x| TileIndex::new(zoom, x, y)))
        })
    }

    /// Number of tiles [`BoundingBox::tiles`] yields, without enumerating them.
    pub fn tile_count(&self, zoom: ZoomRange) -> u64 {
        zoom.levels()
            .map(|zoom| {
                let nw = TileIndex::from_coords_and_zoom(self.max_lat, self.min_lon, zoom);
                let se = TileIndex::from_coords_and_zoom(self.min_lat, self.max_lon, zoom);
                let cols = (u64::from(se.x) + 1).saturating_sub(u64::from(nw.x));
                let rows = (u64::from(se.y) + 1).saturating_sub(u64::from(nw.y));
                cols * rows
            })
            .sum()
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::WORLD
    }
}

/// Parses `min_lon,min_lat,max_lon,max_lat`. The order is taken as given.
impl FromStr for BoundingBox {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = || Error::invalid("bbox should be min-lon,min-lat,max-lon,max-lat");

        let values = s
            .split(',')
            .map(|token| {
                let token = token.trim();
                if is_decimal(token) {
                    token.parse::<f64>().map_err(|_| malformed())
                } else {
                    Err(malformed())
                }
            })
            .collect::<Result<Vec<f64>>>()?;

        match values.as_slice() {
            &[min_lon, min_lat, max_lon, max_lat] => {
                Ok(Self::new(min_lon, min_lat, max_lon, max_lat))
            }
            _ => Err(malformed()),
        }
    }
}

/// `[+-]digits[.digits]`
fn is_decimal(token: &str) -> bool {
    let unsigned = token.strip_prefix(['-', '+']).unwrap_or(token);
    let (int, frac) = match unsigned.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (unsigned, None),
    };
    let digits = |v: &str| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit());

    digits(int) && frac.map_or(true, digits)
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}
