use std::{f64::consts::PI, fmt};

use crate::zoom::MAX_ZOOM;

/// Latitude limit of the spherical Web Mercator projection, in degrees.
pub const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// A slippy-map tile address with x, y and z-coordinate.
/// ref: https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct TileIndex {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileIndex {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Projects a coordinate given in degrees onto the tile grid of `zoom`.
    ///
    /// Coordinates outside the projectable area are clamped to the edge
    /// tiles, so the result always satisfies `x, y <= 2^zoom - 1`.
    pub fn from_coords_and_zoom(lat_deg: f64, lon_deg: f64, zoom: u8) -> Self {
        // scale factor
        let n = 2_f64.powi(i32::from(zoom));
        let last = n - 1_f64;

        let lat_rad = lat_deg
            .clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT)
            .to_radians();
        let lon_deg = lon_deg.clamp(-180_f64, 180_f64);

        let x = ((lon_deg + 180_f64) / 360_f64 * n).floor();
        let y = ((1_f64 - lat_rad.tan().asinh() / PI) / 2_f64 * n).floor();

        Self::new(zoom, x.clamp(0_f64, last) as u32, y.clamp(0_f64, last) as u32)
    }

    /// Row number in the MBTiles (TMS) convention, which counts rows from
    /// the bottom of the grid instead of the top.
    pub fn tms_row(&self) -> u32 {
        ((1_u64 << self.z) - 1 - u64::from(self.y)) as u32
    }

    /// Inverse of [`TileIndex::tms_row`]. `None` if `row` lies outside the
    /// grid of zoom level `z`.
    pub fn from_tms(z: u8, column: u32, row: u32) -> Option<Self> {
        if z > MAX_ZOOM {
            return None;
        }
        let y = ((1_u32 << z) - 1).checked_sub(row)?;
        Some(Self::new(z, column, y))
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// A fetched tile, ready to be written to the archive.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TileRecord {
    pub index: TileIndex,
    pub data: Vec<u8>,
}

/// Image format of the tiles, as recorded in the archive's `format` entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TileFormat {
    Png,
    Jpg,
    Webp,
    Pbf,
}

impl TileFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TileFormat::Png => "png",
            TileFormat::Jpg => "jpg",
            TileFormat::Webp => "webp",
            TileFormat::Pbf => "pbf",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(TileFormat::Png),
            "jpg" | "jpeg" => Some(TileFormat::Jpg),
            "webp" => Some(TileFormat::Webp),
            "pbf" | "mvt" => Some(TileFormat::Pbf),
            _ => None,
        }
    }

    /// Guesses the format from the leading magic bytes of a tile.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(TileFormat::Png)
        } else if data.starts_with(&[0xff, 0xd8, 0xff]) {
            Some(TileFormat::Jpg)
        } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            Some(TileFormat::Webp)
        } else {
            None
        }
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
