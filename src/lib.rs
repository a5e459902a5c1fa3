//! Download map tiles covering a bounding box and store them in an
//! [MBTiles](https://github.com/mapbox/mbtiles-spec) archive.
//!
//! **Use with caution.** Downloading tiles en-masse can easily overload a
//! tile server. Respect the usage policy of the server you fetch from, e.g.
//! <https://operations.osmfoundation.org/policies/tiles/>.
//!
//! # CLI Example
//!
//! ```bash
//! download-tiles world.mbtiles --zoom-levels 0-3
//! download-tiles madagascar.mbtiles --country madagascar -z 0-6
//! download-tiles --city london --show-bbox
//! ```
//!
//! # Library Example
//! ```rust,no_run
//! use download_tiles::{fetch, Config, UrlFormat};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mut config = Config::new("aachen.mbtiles");
//! config.bounding_box = "6.031,50.7492,6.1649,50.811".parse().unwrap();
//! config.zoom = "10-14".parse().unwrap();
//! config.url = UrlFormat::new(
//!     "https://{s}.tile.openstreetmap.de/{z}/{x}/{y}.png",
//!     vec!["a".into(), "b".into(), "c".into()],
//! )
//! .unwrap();
//!
//! let summary = fetch(config).await.expect("failed fetching tiles");
//! println!("{} tiles written", summary.written());
//! # }
//! ```

mod archive;
mod bounding_box;
mod cache;
mod config;
mod error;
mod fetch;
mod geocode;
mod tile;
mod url;
pub mod validators;
mod zoom;

pub use archive::{Archive, ArchiveWriter};
pub use bounding_box::BoundingBox;
pub use cache::TileCache;
pub use config::{
    resolve_attribution, resolve_name, Config, FailurePolicy, DEFAULT_ATTRIBUTION,
    DEFAULT_USER_AGENT,
};
pub use error::{Error, Result};
pub use fetch::{fetch, fetch_with_client, http_client, Fetcher, Origin, Summary};
pub use geocode::{Geocoder, Place, PlaceKind, DEFAULT_GEOCODER_URL};
pub use tile::{TileFormat, TileIndex, TileRecord, MERCATOR_MAX_LAT};
pub use url::{UrlFormat, DEFAULT_SUBDOMAINS, DEFAULT_TILES_URL};
pub use zoom::{ZoomRange, MAX_ZOOM};
