use std::{fmt::Debug, path::PathBuf, time::Duration};

use crate::bounding_box::BoundingBox;
use crate::tile::TileIndex;
use crate::url::UrlFormat;
use crate::zoom::ZoomRange;

pub const DEFAULT_ATTRIBUTION: &str = "© OpenStreetMap contributors";
pub const DEFAULT_USER_AGENT: &str = concat!("download-tiles/", env!("CARGO_PKG_VERSION"));

/// What to do when a single tile cannot be fetched.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FailurePolicy {
    /// Stop and roll back the whole run.
    #[default]
    Abort,
    /// Log the failure and continue with the next tile.
    Skip,
}

/// Tile download configuration.
#[derive(Debug, PartialEq)]
pub struct Config {
    pub bounding_box: BoundingBox,

    pub zoom: ZoomRange,

    /// The tile URL template, including the replacement specifiers `{x}`,
    /// `{y}` and `{z}`.
    pub url: UrlFormat,

    /// The MBTiles file to write to.
    pub output: PathBuf,

    pub user_agent: String,

    /// Folder to cache tiles in between runs.
    pub cache_dir: Option<PathBuf>,

    /// Value of the `name` metadata entry.
    pub name: Option<String>,

    /// Value of the `attribution` metadata entry.
    pub attribution: Option<String>,

    /// Maximum number of requests in flight.
    pub fetch_rate: usize,

    /// How many times to retry a failed HTTP request.
    pub request_retries_amount: u8,

    /// Timeout for fetching a single tile.
    ///
    /// Pass the zero duration to disable the timeout.
    pub timeout: Duration,

    pub on_failure: FailurePolicy,

    pub show_progress: bool,
}

impl Config {
    /// A configuration fetching the default OpenStreetMap tiles of the whole
    /// world at zoom levels 0-3 into `output`.
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            bounding_box: BoundingBox::WORLD,
            zoom: ZoomRange::default(),
            url: UrlFormat::default(),
            output: output.into(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            cache_dir: None,
            name: None,
            attribution: Some(DEFAULT_ATTRIBUTION.to_owned()),
            fetch_rate: 1,
            request_retries_amount: 0,
            timeout: Duration::from_secs(30),
            on_failure: FailurePolicy::Abort,
            show_progress: false,
        }
    }

    /// Creates an iterator iterating over all tiles in the contained bounding box.
    pub fn tiles(&self) -> impl Iterator<Item = TileIndex> + Debug {
        self.bounding_box.tiles(self.zoom)
    }

    /// Name recorded in the archive: the explicit name, else the archive's
    /// file stem.
    pub fn archive_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| {
                self.output
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
            })
            .unwrap_or_else(|| "noname".into())
    }
}

/// An explicit attribution always wins. Without one, the default tile
/// source gets the OpenStreetMap attribution and custom sources get none.
pub fn resolve_attribution(explicit: Option<String>, custom_tiles_url: bool) -> Option<String> {
    match explicit {
        Some(attribution) => Some(attribution),
        None if !custom_tiles_url => Some(DEFAULT_ATTRIBUTION.to_owned()),
        None => None,
    }
}

/// An explicit name wins over the display name of a geocoded place.
pub fn resolve_name(explicit: Option<String>, display_name: Option<String>) -> Option<String> {
    explicit.or(display_name)
}
