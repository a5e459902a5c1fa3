use anyhow::{anyhow, Result};
use clap::Parser;
use std::{path::PathBuf, time::Duration};

use download_tiles::validators::{
    parse_bbox, parse_subdomains, parse_zoom_levels, validate_tiles_url,
};
use download_tiles::{
    resolve_attribution, resolve_name, BoundingBox, Config, FailurePolicy, PlaceKind, UrlFormat,
    ZoomRange, DEFAULT_GEOCODER_URL, DEFAULT_TILES_URL, DEFAULT_USER_AGENT,
};

/// Download map tiles and store them in an MBTiles database.
///
/// Please use this tool responsibly, and respect the OpenStreetMap tile usage
/// policy: https://operations.osmfoundation.org/policies/tiles/
#[derive(Parser, Debug)]
#[command(version, about, long_about)]
pub struct Args {
    /// The MBTiles file to write to
    #[arg(required_unless_present_any = ["show_bbox", "dry_run"])]
    pub mbtiles: Option<PathBuf>,

    /// Zoom levels, a single number or a low-high range
    #[arg(
        short,
        long,
        value_name = "LEVELS",
        default_value = "0-3",
        value_parser = parse_zoom_levels
    )]
    pub zoom_levels: ZoomRange,

    /// Bounding box of tiles to retrieve: min-lon,min-lat,max-lon,max-lat
    #[arg(
        short,
        long,
        value_name = "LON,LAT,LON,LAT",
        default_value = "-180.0,-90.0,180.0,90.0",
        allow_hyphen_values = true,
        value_parser = parse_bbox
    )]
    pub bbox: BoundingBox,

    /// Tile URL server to use, with `{z}`, `{x}` and `{y}` specifiers.
    /// Defaults to OpenStreetMap.
    #[arg(long, value_name = "TEMPLATE", value_parser = validate_tiles_url)]
    pub tiles_url: Option<String>,

    /// Subdomains to use in the `{s}` parameter
    #[arg(long, value_name = "CSV", default_value = "a,b,c", value_parser = parse_subdomains)]
    pub tiles_subdomains: ::std::vec::Vec<String>,

    /// Country to find bounding box for
    #[arg(long, value_name = "NAME", conflicts_with = "city")]
    pub country: Option<String>,

    /// City to find bounding box for
    #[arg(long, value_name = "NAME")]
    pub city: Option<String>,

    /// Show country or city bounding box without downloading tiles
    #[arg(long)]
    pub show_bbox: bool,

    /// Geocoding endpoint used for --country and --city
    #[arg(long, value_name = "URL", default_value = DEFAULT_GEOCODER_URL)]
    pub geocoder_url: String,

    /// User-Agent header to send with tile requests
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Attribution to write to the metadata table
    #[arg(long)]
    pub attribution: Option<String>,

    /// Name to write to the metadata table
    #[arg(long)]
    pub name: Option<String>,

    /// Verbose mode - show detailed logs
    #[arg(long)]
    pub verbose: bool,

    /// Folder to cache tiles between runs
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,

    /// The amount of tiles fetched in parallel
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..))]
    pub rate: u8,

    /// The amount of times to retry a failed HTTP request
    #[arg(long, default_value_t = 0)]
    pub retries: u8,

    /// The timeout (in seconds) for fetching a single tile. Pass 0 for no timeout.
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,

    /// Skip tiles that fail to download instead of aborting the run
    #[arg(long)]
    pub skip_failed: bool,

    /// Don't actually fetch anything, just determine how many tiles would be fetched
    #[arg(long)]
    pub dry_run: bool,
}

impl Args {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// The place to geocode, if any.
    pub fn place(&self) -> Option<(PlaceKind, &str)> {
        match (&self.country, &self.city) {
            (Some(country), _) => Some((PlaceKind::Country, country.as_str())),
            (None, Some(city)) => Some((PlaceKind::City, city.as_str())),
            (None, None) => None,
        }
    }

    /// The tile URL template combined with the subdomain list.
    pub fn url_format(&self) -> download_tiles::Result<UrlFormat> {
        UrlFormat::new(
            self.tiles_url.as_deref().unwrap_or(DEFAULT_TILES_URL),
            self.tiles_subdomains.clone(),
        )
    }

    /// Builds the run configuration once the bounding box is resolved.
    pub fn into_config(
        self,
        url: UrlFormat,
        bounding_box: BoundingBox,
        display_name: Option<String>,
    ) -> Result<Config> {
        let output = self
            .mbtiles
            .ok_or_else(|| anyhow!("mbtiles argument is required"))?;
        let custom_tiles_url = self.tiles_url.is_some();

        Ok(Config {
            bounding_box,
            zoom: self.zoom_levels,
            url,
            output,
            timeout: Duration::from_secs(self.timeout),
            user_agent: self.user_agent,
            cache_dir: self.cache_dir,
            name: resolve_name(self.name, display_name),
            attribution: resolve_attribution(self.attribution, custom_tiles_url),
            fetch_rate: usize::from(self.rate),
            request_retries_amount: self.retries,
            on_failure: if self.skip_failed {
                FailurePolicy::Skip
            } else {
                FailurePolicy::Abort
            },
            show_progress: false,
        })
    }
}
