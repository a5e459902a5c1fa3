//! Parsers for user-supplied arguments. All of them fail with
//! [`Error::InvalidArgument`](crate::Error::InvalidArgument) and can be used
//! directly as clap value parsers.

use crate::bounding_box::BoundingBox;
use crate::error::{Error, Result};
use crate::url;
use crate::zoom::ZoomRange;

/// Parses `N` or `N-M` with `0 <= N <= M <= 24`.
pub fn parse_zoom_levels(v: &str) -> Result<ZoomRange> {
    v.parse()
}

/// Parses `min_lon,min_lat,max_lon,max_lat`.
pub fn parse_bbox(v: &str) -> Result<BoundingBox> {
    v.parse()
}

/// Accepts any tile URL template containing `{z}`, `{x}` and `{y}`.
pub fn validate_tiles_url(v: &str) -> Result<String> {
    url::validate_template(v)?;
    Ok(v.to_owned())
}

/// Splits a comma separated subdomain list, trimming whitespace. At least one
/// subdomain must remain.
pub fn parse_subdomains(v: &str) -> Result<Vec<String>> {
    let subdomains: Vec<String> = v
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect();

    if subdomains.is_empty() {
        return Err(Error::invalid(
            "tiles-subdomains should list at least one subdomain",
        ));
    }
    Ok(subdomains)
}
