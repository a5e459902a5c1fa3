use maplit::hashmap;
use std::fmt;
use strfmt::strfmt;

use crate::error::{Error, Result};
use crate::tile::{TileFormat, TileIndex};

pub const DEFAULT_TILES_URL: &str = "http://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const DEFAULT_SUBDOMAINS: &[&str] = &["a", "b", "c"];

const REQUIRED_PLACEHOLDERS: &[&str] = &["{z}", "{x}", "{y}"];

/// Checks that `template` contains `{z}`, `{x}` and `{y}`.
pub fn validate_template(template: &str) -> Result<()> {
    let missing: Vec<&str> = REQUIRED_PLACEHOLDERS
        .iter()
        .copied()
        .filter(|p| !template.contains(p))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::invalid(format!(
            "tiles-url should include {} (missing {})",
            REQUIRED_PLACEHOLDERS.join(", "),
            missing.join(", ")
        )))
    }
}

/// A validated tile URL template together with the subdomains substituted
/// for `{s}`.
#[derive(Clone, PartialEq)]
pub struct UrlFormat {
    format_str: String,
    subdomains: Vec<String>,
}

impl UrlFormat {
    pub fn new(format_str: impl Into<String>, subdomains: Vec<String>) -> Result<Self> {
        let format_str = format_str.into();
        validate_template(&format_str)?;

        if format_str.contains("{s}") && subdomains.is_empty() {
            return Err(Error::invalid(
                "tiles-subdomains must not be empty when tiles-url contains {s}",
            ));
        }

        Ok(Self {
            format_str,
            subdomains,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.format_str
    }

    /// Formats the URL of `tile`. The `{s}` subdomain is picked by rotating
    /// through the subdomain list with `index`.
    pub fn tile_url(&self, tile: &TileIndex, index: usize) -> Result<String> {
        let subdomain = match self.subdomains.len() {
            0 => String::new(),
            len => self.subdomains[index % len].clone(),
        };
        let vars = hashmap! {
            "s".to_owned() => subdomain,
            "x".to_owned() => tile.x.to_string(),
            "y".to_owned() => tile.y.to_string(),
            "z".to_owned() => tile.z.to_string(),
        };

        strfmt(&self.format_str, &vars)
            .map_err(|e| Error::fetch_failed(*tile, format!("failed formatting URL: {}", e)))
    }

    /// File extension of the template's path, e.g. `png`.
    pub fn extension(&self) -> Option<&str> {
        let path = self
            .format_str
            .split(|c: char| c == '?' || c == '#')
            .next()
            .unwrap_or_default();
        let last_segment = path.rsplit('/').next().unwrap_or_default();
        let (_, ext) = last_segment.rsplit_once('.')?;

        if !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
            Some(ext)
        } else {
            None
        }
    }

    pub fn tile_format(&self) -> Option<TileFormat> {
        self.extension().and_then(TileFormat::from_extension)
    }
}

impl Default for UrlFormat {
    fn default() -> Self {
        Self {
            format_str: DEFAULT_TILES_URL.to_owned(),
            subdomains: DEFAULT_SUBDOMAINS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl fmt::Debug for UrlFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlFormat")
            .field("format_str", &self.format_str)
            .field("subdomains", &self.subdomains)
            .finish()
    }
}
