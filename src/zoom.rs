use std::{fmt, ops::RangeInclusive, str::FromStr};

use crate::error::{Error, Result};

/// Highest zoom level of the slippy-map scheme.
pub const MAX_ZOOM: u8 = 24;

/// An inclusive range of zoom levels, `low <= high <= 24`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ZoomRange {
    low: u8,
    high: u8,
}

impl ZoomRange {
    pub fn new(low: u8, high: u8) -> Result<Self> {
        if high < low {
            return Err(Error::invalid("zoom-levels should be a low-high range"));
        }
        if high > MAX_ZOOM {
            return Err(Error::invalid(format!(
                "Maximum zoom level is {}",
                MAX_ZOOM
            )));
        }

        Ok(Self { low, high })
    }

    pub fn single(zoom: u8) -> Result<Self> {
        Self::new(zoom, zoom)
    }

    pub fn low(&self) -> u8 {
        self.low
    }

    pub fn high(&self) -> u8 {
        self.high
    }

    pub fn levels(&self) -> RangeInclusive<u8> {
        self.low..=self.high
    }
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self { low: 0, high: 3 }
    }
}

/// Parses `N` or `N-M`.
impl FromStr for ZoomRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let malformed =
            || Error::invalid("zoom-levels should be a single number or a 3-7 number range");

        let (low, high) = match s.split_once('-') {
            Some((low, high)) => (low, Some(high)),
            None => (s, None),
        };

        let level = |v: &str| -> Result<u8> {
            if v.is_empty() || !v.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            // all digits, so a failed parse can only mean overflow
            v.parse::<u8>().map_err(|_| {
                Error::invalid(format!("Maximum zoom level is {}", MAX_ZOOM))
            })
        };

        let low = level(low)?;
        let high = match high {
            Some(high) => level(high)?,
            None => low,
        };

        Self::new(low, high)
    }
}

impl fmt::Display for ZoomRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.low == self.high {
            write!(f, "{}", self.low)
        } else {
            write!(f, "{}-{}", self.low, self.high)
        }
    }
}
