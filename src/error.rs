use thiserror::Error;

use crate::tile::TileIndex;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed bounding box, zoom range or tile URL template.
    #[error("{0}")]
    InvalidArgument(String),

    #[error("geocoding lookup failed: {0}")]
    LookupFailed(String),

    #[error("failed fetching tile {tile}: {reason}")]
    FetchFailed { tile: TileIndex, reason: String },

    #[error("failed writing archive: {0}")]
    ArchiveWriteFailed(#[from] rusqlite::Error),

    /// The archive writer task panicked or hung up before the run finished.
    #[error("failed writing archive: {0}")]
    WriterStopped(String),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub(crate) fn fetch_failed(tile: TileIndex, reason: impl ToString) -> Self {
        Error::FetchFailed {
            tile,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
