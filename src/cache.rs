use std::{
    io,
    path::{Path, PathBuf},
};
use tokio::fs;
use tracing::{debug, warn};

use crate::tile::TileIndex;

/// On-disk tile cache laid out as `<root>/<z>/<x>/<y>.<ext>`.
#[derive(Clone, Debug)]
pub struct TileCache {
    root: PathBuf,
    extension: String,
}

impl TileCache {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, tile: &TileIndex) -> PathBuf {
        let mut target = self.root.join(tile.z.to_string());
        target.push(tile.x.to_string());
        target.push(format!("{}.{}", tile.y, self.extension));
        target
    }

    /// Returns the cached bytes of `tile`. Unreadable entries count as misses.
    pub async fn get(&self, tile: &TileIndex) -> Option<Vec<u8>> {
        let path = self.path_of(tile);

        match fs::read(&path).await {
            Ok(data) => {
                debug!(%tile, path = %path.display(), "cache hit");
                Some(data)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(%tile, path = %path.display(), error = %e, "failed reading cached tile");
                None
            }
        }
    }

    /// Stores `data` for `tile`. Failures are logged, never propagated.
    pub async fn put(&self, tile: &TileIndex, data: &[u8]) {
        if let Err(e) = self.try_put(tile, data).await {
            warn!(%tile, error = %e, "failed writing tile to cache");
        }
    }

    async fn try_put(&self, tile: &TileIndex, data: &[u8]) -> io::Result<()> {
        let path = self.path_of(tile);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // write-then-rename so an interrupted run never leaves a truncated tile
        let partial = path.with_extension(format!("{}.part", self.extension));
        fs::write(&partial, data).await?;
        fs::rename(&partial, &path).await
    }
}
