use futures::{prelude::*, stream};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{header::HeaderMap, Client, StatusCode};
use std::{path::Path, time::Duration};
use tokio::{sync::mpsc, task};
use tracing::{debug, info, instrument, warn};

use crate::archive::Archive;
use crate::cache::TileCache;
use crate::config::{Config, FailurePolicy};
use crate::error::{Error, Result};
use crate::tile::{TileFormat, TileIndex, TileRecord};
use crate::url::UrlFormat;

pub(crate) const BACKOFF_DELAY: Duration = Duration::from_secs(2);
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);
const WRITE_QUEUE_LEN: usize = 64;
const ZERO_DURATION: Duration = Duration::from_secs(0);

/// Builds the HTTP client used for tiles and geocoding.
pub fn http_client(user_agent: &str, timeout: Duration) -> Result<Client> {
    let mut builder = Client::builder().user_agent(user_agent);
    if timeout > ZERO_DURATION {
        builder = builder.timeout(timeout);
    }

    builder
        .build()
        .map_err(|e| Error::invalid(format!("failed creating HTTP client: {}", e)))
}

/// Where a tile's bytes came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Origin {
    Network,
    Cache,
}

/// Fetches single tiles over HTTP, going through the cache when one is
/// configured.
#[derive(Debug)]
pub struct Fetcher {
    client: Client,
    url: UrlFormat,
    cache: Option<TileCache>,
    retries: u8,
}

impl Fetcher {
    pub fn new(client: Client, url: UrlFormat, cache: Option<TileCache>, retries: u8) -> Self {
        Self {
            client,
            url,
            cache,
            retries,
        }
    }

    /// Fetches `tile`, the `index`-th tile of the run.
    #[instrument(skip(self))]
    pub async fn fetch_tile(&self, tile: TileIndex, index: usize) -> Result<(Vec<u8>, Origin)> {
        if let Some(cache) = &self.cache {
            if let Some(data) = cache.get(&tile).await {
                return Ok((data, Origin::Cache));
            }
        }

        let url = self.url.tile_url(&tile, index)?;
        let data = self.download(tile, &url).await?;

        if let Some(cache) = &self.cache {
            cache.put(&tile, &data).await;
        }

        Ok((data, Origin::Network))
    }

    async fn download(&self, tile: TileIndex, url: &str) -> Result<Vec<u8>> {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let last_attempt = attempt > u32::from(self.retries);

            debug!(url, attempt, "requesting tile");
            let res = match self.client.get(url).send().await {
                Ok(res) => res,
                Err(e) if last_attempt => return Err(Error::fetch_failed(tile, e)),
                Err(e) => {
                    warn!(%tile, error = %e, "request failed, retrying");
                    tokio::time::sleep(BACKOFF_DELAY).await;
                    continue;
                }
            };

            if res.status() == StatusCode::TOO_MANY_REQUESTS && !last_attempt {
                let retry_after = retry_after(res.headers());
                warn!(%tile, ?retry_after, "rate limited by tile server");
                tokio::time::sleep(retry_after).await;
                continue;
            }

            let body = match res.error_for_status() {
                Ok(res) => res.bytes().await,
                Err(e) => Err(e),
            };

            match body {
                Ok(bytes) => return Ok(bytes.to_vec()),
                Err(e) if last_attempt => return Err(Error::fetch_failed(tile, e)),
                Err(e) => {
                    warn!(%tile, error = %e, "fetching tile failed, retrying");
                    tokio::time::sleep(BACKOFF_DELAY).await;
                }
            }
        }
    }
}

/// Delay requested by a `Retry-After` header in seconds, capped at
/// [`MAX_RETRY_AFTER`].
fn retry_after(headers: &HeaderMap) -> Duration {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|val| val.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(BACKOFF_DELAY)
        .min(MAX_RETRY_AFTER)
}

/// Outcome of a [`fetch`] run.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Summary {
    /// Tiles downloaded from the tile server.
    pub fetched: u64,
    /// Tiles served from the cache.
    pub cached: u64,
    /// Tiles that failed and were left out under [`FailurePolicy::Skip`].
    pub skipped: Vec<TileIndex>,
}

impl Summary {
    pub fn written(&self) -> u64 {
        self.fetched + self.cached
    }
}

/// Fetch the tiles specified in `cfg` and store them in the MBTiles archive
/// at `cfg.output`.
///
/// Existing tiles at the same address are overwritten. Tiles are written in
/// enumeration order by a single writer, and the whole run is committed at
/// once: if it fails, the archive is left as it was.
///
/// # Example
/// ```rust,no_run
/// use download_tiles::{fetch, Config};
///
/// # #[tokio::main]
/// # async fn main() {
/// let mut config = Config::new("aachen.mbtiles");
/// config.bounding_box = "6.031,50.7492,6.1649,50.811".parse().unwrap();
/// config.zoom = "10-12".parse().unwrap();
///
/// fetch(config).await.expect("failed fetching tiles");
/// # }
/// ```
pub async fn fetch(cfg: Config) -> Result<Summary> {
    let client = http_client(&cfg.user_agent, cfg.timeout)?;
    fetch_with_client(cfg, client).await
}

/// Like [`fetch`], reusing an existing HTTP client.
#[instrument(skip_all, fields(output = %cfg.output.display(), zoom = %cfg.zoom))]
pub async fn fetch_with_client(cfg: Config, client: Client) -> Result<Summary> {
    let tile_count = cfg.bounding_box.tile_count(cfg.zoom);
    info!(tile_count, bbox = %cfg.bounding_box, "downloading tiles");

    let cache = cfg.cache_dir.as_ref().map(|dir| {
        TileCache::new(dir, cfg.url.extension().unwrap_or("png").to_owned())
    });
    let fetcher = Fetcher::new(client, cfg.url.clone(), cache, cfg.request_retries_amount);

    let pb = progress_bar(tile_count, cfg.show_progress);

    let (sender, receiver) = mpsc::channel(WRITE_QUEUE_LEN);
    let output = cfg.output.clone();
    let writer = task::spawn_blocking(move || write_archive(&output, receiver));

    let mut summary = Summary::default();
    let mut format = cfg.url.tile_format();

    let fetcher = &fetcher;
    let mut tiles = stream::iter(cfg.tiles().enumerate())
        .map(|(index, tile)| async move { (tile, fetcher.fetch_tile(tile, index).await) })
        .buffered(cfg.fetch_rate.max(1));

    while let Some((tile, res)) = tiles.next().await {
        pb.inc(1);

        let (data, origin) = match res {
            Ok(fetched) => fetched,
            Err(e) => match cfg.on_failure {
                FailurePolicy::Abort => {
                    pb.finish_and_clear();
                    // closing the channel without a commit rolls the run back
                    drop(sender);
                    join_writer(writer).await?;
                    return Err(e);
                }
                FailurePolicy::Skip => {
                    warn!(error = %e, "skipping tile");
                    summary.skipped.push(tile);
                    continue;
                }
            },
        };

        if format.is_none() {
            format = TileFormat::sniff(&data);
        }

        let record = TileRecord { index: tile, data };
        if sender.send(WriteOp::Tile(record)).await.is_err() {
            // the writer hung up, its result carries the reason
            pb.finish_and_clear();
            drop(sender);
            join_writer(writer).await?;
            return Err(Error::WriterStopped("archive writer exited early".into()));
        }

        match origin {
            Origin::Network => summary.fetched += 1,
            Origin::Cache => summary.cached += 1,
        }
    }

    pb.finish_and_clear();

    let mut metadata = vec![
        ("name".to_owned(), cfg.archive_name()),
        ("type".to_owned(), "baselayer".to_owned()),
        ("format".to_owned(), format.unwrap_or(TileFormat::Png).to_string()),
        ("bounds".to_owned(), cfg.bounding_box.to_string()),
    ];
    if let Some(attribution) = &cfg.attribution {
        metadata.push(("attribution".to_owned(), attribution.clone()));
    }

    let committed = sender.send(WriteOp::Commit(metadata)).await.is_ok();
    drop(sender);
    join_writer(writer).await?;
    if !committed {
        return Err(Error::WriterStopped("archive writer exited early".into()));
    }

    info!(
        fetched = summary.fetched,
        cached = summary.cached,
        skipped = summary.skipped.len(),
        "archive written"
    );

    Ok(summary)
}

/// Work for the archive writer.
enum WriteOp {
    Tile(TileRecord),
    /// Write the metadata entries and commit.
    Commit(Vec<(String, String)>),
}

/// Owns the archive for one run. Every operation lands in a single
/// transaction, which is rolled back if the channel closes before a
/// [`WriteOp::Commit`] arrives.
fn write_archive(output: &Path, mut receiver: mpsc::Receiver<WriteOp>) -> Result<()> {
    let mut archive = Archive::open(output)?;
    let writer = archive.writer()?;

    while let Some(op) = receiver.blocking_recv() {
        match op {
            WriteOp::Tile(record) => writer.insert_tile(&record)?,
            WriteOp::Commit(metadata) => {
                for (name, value) in &metadata {
                    writer.set_metadata(name, value)?;
                }
                if let Some((min_zoom, max_zoom)) = writer.zoom_extent()? {
                    writer.set_metadata("minzoom", &min_zoom.to_string())?;
                    writer.set_metadata("maxzoom", &max_zoom.to_string())?;
                }
                return writer.commit();
            }
        }
    }

    debug!(path = %output.display(), "run aborted, rolling back archive writes");
    Ok(())
}

async fn join_writer(writer: task::JoinHandle<Result<()>>) -> Result<()> {
    writer
        .await
        .map_err(|e| Error::WriterStopped(e.to_string()))?
}

fn progress_bar(len: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    match ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:60.cyan/blue} {pos:>7}/{len:7} ETA: {eta} {msg}")
    {
        Ok(style) => pb.set_style(style.progress_chars("##-")),
        Err(e) => debug!(error = %e, "invalid progress bar template"),
    }
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, RETRY_AFTER};

    fn assert_send<T: Send>(_: T) {}

    #[test]
    fn fetch_future_is_send() {
        assert_send(fetch(Config::new("unused.mbtiles")));
    }

    #[test]
    fn caps_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), BACKOFF_DELAY);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("5"));
        assert_eq!(retry_after(&headers), Duration::from_secs(5));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("86400"));
        assert_eq!(retry_after(&headers), MAX_RETRY_AFTER);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(retry_after(&headers), BACKOFF_DELAY);
    }
}
