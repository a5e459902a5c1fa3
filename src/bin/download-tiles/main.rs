mod args;

use anyhow::Result;
use args::Args;
use clap::{CommandFactory, Parser};
use std::io::IsTerminal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use download_tiles::{fetch_with_client, http_client, Geocoder};

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("download_tiles={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    // Checked before any geocoding request goes out.
    let url = match args.url_format() {
        Ok(url) => url,
        Err(e) => Args::command()
            .error(clap::error::ErrorKind::ValueValidation, e)
            .exit(),
    };

    let client = http_client(&args.user_agent, args.timeout())?;

    let (bounding_box, display_name) = match args.place() {
        Some((kind, name)) => {
            let place = Geocoder::new(client.clone(), args.geocoder_url.as_str())
                .lookup(kind, name)
                .await?;
            info!(bbox = %place.bounding_box, name = ?place.display_name, "resolved place");
            (place.bounding_box, place.display_name)
        }
        None => (args.bbox, None),
    };

    if args.show_bbox {
        println!("{}", bounding_box);
        return Ok(());
    }

    if args.dry_run {
        let tile_count = bounding_box.tile_count(args.zoom_levels);
        eprintln!(
            "would download {} tiles (approx {}, assuming 10 kb per tile)",
            tile_count,
            pretty_bytes::converter::convert((tile_count as f64) * 10_000f64)
        );
        return Ok(());
    }

    let show_progress = !args.verbose && std::io::stderr().is_terminal();
    let mut config = args.into_config(url, bounding_box, display_name)?;
    config.show_progress = show_progress;

    let summary = fetch_with_client(config, client).await?;

    if !summary.skipped.is_empty() {
        warn!(
            skipped = summary.skipped.len(),
            written = summary.written(),
            "some tiles could not be fetched and were left out"
        );
    }

    Ok(())
}
