mod common;

use serde_json::json;
use std::process::Output;
use tokio::process::Command;

use common::{GeocodeServer, TileServer, PNG_TILE};
use download_tiles::{Archive, TileIndex};

async fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_download-tiles"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .await
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[tokio::test]
async fn prints_version() {
    let output = run(&["--version"]).await;
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("download-tiles "));
}

#[tokio::test]
async fn archive_path_is_required() {
    let output = run(&[]).await;
    assert!(!output.status.success());
    assert!(stderr(&output).contains("required"), "{}", stderr(&output));
}

#[tokio::test]
async fn reports_invalid_arguments() {
    let cases: &[(&[&str], &str)] = &[
        (&["--bbox", "1", "out.mbtiles"], "bbox should be min-lon,min-lat,max-lon,max-lat"),
        (&["--zoom-levels", "dog", "out.mbtiles"], "zoom-levels should be a single number or"),
        (&["-z", "10-7", "out.mbtiles"], "zoom-levels should be a low-high range"),
        (&["-z", "10-25", "out.mbtiles"], "Maximum zoom level is 24"),
        (&["--tiles-url", "blah", "out.mbtiles"], "tiles-url should include {z}, {x}, {y}"),
    ];

    for (args, expected) in cases {
        let output = run(args).await;
        assert!(!output.status.success(), "{:?}", args);
        assert!(stderr(&output).contains(expected), "{:?}: {}", args, stderr(&output));
    }
}

#[tokio::test]
async fn empty_subdomains_fail_before_geocoding() {
    let geocoder = GeocodeServer::start(json!([{
        "boundingbox": ["-25.784021", "-11.732889", "42.9680076", "50.6727307"]
    }]))
    .await;
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("out.mbtiles");

    let output = run(&[
        output_path.to_str().unwrap(),
        "--country",
        "madagascar",
        "--geocoder-url",
        &geocoder.url(),
        "--tiles-subdomains",
        " , ",
    ])
    .await;

    assert_eq!(output.status.code(), Some(2), "{}", stderr(&output));
    assert!(stderr(&output).contains("tiles-subdomains should list at least one subdomain"));
    assert_eq!(geocoder.requests.len(), 0);
    assert!(!output_path.exists());
}

#[tokio::test]
async fn shows_geocoded_bbox_without_fetching() {
    let cases = [
        (
            "--country",
            "madagascar",
            "/?country=madagascar&format=json&limit=1",
            ["-25.784021", "-11.732889", "42.9680076", "50.6727307"],
            "42.9680076,-25.784021,50.6727307,-11.732889",
        ),
        (
            "--city",
            "london",
            "/?city=london&format=json&limit=1",
            ["51.2867601", "51.6918741", "-0.5103751", "0.3340155"],
            "-0.5103751,51.2867601,0.3340155,51.6918741",
        ),
    ];

    for (flag, place, query, boundingbox, expected) in cases {
        let geocoder = GeocodeServer::start(json!([{ "boundingbox": boundingbox }])).await;
        let tiles = TileServer::start(PNG_TILE, &[]).await;
        let dir = tempfile::tempdir().unwrap();
        let output_path = dir.path().join("out.mbtiles");

        let output = run(&[
            flag,
            place,
            "--show-bbox",
            "--geocoder-url",
            &geocoder.url(),
            "--tiles-url",
            &tiles.template(),
            output_path.to_str().unwrap(),
        ])
        .await;

        assert!(output.status.success(), "{}", stderr(&output));
        assert_eq!(stdout(&output).trim(), expected);
        assert_eq!(geocoder.requests.all(), vec![query]);
        assert_eq!(tiles.requests.len(), 0);
        assert!(!output_path.exists());
    }
}

#[tokio::test]
async fn shows_literal_bbox() {
    let output = run(&["--show-bbox", "-b", "-0.5,51.25,0.25,51.75"]).await;
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "-0.5,51.25,0.25,51.75");
}

#[tokio::test]
async fn failed_lookup_exits_non_zero() {
    let geocoder = GeocodeServer::start(json!([])).await;

    let output = run(&[
        "--country",
        "atlantis",
        "--show-bbox",
        "--geocoder-url",
        &geocoder.url(),
    ])
    .await;
    assert!(!output.status.success());
    assert!(stderr(&output).contains("no results for country 'atlantis'"));
}

#[tokio::test]
async fn writes_single_tile_archive() {
    let tiles = TileServer::start(PNG_TILE, &[]).await;
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("out.mbtiles");

    let output = run(&[
        output_path.to_str().unwrap(),
        "--zoom-levels",
        "0",
        "--tiles-url",
        &tiles.template(),
        "--name",
        "Test tiles",
    ])
    .await;
    assert!(output.status.success(), "{}", stderr(&output));

    let archive = Archive::open(&output_path).unwrap();
    let records = archive.tiles().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].index, TileIndex::new(0, 0, 0));
    assert_eq!(records[0].data, PNG_TILE);
    assert_eq!(archive.metadata("name").unwrap().as_deref(), Some("Test tiles"));
}

#[tokio::test]
async fn custom_tiles_url_without_attribution_writes_none() {
    let tiles = TileServer::start(PNG_TILE, &[]).await;
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("out.mbtiles");

    let template = tiles.template();
    let output = run(&[output_path.to_str().unwrap(), "-z", "0", "--tiles-url", &template]).await;
    assert!(output.status.success(), "{}", stderr(&output));

    let archive = Archive::open(&output_path).unwrap();
    assert_eq!(archive.metadata("attribution").unwrap(), None);
}

#[tokio::test]
async fn explicit_attribution_is_written() {
    let tiles = TileServer::start(PNG_TILE, &[]).await;
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("out.mbtiles");

    let output = run(&[
        output_path.to_str().unwrap(),
        "-z",
        "0",
        "--tiles-url",
        &tiles.template(),
        "--attribution=X",
    ])
    .await;
    assert!(output.status.success(), "{}", stderr(&output));

    let archive = Archive::open(&output_path).unwrap();
    assert_eq!(archive.metadata("attribution").unwrap().as_deref(), Some("X"));
}

#[tokio::test]
async fn geocoded_display_name_becomes_archive_name() {
    let geocoder = GeocodeServer::start(json!([{
        "boundingbox": ["-25.784021", "-11.732889", "42.9680076", "50.6727307"],
        "display_name": "Madagascar",
    }]))
    .await;
    let tiles = TileServer::start(PNG_TILE, &[]).await;
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("out.mbtiles");

    let output = run(&[
        output_path.to_str().unwrap(),
        "--country",
        "madagascar",
        "-z",
        "0",
        "--geocoder-url",
        &geocoder.url(),
        "--tiles-url",
        &tiles.template(),
    ])
    .await;
    assert!(output.status.success(), "{}", stderr(&output));

    let archive = Archive::open(&output_path).unwrap();
    assert_eq!(archive.metadata("name").unwrap().as_deref(), Some("Madagascar"));
    assert_eq!(
        archive.metadata("bounds").unwrap().as_deref(),
        Some("42.9680076,-25.784021,50.6727307,-11.732889")
    );
}

#[tokio::test]
async fn fetch_failure_exits_non_zero() {
    let tiles = TileServer::start(PNG_TILE, &["/0/0/0.png"]).await;
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("out.mbtiles");

    let template = tiles.template();
    let output = run(&[output_path.to_str().unwrap(), "-z", "0", "--tiles-url", &template]).await;
    assert!(!output.status.success());
    assert!(stderr(&output).contains("failed fetching tile 0/0/0"), "{}", stderr(&output));
}

#[tokio::test]
async fn dry_run_counts_tiles() {
    let output = run(&["--dry-run", "-z", "0-3"]).await;
    assert!(output.status.success());
    assert!(stderr(&output).contains("would download 85 tiles"), "{}", stderr(&output));
}
