#![allow(dead_code)]

use axum::{
    http::{StatusCode, Uri},
    Json, Router,
};
use serde_json::Value;
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

/// A PNG signature followed by filler, enough for format detection.
pub const PNG_TILE: &[u8] = b"\x89PNG\r\n\x1a\nfixed tile bytes";
pub const JPEG_TILE: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10];

/// Paths and query strings of every request a mock server received.
#[derive(Clone, Default)]
pub struct Requests(Arc<Mutex<Vec<String>>>);

impl Requests {
    fn push(&self, uri: &Uri) {
        let entry = match uri.query() {
            Some(query) => format!("{}?{}", uri.path(), query),
            None => uri.path().to_owned(),
        };
        self.0.lock().unwrap().push(entry);
    }

    pub fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// A tile server answering every path with `tile`, except the paths in
/// `failing`, which get a 404.
pub struct TileServer {
    pub addr: SocketAddr,
    pub requests: Requests,
}

impl TileServer {
    pub async fn start(tile: &'static [u8], failing: &'static [&'static str]) -> Self {
        let requests = Requests::default();
        let log = requests.clone();

        let router = Router::new().fallback(move |uri: Uri| {
            let log = log.clone();
            async move {
                log.push(&uri);
                if failing.iter().any(|p| *p == uri.path()) {
                    (StatusCode::NOT_FOUND, Vec::new())
                } else {
                    (StatusCode::OK, tile.to_vec())
                }
            }
        });

        Self {
            addr: serve(router).await,
            requests,
        }
    }

    /// Template with a `.png` extension.
    pub fn template(&self) -> String {
        format!("http://{}/{{z}}/{{x}}/{{y}}.png", self.addr)
    }

    /// Template without a file extension.
    pub fn bare_template(&self) -> String {
        format!("http://{}/{{z}}/{{x}}/{{y}}", self.addr)
    }
}

/// A geocoding endpoint answering every query with `results`.
pub struct GeocodeServer {
    pub addr: SocketAddr,
    pub requests: Requests,
}

impl GeocodeServer {
    pub async fn start(results: Value) -> Self {
        Self::start_with_status(StatusCode::OK, results).await
    }

    pub async fn start_with_status(status: StatusCode, results: Value) -> Self {
        let requests = Requests::default();
        let log = requests.clone();

        let router = Router::new().fallback(move |uri: Uri| {
            let log = log.clone();
            let results = results.clone();
            async move {
                log.push(&uri);
                (status, Json(results))
            }
        });

        Self {
            addr: serve(router).await,
            requests,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }
}
