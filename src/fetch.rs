//! HTTP fetch collaborator for the realtime feed.
//!
//! The pipeline only needs raw bytes; the [`HttpClient`] seam keeps the
//! transport swappable in tests. No timeout is configured here, the
//! client owns its own retry/timeout policy.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response>;
}

pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new() -> Self {
        Self(reqwest::Client::new())
    }
}

impl Default for BasicClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}

/// Fetches the raw feed bytes from a URL.
///
/// # Errors
///
/// Fails on transport errors or a non-success status. Callers treat any
/// failure the same as an empty feed; live data is best-effort.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    if !resp.status().is_success() {
        anyhow::bail!("feed fetch returned HTTP {}", resp.status());
    }
    Ok(resp.bytes().await?.to_vec())
}
