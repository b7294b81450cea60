mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result};

/// GETs `url` and returns the body. Non-success statuses are errors that
/// carry the status and response body.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse().with_context(|| format!("invalid url '{url}'"))?,
    );

    let resp = client
        .execute(req)
        .await
        .with_context(|| format!("request to '{url}' failed"))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(anyhow::anyhow!("'{url}' returned status {status}: {body}"));
    }

    Ok(resp.bytes().await?.to_vec())
}
