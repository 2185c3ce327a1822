//! Single-shot media downloads

use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Fetches resolved media URLs and writes them to disk
///
/// One plain GET per call: no custom headers and no retry.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Downloads `hosting_url` into `destination`
    ///
    /// Returns true only if the server answered 2xx and the whole body was
    /// written. Every failure is logged and reported as false.
    pub async fn save(&self, hosting_url: &str, destination: &Path) -> bool {
        let response = match self.client.get(hosting_url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Failed to download {}: {}", hosting_url, e);
                return false;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                "Failed to download {}: HTTP {}",
                hosting_url,
                status.as_u16()
            );
            return false;
        }

        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!("Failed to read body of {}: {}", hosting_url, e);
                return false;
            }
        };

        tracing::debug!("Saving {} bytes to {}", bytes.len(), destination.display());
        if let Err(e) = tokio::fs::write(destination, &bytes).await {
            tracing::error!("Failed to write {}: {}", destination.display(), e);
            let _ = tokio::fs::remove_file(destination).await;
            return false;
        }

        true
    }
}

/// File extension of the last path segment of `url`, lowercased
///
/// Query strings and fragments are ignored. Returns `None` when the segment
/// has no extension.
pub fn extension_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.last()?;
    let (stem, ext) = segment.rsplit_once('.')?;

    if stem.is_empty() || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    Some(ext.to_ascii_lowercase())
}
