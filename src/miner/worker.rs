//! Per-identifier pipeline: fetch, resolve, download, record

use crate::config::HttpConfig;
use crate::miner::client::{FetchResult, RetryingClient};
use crate::miner::downloader::{extension_from_url, Downloader};
use crate::miner::resolver::resolve_hosting_url;
use crate::state::AttemptRecord;
use crate::storage::media_file_name;
use crate::Result;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Shared, read-only resources used by every worker
#[derive(Debug)]
pub struct WorkerContext {
    pub client: RetryingClient,
    pub downloader: Downloader,
    base_url: Url,
}

impl WorkerContext {
    /// Builds the page client and downloader from configuration
    pub fn new(base_address: &str, http: &HttpConfig) -> Result<Self> {
        Ok(Self::with_parts(
            base_address,
            RetryingClient::new(http)?,
            Downloader::new(Duration::from_secs(http.timeout_secs))?,
        )?)
    }

    pub fn with_parts(
        base_address: &str,
        client: RetryingClient,
        downloader: Downloader,
    ) -> std::result::Result<Self, url::ParseError> {
        Ok(Self {
            client,
            downloader,
            base_url: normalize_base(base_address)?,
        })
    }

    /// Page URL for an identifier
    pub fn page_url(&self, id: &str) -> std::result::Result<Url, url::ParseError> {
        self.base_url.join(id)
    }
}

/// Parses `base_address`, making sure identifiers are appended as a new path
/// segment rather than replacing the last one
fn normalize_base(base_address: &str) -> std::result::Result<Url, url::ParseError> {
    if base_address.ends_with('/') {
        Url::parse(base_address)
    } else {
        Url::parse(&format!("{}/", base_address))
    }
}

/// One identifier scheduled within a batch
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub id: String,
    pub index: usize,
    pub batch_dir: PathBuf,
}

/// Mines a single identifier and writes its metadata record
///
/// Network, parse, and download failures all end up as a failed record; the
/// only error returned is a failure to write that record.
pub async fn mine_one(ctx: &WorkerContext, item: &WorkItem) -> Result<AttemptRecord> {
    let record = attempt(ctx, item).await;

    if record.success_download {
        tracing::debug!("[{:04}] {} -> saved", item.index, item.id);
    } else {
        tracing::debug!("[{:04}] {} -> failed", item.index, item.id);
    }

    record.save(&item.batch_dir)?;
    Ok(record)
}

/// Writes a failed record for an item whose task never produced one
pub fn record_abandoned(ctx: &WorkerContext, item: &WorkItem) -> Result<AttemptRecord> {
    let url_primary = primary_url_string(ctx, &item.id);
    let record = AttemptRecord::failed(url_primary, item.index);
    record.save(&item.batch_dir)?;
    Ok(record)
}

async fn attempt(ctx: &WorkerContext, item: &WorkItem) -> AttemptRecord {
    let page_url = match ctx.page_url(&item.id) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Cannot build page URL for {}: {}", item.id, e);
            return AttemptRecord::failed(primary_url_string(ctx, &item.id), item.index);
        }
    };
    let url_primary = page_url.to_string();

    let (final_url, body) = match ctx.client.fetch(page_url.as_str()).await {
        FetchResult::Success {
            final_url, body, ..
        } => (final_url, body),
        FetchResult::HttpError {
            status_code,
            attempts,
        } => {
            tracing::debug!(
                "No page for {} (HTTP {}, {} attempt(s))",
                item.id,
                status_code,
                attempts
            );
            return AttemptRecord::failed(url_primary, item.index);
        }
        FetchResult::NetworkError { error, attempts } => {
            tracing::debug!(
                "No page for {} ({}, {} attempt(s))",
                item.id,
                error,
                attempts
            );
            return AttemptRecord::failed(url_primary, item.index);
        }
    };

    let base = Url::parse(&final_url).unwrap_or_else(|_| page_url.clone());
    let hosting_url = match resolve_hosting_url(&body, &base) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Could not resolve media for {}: {}", url_primary, e);
            return AttemptRecord::failed(url_primary, item.index);
        }
    };

    let extension = extension_from_url(&hosting_url);
    let local_p = item
        .batch_dir
        .join(media_file_name(item.index, extension.as_deref()));
    let success = ctx.downloader.save(&hosting_url, &local_p).await;

    AttemptRecord {
        local_p: success.then_some(local_p),
        url_primary,
        url_hosting: Some(hosting_url),
        index_download: item.index,
        success_download: success,
    }
}

fn primary_url_string(ctx: &WorkerContext, id: &str) -> String {
    ctx.page_url(id)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("{}{}", ctx.base_url, id))
}
