//! Miner module: identifier fetching and batch orchestration
//!
//! This module contains the core mining logic, including:
//! - HTTP page fetching with bounded retry
//! - Extracting the hosted media URL from a page
//! - Downloading media and recording each attempt
//! - Batch coordination, checkpointing, and shutdown

mod client;
mod coordinator;
mod downloader;
mod resolver;
mod shutdown;
mod worker;

pub use client::{build_http_client, FetchResult, RetryPolicy, RetryingClient, RETRY_STATUSES};
pub use coordinator::{resume_progress, run_miner, Miner, MinerSettings, RunOutcome, StopReason};
pub use downloader::{extension_from_url, Downloader};
pub use resolver::{resolve_hosting_url, ResolveError, SCREENSHOT_SELECTOR};
pub use shutdown::listen_for_shutdown;
pub use worker::{mine_one, WorkItem, WorkerContext};
