//! Img-Miner: a resumable identifier miner for screenshot hosting services
//!
//! This crate generates candidate identifiers, fetches the page behind each one,
//! extracts the embedded media URL, downloads the media, and checkpoints progress
//! so a run can be killed and restarted without losing its place.

pub mod config;
pub mod generator;
pub mod miner;
pub mod output;
pub mod state;
pub mod storage;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Img-Miner operations
#[derive(Debug, Error)]
pub enum MinerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Generator error: {0}")]
    Generator(#[from] GeneratorError),

    #[error("Progress error: {0}")]
    Progress(#[from] ProgressError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write metadata record {path}: {source}")]
    Record {
        path: PathBuf,
        source: storage::StorageError,
    },

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Identifier generator errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeneratorError {
    /// Every identifier in the space has been produced
    #[error("identifier space exhausted ({remaining} remaining, {requested} requested)")]
    Exhausted { requested: u64, remaining: u64 },

    #[error("identifier length must be between {min} and {max}, got {got}")]
    InvalidLength { min: usize, max: usize, got: usize },

    #[error("first character must be a single printable character, got {0:?}")]
    InvalidFirstChar(String),

    #[error("unknown generator strategy: {0}")]
    UnknownStrategy(String),
}

/// Checkpoint load/save errors
#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("Failed to access checkpoint {path}: {source}")]
    Storage {
        path: PathBuf,
        source: storage::StorageError,
    },

    #[error("Corrupt checkpoint {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

/// Result type alias for Img-Miner operations
pub type Result<T> = std::result::Result<T, MinerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for generator operations
pub type GeneratorResult<T> = std::result::Result<T, GeneratorError>;

// Re-export commonly used types
pub use config::Config;
pub use generator::{build_generator, GeneratorKind, IdGenerator};
pub use miner::{Miner, RunOutcome, StopReason};
pub use state::{AttemptRecord, MinerState, ProgressState};
