use crate::generator::GeneratorKind;
use serde::Deserialize;

/// Desktop browser user agent sent with every page request unless overridden
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";

/// Main configuration structure for Img-Miner
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub miner: MinerConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Mining loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MinerConfig {
    /// Base address that identifiers are appended to (e.g. "https://prnt.sc/")
    #[serde(rename = "base-address")]
    pub base_address: String,

    /// Number of identifiers mined concurrently within a batch
    #[serde(rename = "threads", default = "default_threads")]
    pub threads: u32,

    /// Number of identifiers per batch
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: u32,

    /// Persist progress whenever the processed count crosses a multiple of this
    #[serde(rename = "checkpoint-every", default = "default_checkpoint_every")]
    pub checkpoint_every: u64,

    /// Stop once this many identifiers have been processed
    #[serde(rename = "images-limit", default = "default_images_limit")]
    pub images_limit: u64,
}

/// Identifier generator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub strategy: GeneratorKind,

    /// Seed for the random strategy
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Constant first character of every identifier
    #[serde(rename = "first-char", default = "default_first_char")]
    pub first_char: String,

    /// Total identifier length, first character included
    #[serde(rename = "id-length", default = "default_id_length")]
    pub id_length: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            strategy: GeneratorKind::default(),
            seed: default_seed(),
            first_char: default_first_char(),
            id_length: default_id_length(),
        }
    }
}

/// Page request configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Retries after the first attempt on transient failures
    #[serde(rename = "retries-total", default = "default_retries_total")]
    pub retries_total: u32,

    /// Base of the exponential backoff between retries (milliseconds)
    #[serde(rename = "backoff-factor-ms", default = "default_backoff_factor_ms")]
    pub backoff_factor_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            retries_total: default_retries_total(),
            backoff_factor_ms: default_backoff_factor_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory for the checkpoint file and mined images
    #[serde(rename = "save-dir", default = "default_save_dir")]
    pub save_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            save_dir: default_save_dir(),
        }
    }
}

fn default_threads() -> u32 {
    4
}

fn default_batch_size() -> u32 {
    100
}

fn default_checkpoint_every() -> u64 {
    500
}

fn default_images_limit() -> u64 {
    1_000_000
}

fn default_seed() -> u64 {
    42
}

fn default_first_char() -> String {
    "a".to_string()
}

fn default_id_length() -> usize {
    6
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_retries_total() -> u32 {
    3
}

fn default_backoff_factor_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_save_dir() -> String {
    "mined_data".to_string()
}
