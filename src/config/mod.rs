//! Configuration module for Img-Miner
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use img_miner::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("miner.toml")).unwrap();
//! println!("Mining with {} threads", config.miner.threads);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, GeneratorConfig, HttpConfig, MinerConfig, OutputConfig, DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
