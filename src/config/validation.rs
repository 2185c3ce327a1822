use crate::config::types::{Config, GeneratorConfig, HttpConfig, MinerConfig, OutputConfig};
use crate::generator::{MAX_ID_LENGTH, MIN_ID_LENGTH};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_miner_config(&config.miner)?;
    validate_generator_config(&config.generator)?;
    validate_http_config(&config.http)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates mining loop configuration
fn validate_miner_config(config: &MinerConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_address)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-address: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-address must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.threads < 1 || config.threads > 256 {
        return Err(ConfigError::Validation(format!(
            "threads must be between 1 and 256, got {}",
            config.threads
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(
            "batch-size must be >= 1".to_string(),
        ));
    }

    if config.checkpoint_every < 1 {
        return Err(ConfigError::Validation(
            "checkpoint-every must be >= 1".to_string(),
        ));
    }

    if config.images_limit < 1 {
        return Err(ConfigError::Validation(
            "images-limit must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates generator configuration
fn validate_generator_config(config: &GeneratorConfig) -> Result<(), ConfigError> {
    if !(MIN_ID_LENGTH..=MAX_ID_LENGTH).contains(&config.id_length) {
        return Err(ConfigError::Validation(format!(
            "id-length must be between {} and {}, got {}",
            MIN_ID_LENGTH, MAX_ID_LENGTH, config.id_length
        )));
    }

    let mut chars = config.first_char.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_whitespace() && !c.is_control() => Ok(()),
        _ => Err(ConfigError::Validation(format!(
            "first-char must be exactly one printable character, got '{}'",
            config.first_char
        ))),
    }
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.save_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "save-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}
