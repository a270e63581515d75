use crate::config::types::{
    Config, CrawlerConfig, DirectoryConfig, OutputConfig, WorkerConfig, MAX_REQUEST_TIMEOUT_SECS,
};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    validate_directory_config(&config.directory)?;
    validate_worker_config(&config.worker)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.request_timeout_secs < 1 || config.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be between 1 and {}, got {}",
            MAX_REQUEST_TIMEOUT_SECS, config.request_timeout_secs
        )));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1 when set".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.emails_path.is_empty() {
        return Err(ConfigError::Validation(
            "emails_path cannot be empty".to_string(),
        ));
    }

    if config.stats_path.is_empty() {
        return Err(ConfigError::Validation(
            "stats_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates directory configuration
fn validate_directory_config(config: &DirectoryConfig) -> Result<(), ConfigError> {
    validate_host(&config.host)?;

    if config.port == 0 {
        return Err(ConfigError::Validation(
            "directory port must be non-zero".to_string(),
        ));
    }

    if config.worker_prefix.is_empty() {
        return Err(ConfigError::Validation(
            "worker_prefix cannot be empty".to_string(),
        ));
    }

    url::Url::parse(&config.base_url())
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid directory address: {}", e)))?;

    Ok(())
}

/// Validates worker configuration
fn validate_worker_config(config: &WorkerConfig) -> Result<(), ConfigError> {
    validate_host(&config.bind_host)?;
    if let Some(host) = &config.advertise_host {
        validate_host(host)?;
    }

    if config.nodes < 1 || config.nodes > 64 {
        return Err(ConfigError::Validation(format!(
            "nodes must be between 1 and 64, got {}",
            config.nodes
        )));
    }

    Ok(())
}

/// Validates a host name or address
fn validate_host(host: &str) -> Result<(), ConfigError> {
    if host.is_empty() {
        return Err(ConfigError::Validation("host cannot be empty".to_string()));
    }

    if !host
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':')
    {
        return Err(ConfigError::Validation(format!(
            "host '{}' contains invalid characters",
            host
        )));
    }

    Ok(())
}
