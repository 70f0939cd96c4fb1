use std::collections::HashSet;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - At least one enabled backend, with unique names and an http(s) URL
/// - Matching threshold within 0.0-1.0
/// - Worker pool and retry bounds are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.paths.save_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "paths.save_path cannot be empty".to_string(),
        ));
    }

    if !config.backends.iter().any(|b| b.enabled) {
        return Err(ConfigError::ValidationError(
            "at least one enabled backend is required".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for backend in &config.backends {
        if !names.insert(backend.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate backend name: {}",
                backend.name
            )));
        }
        if !backend.url.starts_with("http://") && !backend.url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "backend {} url must start with http:// or https://",
                backend.name
            )));
        }
    }

    if !(0.0..=1.0).contains(&config.matching.threshold) {
        return Err(ConfigError::ValidationError(format!(
            "matching.threshold must be between 0.0 and 1.0, got {}",
            config.matching.threshold
        )));
    }

    if config.orchestrator.workers == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.workers cannot be 0".to_string(),
        ));
    }

    if config.retry.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "retry.max_attempts cannot be 0".to_string(),
        ));
    }

    if config.retry.multiplier < 1.0 {
        return Err(ConfigError::ValidationError(
            "retry.multiplier must be >= 1.0".to_string(),
        ));
    }

    Ok(())
}
