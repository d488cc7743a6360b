use crate::config::types::{JobsConfig, OutputConfig, Settings, ToolsConfig};
use crate::ConfigError;

/// Validates the entire settings tree
pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
    validate_output_config(&settings.output)?;
    validate_tools_config(&settings.tools)?;
    validate_jobs_config(&settings.jobs)?;
    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output-dir cannot be empty".to_string(),
        ));
    }

    if config.database_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_tools_config(config: &ToolsConfig) -> Result<(), ConfigError> {
    for (name, path) in [
        ("katana-path", &config.katana_path),
        ("httpx-path", &config.httpx_path),
    ] {
        if matches!(path, Some(p) if p.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "{} cannot be blank when set",
                name
            )));
        }
    }

    if config.version_timeout_secs < 1 || config.version_timeout_secs > 120 {
        return Err(ConfigError::Validation(format!(
            "version-timeout-secs must be between 1 and 120, got {}",
            config.version_timeout_secs
        )));
    }

    Ok(())
}

fn validate_jobs_config(config: &JobsConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 32 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 32, got {}",
            config.workers
        )));
    }

    if config.queue_capacity < 1 || config.queue_capacity > 1024 {
        return Err(ConfigError::Validation(format!(
            "queue-capacity must be between 1 and 1024, got {}",
            config.queue_capacity
        )));
    }

    Ok(())
}
