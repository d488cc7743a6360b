use crate::config::types::Settings;
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::Path;

/// Loads and parses a settings file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML settings file
///
/// # Returns
///
/// * `Ok(Settings)` - Successfully loaded and validated settings
/// * `Err(ConfigError)` - Failed to load, parse, or validate the settings
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_settings(&content)
}

/// Parses and validates settings from TOML text
pub fn parse_settings(content: &str) -> Result<Settings, ConfigError> {
    let settings: Settings = toml::from_str(content)?;
    validate(&settings)?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_full_settings() {
        let content = r#"
[output]
output-dir = "./runs"
database-path = "./runs/assets.sqlite"

[tools]
katana-path = "/opt/pd/katana"
httpx-path = "/opt/pd/httpx"
version-timeout-secs = 5

[jobs]
workers = 4
queue-capacity = 32
"#;

        let file = create_temp_config(content);
        let settings = load_settings(file.path()).unwrap();

        assert_eq!(settings.output.output_dir, PathBuf::from("./runs"));
        assert_eq!(settings.tools.katana_path.as_deref(), Some("/opt/pd/katana"));
        assert_eq!(settings.tools.version_timeout_secs, 5);
        assert_eq!(settings.jobs.workers, 4);
        assert_eq!(settings.jobs.queue_capacity, 32);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let settings = parse_settings("").unwrap();
        assert_eq!(settings.output.output_dir, PathBuf::from("out"));
        assert_eq!(
            settings.output.database_path,
            PathBuf::from("out/assets.sqlite")
        );
        assert!(settings.tools.httpx_path.is_none());
        assert_eq!(settings.jobs.workers, 2);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let settings = parse_settings("[jobs]\nworkers = 8\n").unwrap();
        assert_eq!(settings.jobs.workers, 8);
        assert_eq!(settings.jobs.queue_capacity, 16);
    }

    #[test]
    fn test_load_settings_with_invalid_path() {
        let result = load_settings(Path::new("/nonexistent/res-scan.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_settings_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_settings(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_settings_with_validation_error() {
        let result = parse_settings("[jobs]\nworkers = 0\n");
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }
}
