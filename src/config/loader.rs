//! Configuration loading from disk and the environment.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::overrides::Overrides;
use crate::config::schema::DemoConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ")
}

/// Load and validate configuration from a TOML file, without overrides.
pub fn load_config(path: &Path) -> Result<DemoConfig, ConfigError> {
    resolve_config(Some(path), &Overrides::default())
}

/// Defaults, then the optional file, then flag/environment overrides; validated last.
pub fn resolve_config(path: Option<&Path>, overrides: &Overrides) -> Result<DemoConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_file(path)?,
        None => DemoConfig::default(),
    };

    overrides.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn read_file(path: &Path) -> Result<DemoConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("telemetry-demo-{}-{}.toml", name, std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_overrides_win_over_file() {
        let path = write_temp("overrides", "[service]\nname = \"from-file\"\nenvironment = \"staging\"\n");
        let overrides = Overrides {
            service_name: Some("from-env".into()),
            ..Overrides::default()
        };

        let config = resolve_config(Some(&path), &overrides).unwrap();
        assert_eq!(config.service.name, "from-env");
        assert_eq!(config.service.environment, "staging");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let path = write_temp("invalid", "[background]\ninterval_secs = 0\n");
        match load_config(&path) {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors, vec![ValidationError::ZeroInterval]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_load_matches_resolve_without_overrides() {
        let path = write_temp("load", "[service]\nname = \"from-file\"\n\n[telemetry]\nmetric_prefix = \"demo\"\n");

        let loaded = load_config(&path).unwrap();
        let resolved = resolve_config(Some(&path), &Overrides::default()).unwrap();
        assert_eq!(loaded.service.name, "from-file");
        assert_eq!(loaded.service.name, resolved.service.name);
        assert_eq!(loaded.telemetry.metric_prefix, "demo");
        assert_eq!(loaded.telemetry.metric_prefix, resolved.telemetry.metric_prefix);
        assert_eq!(loaded.listener.bind_address, DemoConfig::default().listener.bind_address);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
