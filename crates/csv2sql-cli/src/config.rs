//! Configuration loading: defaults, config file, environment, CLI flags.
//!
//! Layers merge lowest-precedence first: built-in defaults, then a YAML or
//! JSON config file, then `CSV2SQL__`-prefixed environment variables (with
//! `__` as the section separator, e.g. `CSV2SQL__DATABASE__HOST`), then
//! explicit command-line flags. A `.env` file is loaded into the process
//! environment before the environment layer is read.

use std::path::Path;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Yaml};

use csv2sql_core::error::ConfigError;
use csv2sql_core_common::config::AppConfig;

/// Config file names probed in the working directory when `--config` is
/// not given, in order.
const DEFAULT_CONFIG_FILES: &[&str] = &["csv2sql.yaml", "csv2sql.yml", "csv2sql.json"];

const ENV_PREFIX: &str = "CSV2SQL__";

/// Connection flags that override every other configuration layer.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub db_type: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub chunk_size: Option<usize>,
}

fn file_provider(figment: Figment, path: &Path) -> Figment {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => figment.merge(Json::file(path)),
        _ => figment.merge(Yaml::file(path)),
    }
}

/// Loads the merged configuration.
///
/// # Errors
///
/// Fails when an explicitly named config file does not exist, when a file
/// cannot be parsed, or when a value has the wrong shape.
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    // pull a .env file into the process environment before reading it
    dotenvy::dotenv().ok();

    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    match config_path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("config file '{}' not found", path.display());
            }
            figment = file_provider(figment, path);
        },
        None => {
            for name in DEFAULT_CONFIG_FILES {
                let path = Path::new(name);
                if path.exists() {
                    figment = file_provider(figment, path);
                    break;
                }
            }
        },
    }

    let config: AppConfig = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .context("invalid configuration")?;

    validate(&config)?;
    Ok(config)
}

/// Applies command-line flags on top of the merged configuration.
pub fn apply_overrides(config: &mut AppConfig, overrides: &CliOverrides) {
    if let Some(v) = &overrides.db_type {
        config.database.kind = v.clone();
    }
    if let Some(v) = &overrides.host {
        config.database.host = v.clone();
    }
    if let Some(v) = overrides.port {
        config.database.port = v;
    }
    if let Some(v) = &overrides.username {
        config.database.username = v.clone();
    }
    if let Some(v) = &overrides.password {
        config.database.password = v.clone();
    }
    if let Some(v) = &overrides.database {
        config.database.database = v.clone();
    }
    if let Some(v) = overrides.chunk_size {
        config.csv.chunk_size = v;
    }
}

fn validate(config: &AppConfig) -> Result<()> {
    if !config.csv.encoding.eq_ignore_ascii_case("utf-8") {
        return Err(ConfigError::InvalidOption {
            option: "csv.encoding".to_string(),
            message: format!("'{}' is not supported; only utf-8 input is read", config.csv.encoding),
        }
        .into());
    }
    if config.csv.chunk_size == 0 {
        return Err(ConfigError::InvalidOption {
            option: "csv.chunk_size".to_string(),
            message: "must be at least 1".to_string(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_any_file() {
        let config = load(None).unwrap();
        assert_eq!(config.database.kind, "mysql");
        assert_eq!(config.csv.chunk_size, 10_000);
    }

    #[test]
    fn test_yaml_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf.yaml");
        fs::write(&path, "database:\n  type: sqlite\n  database: demo\n").unwrap();
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.database.kind, "sqlite");
        assert_eq!(config.database.database, "demo");
        // untouched sections keep their defaults
        assert_eq!(config.csv.max_varchar_length, 255);
    }

    #[test]
    fn test_json_file_is_accepted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf.json");
        fs::write(&path, r#"{"csv": {"chunk_size": 500}}"#).unwrap();
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.csv.chunk_size, 500);
    }

    #[test]
    fn test_missing_explicit_file_errors() {
        assert!(load(Some(Path::new("/nonexistent/conf.yaml"))).is_err());
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut config = AppConfig::default();
        let overrides = CliOverrides {
            db_type: Some("postgres".to_string()),
            port: Some(5433),
            ..CliOverrides::default()
        };
        apply_overrides(&mut config, &overrides);
        assert_eq!(config.database.kind, "postgres");
        assert_eq!(config.database.port, 5433);
    }

    #[test]
    fn test_unsupported_encoding_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf.yaml");
        fs::write(&path, "csv:\n  encoding: latin-1\n").unwrap();
        assert!(load(Some(&path)).is_err());
    }
}
