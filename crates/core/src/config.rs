use std::env;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/reqflow.toml";
pub const DEFAULT_DATABASE_URL: &str = "sqlite:reqflow.db?mode=rwc";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// Programmatic overrides, applied last (after file and environment).
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    database: RawDatabase,
    #[serde(default)]
    logging: RawLogging,
}

#[derive(Debug, Default, Deserialize)]
struct RawDatabase {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLogging {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    /// Precedence, lowest to highest: built-in defaults, the TOML file,
    /// `REQFLOW_*` environment variables, programmatic overrides.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let path = options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let raw = match fs::read_to_string(&path) {
            Ok(contents) => toml::from_str::<RawConfig>(&contents)
                .map_err(|source| ConfigError::ParseFile { path: path.clone(), source })?,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                if options.require_file {
                    return Err(ConfigError::MissingConfigFile(path));
                }
                RawConfig::default()
            }
            Err(source) => return Err(ConfigError::ReadFile { path, source }),
        };

        let database_url = options
            .overrides
            .database_url
            .or_else(|| env::var("REQFLOW_DATABASE_URL").ok())
            .or(raw.database.url)
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let log_level = options
            .overrides
            .log_level
            .or_else(|| env::var("REQFLOW_LOG_LEVEL").ok())
            .or(raw.logging.level)
            .unwrap_or_else(|| "info".to_string());

        let config = AppConfig {
            database: DatabaseConfig {
                url: database_url,
                max_connections: raw.database.max_connections.unwrap_or(5),
                timeout_secs: raw.database.timeout_secs.unwrap_or(30),
            },
            logging: LoggingConfig {
                level: log_level,
                format: raw.logging.format.unwrap_or(LogFormat::Compact),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    fn load_from(contents: &str, overrides: ConfigOverrides) -> Result<AppConfig, ConfigError> {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides,
        })
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/reqflow.toml")),
            require_file: false,
            overrides: ConfigOverrides::default(),
        })
        .expect("defaults");

        assert_eq!(config.database.url, super::DEFAULT_DATABASE_URL);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let error = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/reqflow.toml")),
            require_file: true,
            overrides: ConfigOverrides::default(),
        })
        .expect_err("required file");
        assert!(matches!(error, ConfigError::MissingConfigFile(_)));
    }

    #[test]
    fn file_values_are_read_and_overrides_win() {
        let contents = r#"
            [database]
            url = "sqlite:file-config.db"
            max_connections = 2

            [logging]
            level = "debug"
            format = "json"
        "#;

        let from_file = load_from(contents, ConfigOverrides::default()).expect("load");
        assert_eq!(from_file.database.url, "sqlite:file-config.db");
        assert_eq!(from_file.database.max_connections, 2);
        assert_eq!(from_file.logging.level, "debug");
        assert_eq!(from_file.logging.format, LogFormat::Json);

        let overridden = load_from(
            contents,
            ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                log_level: Some("trace".to_string()),
            },
        )
        .expect("load with overrides");
        assert_eq!(overridden.database.url, "sqlite::memory:");
        assert_eq!(overridden.logging.level, "trace");
    }

    #[test]
    fn zero_connection_pool_fails_validation() {
        let contents = r#"
            [database]
            max_connections = 0
        "#;
        let error = load_from(contents, ConfigOverrides::default()).expect_err("invalid pool");
        assert!(matches!(error, ConfigError::Validation(_)));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let error = load_from("[database", ConfigOverrides::default()).expect_err("bad toml");
        assert!(matches!(error, ConfigError::ParseFile { .. }));
    }
}
