//! # Settings
//!
//! User level configuration lives in `~/.bqv/config.toml` and is overlaid by environment
//! variables prefixed with `BQV_`, using `__` between section and key:
//!
//! ```bash
//! BQV_LOGGER__LEVEL=debug
//! BQV_LOGGER__STDOUT=true
//! BQV_BIGQUERY__PROJECT_ID=my-project
//! BQV_RUNNER__CONCURRENCY=4
//! ```
//!
//! Command line flags take precedence over both.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use super::logger::LoggerSettings;
use crate::infrastructure::warehouse::bigquery::BigQueryConfig;
use crate::utilities::constants::{
    CLI_CONFIG_FILE, CLI_USER_DIRECTORY, ENVIRONMENT_VARIABLE_PREFIX,
};

const DEFAULT_CONFIG_FILE: &str = r#"# bqv configuration
#
# Every value can be overridden with an environment variable, e.g. BQV_LOGGER__LEVEL=debug

[logger]
# DEBUG, INFO, WARN or ERROR
level = "Info"
# Log to stdout instead of ~/.bqv/cli.log.*
stdout = false
# Text or Json
format = "Text"

[bigquery]
# project_id = "my-project"
# location = "US"

[runner]
# Number of views processed at the same time
concurrency = 1
"#;

fn default_concurrency() -> usize {
    1
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RunnerSettings {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub logger: LoggerSettings,
    #[serde(default)]
    pub bigquery: BigQueryConfig,
    #[serde(default)]
    pub runner: RunnerSettings,
}

pub fn user_directory() -> PathBuf {
    home::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CLI_USER_DIRECTORY)
}

pub fn config_path() -> PathBuf {
    user_directory().join(CLI_CONFIG_FILE)
}

pub fn setup_user_directory() -> Result<(), std::io::Error> {
    std::fs::create_dir_all(user_directory())
}

/// Writes the default config file on first run. An existing file is never touched.
pub fn init_config_file() -> Result<(), std::io::Error> {
    let path = config_path();
    if !path.exists() {
        std::fs::write(&path, DEFAULT_CONFIG_FILE)?;
    }
    Ok(())
}

fn read_settings_from(path: &Path) -> Result<Settings, ConfigError> {
    Config::builder()
        .add_source(File::from(path).required(false))
        .add_source(
            Environment::with_prefix(ENVIRONMENT_VARIABLE_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize()
}

pub fn read_settings() -> Result<Settings, ConfigError> {
    read_settings_from(&config_path())
}
