use serde::Deserialize;
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::bridge::dsn::Credentials;

pub const CONFIG_FILE: &str = ".sql-advisor.toml";
pub const PASSWORD_ENV: &str = "SQL_ADVISOR_DB_PASSWORD";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .sql-advisor.toml.
///
/// All fields are optional; the tool works with zero config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// Test database the analyzer may connect to
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzerConfig {
    /// Directory holding the per-platform SOAR binaries. Defaults to `bin`.
    pub bin_dir: Option<PathBuf>,

    /// Explicit analyzer executable; overrides `bin_dir`
    pub binary: Option<PathBuf>,

    /// Give up on an analysis after this many seconds
    pub timeout_secs: Option<u64>,

    /// Extra analyzer options, passed as `-key=value` in file order
    #[serde(default)]
    pub options: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub user: String,
    /// Falls back to SQL_ADVISOR_DB_PASSWORD when unset.
    pub password: Option<String>,
    pub port: Option<String>,
    #[serde(default)]
    pub schema: String,
    /// Where to write the credentials file when the password cannot be inlined
    pub side_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from .sql-advisor.toml in the current directory.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(CONFIG_FILE);
        let config = if path.exists() {
            Self::load_from(path)?
        } else {
            Config::default()
        };
        Ok(config.with_env())
    }

    /// Fill the database password from SQL_ADVISOR_DB_PASSWORD if the file left it unset.
    pub fn with_env(mut self) -> Self {
        if let Some(db) = self.database.as_mut() {
            if db.password.is_none() {
                db.password = std::env::var(PASSWORD_ENV).ok();
            }
        }
        self
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.analyzer
            .bin_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("bin"))
    }

    /// Credentials file location, next to the analyzer binaries by default.
    pub fn side_file(&self) -> PathBuf {
        self.database
            .as_ref()
            .and_then(|db| db.side_file.clone())
            .unwrap_or_else(|| self.bin_dir().join("soar.yaml"))
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.database.as_ref().map(|db| {
            Credentials::new(
                db.host.clone(),
                db.user.clone(),
                db.password.clone().unwrap_or_default(),
                db.port.clone(),
                db.schema.clone(),
            )
        })
    }
}
