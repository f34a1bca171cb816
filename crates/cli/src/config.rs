use racha_ledger::FlushConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_ENV: &str = "RACHA_CONFIG";
pub const LEDGER_PATH_ENV: &str = "RACHA_LEDGER_PATH";
pub const DEBOUNCE_ENV: &str = "RACHA_DEBOUNCE_MS";
pub const DEFAULT_CONFIG_FILE: &str = "racha.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Runtime settings of the bot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BotConfig {
    /// Ledger document location
    pub ledger_path: PathBuf,

    /// Quiet period after the last mutation before the ledger is written
    pub debounce_ms: u64,

    /// Delay before retrying a failed write
    pub retry_ms: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            ledger_path: PathBuf::from("./data/payments.json"),
            debounce_ms: 300,
            retry_ms: 5_000,
        }
    }
}

impl BotConfig {
    /// Builds the effective configuration: defaults, then the config file,
    /// then environment variables, then `ledger_override`.
    ///
    /// Without `explicit`, the file named by `RACHA_CONFIG` is used, falling
    /// back to `./racha.toml` when it exists.
    pub fn resolve(
        explicit: Option<&Path>,
        ledger_override: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let file = explicit.map(Path::to_path_buf).or_else(|| {
            std::env::var_os(CONFIG_ENV)
                .map(PathBuf::from)
                .or_else(|| {
                    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                    local.is_file().then_some(local)
                })
        });

        let mut config = match file {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        if let Some(path) = ledger_override {
            config.ledger_path = path;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw, path)
    }

    fn parse(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies `RACHA_LEDGER_PATH` and `RACHA_DEBOUNCE_MS` through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(path) = lookup(LEDGER_PATH_ENV).filter(|p| !p.trim().is_empty()) {
            self.ledger_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup(DEBOUNCE_ENV) {
            self.debounce_ms = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{DEBOUNCE_ENV} must be milliseconds, got {raw:?}"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("ledger_path must not be empty".to_string()));
        }
        if self.debounce_ms == 0 {
            return Err(ConfigError::Invalid("debounce_ms must be > 0".to_string()));
        }
        if self.retry_ms == 0 {
            return Err(ConfigError::Invalid("retry_ms must be > 0".to_string()));
        }
        Ok(())
    }

    #[must_use]
    pub const fn flush_config(&self) -> FlushConfig {
        FlushConfig {
            debounce: Duration::from_millis(self.debounce_ms),
            retry_delay: Duration::from_millis(self.retry_ms),
        }
    }
}
