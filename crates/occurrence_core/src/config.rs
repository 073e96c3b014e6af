//! Verification settings.
//!
//! # Responsibility
//! - Load verification settings from TOML.
//! - Hand explicit settings to the service; nothing here is global.
//!
//! # Invariants
//! - Missing sections and keys take their defaults.
//! - `validate()` runs on every load path.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Largest phenology tolerance accepted; beyond half a year every date is
/// "close" to any window.
pub const MAX_TOLERANCE_DAYS: u32 = 183;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, message: String },
    Parse(String),
    Validation(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, message } => {
                write!(f, "cannot read config `{}`: {message}", path.display())
            }
            Self::Parse(message) => write!(f, "config parse error: {message}"),
            Self::Validation(message) => write!(f, "config validation error: {message}"),
        }
    }
}

impl Error for ConfigError {}

/// Top-level settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub phenology: PhenologyConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PhenologyConfig {
    /// Days either side of a window that count as "close" rather than a
    /// failure. Zero disables the close band.
    pub tolerance_days: u32,
    /// Stage assumed for records that give none.
    pub default_stage: String,
}

impl Default for PhenologyConfig {
    fn default() -> Self {
        Self {
            tolerance_days: 0,
            default_stage: "mature".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `trace|debug|info|warn|error`; the build default when unset.
    pub level: Option<String>,
    /// Absolute directory for rolling log files; logging is off when unset.
    pub dir: Option<PathBuf>,
}

impl VerifyConfig {
    pub fn from_toml(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.phenology.default_stage.trim().is_empty() {
            return Err(ConfigError::Validation(
                "phenology.default_stage cannot be empty".to_string(),
            ));
        }
        if self.phenology.tolerance_days > MAX_TOLERANCE_DAYS {
            return Err(ConfigError::Validation(format!(
                "phenology.tolerance_days must be at most {MAX_TOLERANCE_DAYS}, got {}",
                self.phenology.tolerance_days
            )));
        }
        Ok(())
    }
}
