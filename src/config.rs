use std::{path::Path, time::Duration};

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::SetupError;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(#[from] SetupError),
}

/// Where and how often to push.
///
/// ```yaml
/// host: http://127.0.0.1:8086
/// database: app
/// username: writer
/// password: secret
/// interval: 10s
/// write_timeout: 5s
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub database: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
    /// Upper bound on a single write so a hung store cannot stall the loop.
    #[serde(default = "default_write_timeout", with = "humantime_serde")]
    pub write_timeout: Duration,
}
impl Config {
    pub fn new(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            database: database.into(),
            username: None,
            password: None,
            interval: DEFAULT_INTERVAL,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SetupError> {
        if self.database.trim().is_empty() {
            return Err(SetupError::EmptyDatabase);
        }
        if self.interval.is_zero() {
            return Err(SetupError::ZeroInterval);
        }
        self.host_url()?;
        Ok(())
    }

    pub fn host_url(&self) -> Result<Url, SetupError> {
        let url = Url::parse(&self.host).map_err(|source| SetupError::InvalidHost {
            host: self.host.clone(),
            source,
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(SetupError::UnsupportedScheme(scheme.to_owned())),
        }
    }
}

fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}
fn default_write_timeout() -> Duration {
    DEFAULT_WRITE_TIMEOUT
}
