//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use stationfetch_core::scheduler::{DEFAULT_CONCURRENCY, DEFAULT_MAX_DAYS};
use stationfetch_core::{Backoff, RetryPolicy};

/// Global configuration for stationfetch
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub ftp: FtpConfig,
    pub output: OutputConfig,
    pub workers: WorkersConfig,
    pub retry: RetryConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub password: Option<String>,
    pub remote_base: String,
    pub connect_timeout_secs: u64,
}

impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: stationfetch_core::transport::DEFAULT_PORT,
            user: String::new(),
            password: std::env::var("STATIONFETCH_PASSWORD").ok(),
            remote_base: "/forecast/stations".to_string(),
            connect_timeout_secs: 30,
        }
    }
}

impl FtpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub local_root: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            local_root: PathBuf::from(stationfetch_core::plan::DEFAULT_LOCAL_ROOT),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub default: usize,
    pub max: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            default: DEFAULT_CONCURRENCY,
            max: 16,
        }
    }
}

impl WorkersConfig {
    /// Requested worker count clamped to `1..=max`
    pub fn resolve(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default).clamp(1, self.max.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackoffSetting {
    #[default]
    Fixed,
    Exponential,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_secs: u64,
    pub backoff: BackoffSetting,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            delay_secs: policy.delay.as_secs(),
            backoff: BackoffSetting::Fixed,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: Duration::from_secs(self.delay_secs),
            backoff: match self.backoff {
                BackoffSetting::Fixed => Backoff::Fixed,
                BackoffSetting::Exponential => Backoff::Exponential,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// 0 disables the limit
    pub max_days: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_days: DEFAULT_MAX_DAYS,
        }
    }
}

impl LimitsConfig {
    pub fn max_days(&self) -> Option<u32> {
        (self.max_days > 0).then_some(self.max_days)
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./stationfetch.toml (current directory)
    /// 2. ~/.config/stationfetch/config.toml (platform equivalent elsewhere)
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("stationfetch.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "stationfetch") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
