use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::DEFAULT_API_URL;
use crate::dispatch::DEFAULT_DISLIKE_DELAY;
use crate::pagination::DEFAULT_PAGE_SIZE;

pub const API_URL_ENV: &str = "JOBBOARD_API_URL";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub api_url: String,
    pub page_size: usize,
    pub dislike_delay_ms: u64,
    /// Unset means requests may wait forever.
    pub request_timeout_secs: Option<u64>,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            dislike_delay_ms: DEFAULT_DISLIKE_DELAY.as_millis() as u64,
            request_timeout_secs: None,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobboard") {
            proj_dirs.config_dir().join("config.toml")
        } else {
            PathBuf::from("jobboard.toml")
        }
    }

    /// Loads the config file, then applies the environment override.
    ///
    /// A missing file at the default location means defaults; a missing file
    /// passed explicitly is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut config = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf)
                .with_context(|| format!("Failed to read config at {}", path_buf.display()))?;
            Self::parse(&raw)
                .with_context(|| format!("Invalid config at {}", path_buf.display()))?
        } else if path.is_some() {
            bail!("Config file not found: {}", path_buf.display());
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config.api_url = url;
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Replaces the API URL with a command-line value, validated like one
    /// read from the file.
    pub fn with_api_url(mut self, url: &str) -> Result<Self> {
        self.api_url = url.to_string();
        self.validate()?;
        Ok(self)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        Ok(config)
    }

    fn validate(&mut self) -> Result<()> {
        self.api_url = self.api_url.trim().trim_end_matches('/').to_string();
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            bail!("api_url must start with http:// or https://, got '{}'", self.api_url);
        }
        if self.page_size == 0 {
            bail!("page_size must be at least 1");
        }
        Ok(())
    }

    pub fn dislike_delay(&self) -> Duration {
        Duration::from_millis(self.dislike_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn log_path(&self) -> PathBuf {
        if let Some(path) = &self.log_file {
            return path.clone();
        }
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobboard") {
            proj_dirs.data_dir().join("jobboard.log")
        } else {
            PathBuf::from("jobboard.log")
        }
    }
}
