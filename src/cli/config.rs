use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::convert::DEFAULT_MAX_VALUE_DEPTH;

pub const CONFIG_FILENAME: &str = ".otlp-pipeline-receiver.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen: String,
    pub pipeline_url: Option<String>,
    pub pipeline_token: Option<String>,
    pub send_timeout_secs: u64,
    pub max_value_depth: usize,
    pub json_logs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:4318".to_string(),
            pipeline_url: None,
            pipeline_token: None,
            send_timeout_secs: 5,
            max_value_depth: DEFAULT_MAX_VALUE_DEPTH,
            json_logs: false,
        }
    }
}

impl Config {
    /// Load from an explicit path, or from `CONFIG_FILENAME` in the working
    /// directory when it exists, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => load_config_from_path(path),
            None if Path::new(CONFIG_FILENAME).exists() => load_config_from_path(CONFIG_FILENAME),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.pipeline_url.as_deref() {
            Some(url) if !url.trim().is_empty() => {}
            _ => bail!("pipeline_url is required (set --pipeline-url or PIPELINE_LOGS)"),
        }
        if self.max_value_depth < 1 {
            bail!("max_value_depth must be at least 1");
        }
        self.listen_addr()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen
            .parse()
            .with_context(|| format!("Invalid listen address '{}'", self.listen))
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }
}

pub fn load_config_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.as_ref().display()))?;
    Ok(config)
}
