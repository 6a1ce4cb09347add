//! Gateway configuration: an optional `crossport.toml` plus environment
//! overrides.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Where the stage services live and how long to wait for them. Remote
/// generation runs minutes, not seconds, so the default timeout is generous.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub service: ServiceConfig,
}

impl GatewayConfig {
    /// Load configuration.
    ///
    /// Order: the explicit `--config` path if given (missing file is an
    /// error), else `./crossport.toml` if present, else defaults. The
    /// `CROSSPORT_SERVICE_URL` and `CROSSPORT_SERVICE_TIMEOUT_SECS`
    /// environment variables override the file in all cases.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new("crossport.toml");
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        if let Ok(url) = std::env::var("CROSSPORT_SERVICE_URL") {
            config.service.base_url = url;
        }
        if let Ok(timeout) = std::env::var("CROSSPORT_SERVICE_TIMEOUT_SECS") {
            config.service.timeout_secs = timeout
                .parse()
                .context("CROSSPORT_SERVICE_TIMEOUT_SECS is not a number")?;
        }
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("invalid config file {}", path.display()))
    }
}
