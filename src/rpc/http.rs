//! JSON-over-HTTP adapter for the stage services.

use super::StageTransport;
use crate::config::ServiceConfig;
use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// POSTs each method invocation as JSON to `{base_url}/{method}`.
pub struct HttpStageTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStageTransport {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        anyhow::ensure!(
            !config.base_url.is_empty(),
            "stage service base URL is not configured"
        );
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait::async_trait]
impl StageTransport for HttpStageTransport {
    async fn invoke(&self, method: &str, payload: Value) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, method);
        if let Ok(body) = serde_json::to_vec(&payload) {
            debug!(method, bytes = body.len(), "invoking stage service");
        }
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("request to {method} failed"))?
            .error_for_status()
            .with_context(|| format!("{method} returned an error status"))?;
        response
            .json::<Value>()
            .await
            .with_context(|| format!("{method} returned an unreadable body"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_requires_a_base_url() {
        let config = ServiceConfig {
            base_url: String::new(),
            timeout_secs: 30,
        };
        assert!(HttpStageTransport::new(&config).is_err());
    }

    #[test]
    fn trailing_slash_is_normalized() {
        let config = ServiceConfig {
            base_url: "http://localhost:8800/".to_string(),
            timeout_secs: 30,
        };
        let transport = HttpStageTransport::new(&config).unwrap();
        assert_eq!(transport.base_url, "http://localhost:8800");
    }
}
