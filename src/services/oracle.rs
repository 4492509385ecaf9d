//! Oracle gateway
//!
//! Sends a rendered prompt to the external text-generation service and
//! returns the raw text. Transport failures and non-2xx statuses are
//! returned as errors and never retried here; malformed bodies are passed
//! through untouched for the response parser to judge.

use crate::error::{PrefrontalError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

/// Black-box text oracle consulted for every actor decision
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Send one prompt, return the raw response text
    async fn query(&self, prompt: &str) -> Result<String>;
}

/// Configuration for the HTTP oracle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Chat-completions endpoint (OpenAI-compatible)
    pub endpoint: String,

    /// Model identifier sent with every request
    pub model: String,

    /// Bearer token; falls back to PREFRONTAL_API_KEY / OPENAI_API_KEY
    #[serde(skip_serializing)]
    pub api_key: String,

    /// Per-request timeout
    pub timeout_secs: u64,

    /// Sampling temperature
    pub temperature: f32,

    /// System message prepended to every prompt
    pub system_prompt: String,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o".to_string(),
            api_key: String::new(),
            timeout_secs: 60,
            temperature: 0.7,
            system_prompt: "You are a helpful assistant.".to_string(),
        }
    }
}

impl OracleConfig {
    /// Resolve the API key from config, then the environment
    pub fn resolved_api_key(&self) -> Option<String> {
        if !self.api_key.is_empty() {
            return Some(self.api_key.clone());
        }
        ["PREFRONTAL_API_KEY", "OPENAI_API_KEY"]
            .iter()
            .filter_map(|var| env::var(var).ok())
            .find(|key| !key.is_empty())
    }
}

/// Chat-completions request format
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

/// HTTP oracle speaking the chat-completions protocol
pub struct HttpOracle {
    config: OracleConfig,
    api_key: String,
    client: reqwest::Client,
}

impl HttpOracle {
    /// Create an oracle client; fails when no API key can be resolved
    pub fn new(config: OracleConfig) -> Result<Self> {
        let api_key = config.resolved_api_key().ok_or_else(|| {
            PrefrontalError::Config(config::ConfigError::Message(
                "oracle API key not set (oracle.api_key, PREFRONTAL_API_KEY or OPENAI_API_KEY)"
                    .to_string(),
            ))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl Oracle for HttpOracle {
    async fn query(&self, prompt: &str) -> Result<String> {
        debug!(
            "Querying oracle {} ({} prompt bytes)",
            self.config.model,
            prompt.len()
        );

        let request = ChatRequest {
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: self.config.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PrefrontalError::OracleApi(format!(
                "request failed with status {}: {}",
                status, error_text
            )));
        }

        // Body is handed to the parser verbatim, envelope included
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_api_key_resolution_order() {
        env::remove_var("PREFRONTAL_API_KEY");
        env::remove_var("OPENAI_API_KEY");

        let mut config = OracleConfig::default();
        assert!(config.resolved_api_key().is_none());
        assert!(HttpOracle::new(config.clone()).is_err());

        env::set_var("OPENAI_API_KEY", "openai-key");
        assert_eq!(config.resolved_api_key().as_deref(), Some("openai-key"));

        env::set_var("PREFRONTAL_API_KEY", "prefrontal-key");
        assert_eq!(config.resolved_api_key().as_deref(), Some("prefrontal-key"));

        config.api_key = "configured".to_string();
        assert_eq!(config.resolved_api_key().as_deref(), Some("configured"));

        env::remove_var("PREFRONTAL_API_KEY");
        env::remove_var("OPENAI_API_KEY");
    }

    #[test]
    fn test_http_oracle_with_configured_key() {
        let config = OracleConfig {
            api_key: "test-key".to_string(),
            model: "local-model".to_string(),
            ..Default::default()
        };
        let oracle = HttpOracle::new(config).unwrap();
        assert_eq!(oracle.model(), "local-model");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let config = OracleConfig {
            api_key: "test-key".to_string(),
            endpoint: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            timeout_secs: 2,
            ..Default::default()
        };
        let oracle = HttpOracle::new(config).unwrap();
        let err = oracle.query("hello").await.unwrap_err();
        assert!(err.is_transport());
    }
}
