//! Cohere - Generate API
//!
//! Tag `cohere`. One call is bounded at 45s with retries starting at 400ms.
//! Token counts come from `meta.billed_units`.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::providers::vendor::{
    http_client, read_json, ChatClient, ChatCompletion, ChatRequest, VendorProvider,
    VendorSettings,
};
use crate::types::ProviderConfig;

#[cfg(test)]
mod tests;

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.cohere.ai";

/// Cohere-backed provider
pub type CohereProvider = VendorProvider<CohereClient>;

/// Generate API client
pub struct CohereClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    generations: Vec<Generation>,
    #[serde(default)]
    meta: Meta,
}

#[derive(Debug, Deserialize)]
struct Generation {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct Meta {
    #[serde(default)]
    billed_units: BilledUnits,
}

#[derive(Debug, Default, Deserialize)]
struct BilledUnits {
    #[serde(default)]
    input_tokens: f64,
    #[serde(default)]
    output_tokens: f64,
}

impl CohereClient {
    /// Call bounds for Cohere; probes ask for 10 tokens
    #[must_use]
    pub fn settings() -> VendorSettings {
        VendorSettings::new(Duration::from_secs(45), Duration::from_millis(400))
            .with_probe_max_tokens(10)
    }

    /// Build a client from a provider configuration
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            http: http_client(Self::settings().timeout)?,
            api_key: config.api_key.clone(),
            base_url: config
                .base_url
                .clone()
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: config.model_name.clone(),
        })
    }
}

impl CohereProvider {
    /// Build a Cohere provider
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = CohereClient::new(&config)?;
        Ok(Self::from_client(client, config, CohereClient::settings()))
    }
}

#[async_trait::async_trait]
impl ChatClient for CohereClient {
    fn vendor(&self) -> &str {
        "cohere"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion> {
        let url = format!("{}/v1/generate", self.base_url.trim_end_matches('/'));
        debug!(url = %url, model = %self.model, "Sending request to Cohere");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&GenerateBody {
                model: &self.model,
                prompt: &request.prompt,
                max_tokens: request.max_tokens,
                temperature: request.temperature,
            })
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let parsed: GenerateResponse = read_json(response).await?;
        let text = parsed
            .generations
            .into_iter()
            .next()
            .map(|g| g.text)
            .unwrap_or_default();

        Ok(ChatCompletion {
            text,
            input_tokens: parsed.meta.billed_units.input_tokens.max(0.0) as u32,
            output_tokens: parsed.meta.billed_units.output_tokens.max(0.0) as u32,
        })
    }
}
