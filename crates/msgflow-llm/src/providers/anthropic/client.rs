use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::types::{MessagesRequest, MessagesResponse, RequestMessage, API_VERSION, DEFAULT_BASE_URL};
use crate::error::{Error, Result};
use crate::providers::vendor::{
    http_client, read_json, ChatClient, ChatCompletion, ChatRequest, VendorProvider,
    VendorSettings,
};
use crate::types::ProviderConfig;

/// Anthropic-backed provider
pub type AnthropicProvider = VendorProvider<AnthropicClient>;

/// Claude Messages API client
pub struct AnthropicClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl AnthropicClient {
    /// Call bounds for Anthropic
    #[must_use]
    pub fn settings() -> VendorSettings {
        VendorSettings::new(Duration::from_secs(60), Duration::from_millis(500))
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

impl AnthropicProvider {
    /// Build an Anthropic provider
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = AnthropicClient::new(&config)?;
        Ok(Self::from_client(client, config, AnthropicClient::settings()))
    }
}

#[async_trait::async_trait]
impl ChatClient for AnthropicClient {
    fn vendor(&self) -> &str {
        "claude"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        debug!(url = %url, model = %self.model, "Sending request to Anthropic");

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![RequestMessage {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let parsed: MessagesResponse = read_json(response).await?;
        let text = parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect::<String>();

        Ok(ChatCompletion {
            text,
            input_tokens: parsed.usage.input_tokens,
            output_tokens: parsed.usage.output_tokens,
        })
    }
}
