//! OpenAI-compatible Chat Completions
//!
//! Serves `openai`, Azure OpenAI (`azure_openai`, `azureopenai`) and Gemini
//! through its OpenAI-compatible endpoint (`google`, `gemini`). One call is
//! bounded at 30s with retries starting at 400ms.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::cost::DEFAULT_AZURE_API_VERSION;
use crate::error::{Error, Result};
use crate::providers::vendor::{
    http_client, read_json, ChatClient, ChatCompletion, ChatRequest, VendorProvider,
    VendorSettings,
};
use crate::types::ProviderConfig;


/// Default OpenAI base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Gemini OpenAI-compatible base URL
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Action prompt for JSON-object mode, which rejects bare arrays
pub const OPENAI_ACTIONS_PROMPT: &str =
    "Extract action items as JSON object with actions array of strings\n\nText: ";

/// OpenAI-backed provider
pub type OpenAiProvider = VendorProvider<OpenAiClient>;

#[derive(Debug, Clone, PartialEq)]
enum Auth {
    Bearer,
    AzureKey,
}

/// Chat Completions client
pub struct OpenAiClient {
    http: Client,
    vendor: String,
    api_key: String,
    url: String,
    auth: Auth,
    model: String,
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: Vec<BodyMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct BodyMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl OpenAiClient {
    /// Call bounds for OpenAI-compatible vendors
    #[must_use]
    pub fn settings() -> VendorSettings {
        VendorSettings::new(Duration::from_secs(30), Duration::from_millis(400))
    }

    /// Build a client; the vendor tag selects endpoint and auth
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let vendor = config.provider_name.to_lowercase();
        let (url, auth) = match vendor.as_str() {
            "azure_openai" | "azureopenai" => {
                let (Some(endpoint), Some(deployment)) = (
                    non_empty(&config.azure_endpoint),
                    non_empty(&config.azure_deployment),
                ) else {
                    return Err(Error::Unsupported(
                        "azure_openai requires azure_endpoint and azure_deployment".to_string(),
                    ));
                };
                let version =
                    non_empty(&config.azure_api_version).unwrap_or(DEFAULT_AZURE_API_VERSION);
                (
                    format!(
                        "{}/openai/deployments/{}/chat/completions?api-version={}",
                        endpoint.trim_end_matches('/'),
                        deployment,
                        version
                    ),
                    Auth::AzureKey,
                )
            }
            other => {
                let default_base = if matches!(other, "google" | "gemini") {
                    GEMINI_BASE_URL
                } else {
                    DEFAULT_BASE_URL
                };
                let base = non_empty(&config.base_url).unwrap_or(default_base);
                (
                    format!("{}/chat/completions", base.trim_end_matches('/')),
                    Auth::Bearer,
                )
            }
        };

        Ok(Self {
            http: http_client(Self::settings().timeout)?,
            vendor,
            api_key: config.api_key.clone(),
            url,
            auth,
            model: config.model_name.clone(),
        })
    }

    /// Resolved completion URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl OpenAiProvider {
    /// Build an OpenAI-compatible provider
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = OpenAiClient::new(&config)?;
        Ok(Self::from_client(client, config, OpenAiClient::settings()))
    }
}

#[async_trait::async_trait]
impl ChatClient for OpenAiClient {
    fn vendor(&self) -> &str {
        &self.vendor
    }

    fn actions_prompt(&self) -> &'static str {
        OPENAI_ACTIONS_PROMPT
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion> {
        debug!(url = %self.url, model = %self.model, "Sending request to OpenAI-compatible endpoint");

        let body = CompletionBody {
            model: &self.model,
            messages: vec![BodyMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let builder = self.http.post(&self.url).json(&body);
        let builder = match self.auth {
            Auth::Bearer => builder.bearer_auth(&self.api_key),
            Auth::AzureKey => builder.header("api-key", &self.api_key),
        };
        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let parsed: CompletionResponse = read_json(response).await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(ChatCompletion {
            text,
            input_tokens: parsed.usage.prompt_tokens,
            output_tokens: parsed.usage.completion_tokens,
        })
    }
}
