//! Vendor backends
//!
//! Every vendor family is a thin HTTP [`ChatClient`] wrapped in the shared
//! [`VendorProvider`], which owns prompts, retry, timeout, response parsing
//! and usage accounting.

/// Anthropic Messages API
pub mod anthropic;
/// Cohere Generate API
pub mod cohere;
/// OpenAI-compatible Chat Completions (OpenAI, Azure OpenAI, Gemini)
pub mod openai;
mod vendor;

pub use anthropic::{AnthropicClient, AnthropicProvider};
pub use cohere::{CohereClient, CohereProvider};
pub use openai::{OpenAiClient, OpenAiProvider};
pub use vendor::{
    ChatClient, ChatCompletion, ChatRequest, VendorProvider, VendorSettings, ANALYZE_PROMPT,
    EXTRACT_ACTIONS_PROMPT, HEALTH_PROMPT, SUMMARIZE_PROMPT,
};
