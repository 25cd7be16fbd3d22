//! Provider factory
//!
//! Maps vendor tags to constructors and memoises live instances by
//! [`ProviderConfig::instance_key`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::error::Result;
use crate::provider::LlmProvider;
use crate::providers::{AnthropicProvider, CohereProvider, OpenAiProvider};
use crate::types::ProviderConfig;

/// Builds a provider from a decrypted configuration
pub type ProviderConstructor =
    Arc<dyn Fn(ProviderConfig) -> Result<Arc<dyn LlmProvider>> + Send + Sync>;

struct Inner {
    constructors: HashMap<String, ProviderConstructor>,
    instances: HashMap<String, Arc<dyn LlmProvider>>,
}

/// Registry of vendor constructors plus the instance cache
pub struct ProviderFactory {
    inner: Mutex<Inner>,
}

impl Default for ProviderFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderFactory {
    /// Factory with the built-in vendors registered
    #[must_use]
    pub fn new() -> Self {
        let factory = Self::empty();
        factory.register("claude", build_anthropic);
        factory.register("anthropic", build_anthropic);
        factory.register("openai", build_openai);
        factory.register("azure_openai", build_openai);
        factory.register("azureopenai", build_openai);
        factory.register("google", build_openai);
        factory.register("gemini", build_openai);
        factory.register("cohere", build_cohere);
        factory
    }

    /// Factory with no vendors registered
    #[must_use]
    pub fn empty() -> Self {
        Self {
            inner: Mutex::new(Inner {
                constructors: HashMap::new(),
                instances: HashMap::new(),
            }),
        }
    }

    /// Register (or replace) the constructor for a vendor tag
    pub fn register<F>(&self, tag: &str, constructor: F)
    where
        F: Fn(ProviderConfig) -> Result<Arc<dyn LlmProvider>> + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .constructors
            .insert(tag.to_lowercase(), Arc::new(constructor));
    }

    /// Whether a vendor tag has a constructor
    #[must_use]
    pub fn supports(&self, tag: &str) -> bool {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.constructors.contains_key(&tag.to_lowercase())
    }

    /// Return the shared instance for `config`, building it on first use.
    ///
    /// `None` means the vendor is not supported (or its constructor failed).
    /// Lookup and construction happen under one lock, so concurrent callers
    /// with the same key never build twice.
    pub fn create_provider(&self, config: ProviderConfig) -> Option<Arc<dyn LlmProvider>> {
        let key = config.instance_key();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(existing) = inner.instances.get(&key) {
            return Some(Arc::clone(existing));
        }

        let vendor = config.provider_name.to_lowercase();
        let constructor = Arc::clone(inner.constructors.get(&vendor)?);
        match constructor(config) {
            Ok(provider) => {
                debug!(key = %key, "Created LLM provider instance");
                inner.instances.insert(key, Arc::clone(&provider));
                Some(provider)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to construct LLM provider");
                None
            }
        }
    }

    /// Number of live instances
    #[must_use]
    pub fn instance_count(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.instances.len()
    }
}

fn build_anthropic(config: ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    Ok(Arc::new(AnthropicProvider::new(config)?))
}

fn build_openai(config: ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    Ok(Arc::new(OpenAiProvider::new(config)?))
}

fn build_cohere(config: ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    Ok(Arc::new(CohereProvider::new(config)?))
}
