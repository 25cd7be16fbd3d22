//! LLM Router implementation
//!
//! Resolves `(tenant, provider)` pairs to live instances through a TTL
//! cache, and runs ordered fallback across a tenant's active providers.
//!
//! Cached instances are not invalidated when a provider record changes; a
//! stale instance can serve until its entry expires, unless an
//! administrator calls [`LlmRouter::invalidate_tenant`].

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::cache::TtlCache;
use crate::error::{Error, Result};
use crate::factory::ProviderFactory;
use crate::fallback::fallback_analysis;
use crate::provider::LlmProvider;
use crate::store::ProviderStore;
use crate::types::{AnalysisResult, Feature, ProviderConfig};

/// Default lifetime of a resolved provider
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Cache slot used for the tenant's default provider
const DEFAULT_SLOT: i64 = 0;

/// Router settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// Lifetime of a cache entry
    pub cache_ttl: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl RouterConfig {
    /// Create a router configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cache TTL
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}

/// A provider instance together with the record it was resolved from.
///
/// Instances are shared by every record with the same instance key, so the
/// instance's own configuration may belong to another record or tenant.
/// Attribution (ids, prices) must use `config`.
#[derive(Clone)]
pub struct ResolvedProvider {
    /// The tenant's provider record
    pub config: ProviderConfig,
    /// Live instance serving the record
    pub provider: Arc<dyn LlmProvider>,
}

impl std::fmt::Debug for ResolvedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedProvider")
            .field("config", &self.config)
            .field("provider", &self.provider.name())
            .finish()
    }
}

/// Result of [`LlmRouter::analyze_with_fallback`]
pub struct FallbackOutcome {
    /// Provider analysis, or the keyword heuristic when degraded
    pub result: AnalysisResult,
    /// Provider that succeeded
    pub provider: Option<Arc<dyn LlmProvider>>,
    /// ID of the provider that succeeded
    pub provider_id: Option<i64>,
    /// Record of the provider that succeeded
    pub config: Option<ProviderConfig>,
    /// Why the outcome is degraded
    pub error: Option<Error>,
}

impl FallbackOutcome {
    fn degraded(message: &str, error: Error) -> Self {
        Self {
            result: fallback_analysis(message),
            provider: None,
            provider_id: None,
            config: None,
            error: Some(error),
        }
    }

    /// Whether the heuristic produced the result
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.provider.is_none()
    }
}

impl std::fmt::Debug for FallbackOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackOutcome")
            .field("result", &self.result)
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("provider_id", &self.provider_id)
            .field("error", &self.error)
            .finish()
    }
}

/// Per-tenant provider router
pub struct LlmRouter {
    store: Arc<dyn ProviderStore>,
    factory: Arc<ProviderFactory>,
    cache: TtlCache<(i64, i64), ResolvedProvider>,
}

impl LlmRouter {
    /// Create a router
    #[must_use]
    pub fn new(
        store: Arc<dyn ProviderStore>,
        factory: Arc<ProviderFactory>,
        config: RouterConfig,
    ) -> Self {
        Self {
            store,
            factory,
            cache: TtlCache::new(config.cache_ttl),
        }
    }

    /// The provider factory
    #[must_use]
    pub fn factory(&self) -> &Arc<ProviderFactory> {
        &self.factory
    }

    fn build(&self, config: ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
        let vendor = config.provider_name.clone();
        self.factory
            .create_provider(config)
            .ok_or(Error::Unsupported(vendor))
    }

    /// Resolve one provider of a tenant
    pub async fn get_provider(
        &self,
        tenant_id: i64,
        provider_id: i64,
    ) -> Result<Arc<dyn LlmProvider>> {
        Ok(self.resolve(tenant_id, provider_id).await?.provider)
    }

    /// Resolve one active provider of a tenant along with its record
    #[instrument(skip(self))]
    pub async fn resolve(&self, tenant_id: i64, provider_id: i64) -> Result<ResolvedProvider> {
        let key = (tenant_id, provider_id);
        if let Some(resolved) = self.cache.get(&key) {
            return Ok(resolved);
        }

        let not_found = || Error::ProviderNotFound {
            tenant_id,
            provider_id,
        };
        let config = match self.store.get_provider_by_id(tenant_id, provider_id).await {
            Ok(Some(config)) => config,
            Ok(None) => return Err(not_found()),
            Err(e) => {
                warn!(tenant_id, provider_id, error = %e, "Provider lookup failed");
                return Err(not_found());
            }
        };

        let resolved = ResolvedProvider {
            provider: self.build(config.clone())?,
            config,
        };
        debug!(tenant_id, provider_id, provider = %resolved.provider.name(), "Resolved provider");
        self.cache.insert(key, resolved.clone());
        Ok(resolved)
    }

    /// Resolve the tenant's default provider
    pub async fn get_default_provider(&self, tenant_id: i64) -> Result<Arc<dyn LlmProvider>> {
        Ok(self.resolve_default(tenant_id).await?.provider)
    }

    /// Resolve the tenant's default provider along with its record
    #[instrument(skip(self))]
    pub async fn resolve_default(&self, tenant_id: i64) -> Result<ResolvedProvider> {
        let key = (tenant_id, DEFAULT_SLOT);
        if let Some(resolved) = self.cache.get(&key) {
            return Ok(resolved);
        }

        let config = match self.store.get_default_provider(tenant_id).await {
            Ok(Some(config)) => config,
            Ok(None) => return Err(Error::DefaultProviderNotFound(tenant_id)),
            Err(e) => {
                warn!(tenant_id, error = %e, "Default provider lookup failed");
                return Err(Error::DefaultProviderNotFound(tenant_id));
            }
        };

        let resolved = ResolvedProvider {
            provider: self.build(config.clone())?,
            config,
        };
        self.cache.insert(key, resolved.clone());
        Ok(resolved)
    }

    /// Provider serving a feature. Every feature uses the default provider.
    pub async fn get_provider_for_feature(
        &self,
        tenant_id: i64,
        feature: Feature,
    ) -> Result<Arc<dyn LlmProvider>> {
        debug!(tenant_id, feature = %feature, "Resolving provider for feature");
        self.get_default_provider(tenant_id).await
    }

    /// Analyze with every active provider in order until one succeeds.
    ///
    /// Order is default first, then ascending id. When the listing fails or
    /// every provider fails, the outcome carries the keyword heuristic and
    /// the reason.
    #[instrument(skip(self, message))]
    pub async fn analyze_with_fallback(&self, tenant_id: i64, message: &str) -> FallbackOutcome {
        let configs = match self.store.list_providers(tenant_id).await {
            Ok(configs) => configs,
            Err(e) => {
                warn!(tenant_id, error = %e, "Listing providers failed, using keyword fallback");
                return FallbackOutcome::degraded(message, e);
            }
        };

        for config in configs {
            let provider_id = config.id;
            let Some(provider) = self.factory.create_provider(config.clone()) else {
                debug!(tenant_id, provider_id, "Skipping unsupported provider");
                continue;
            };

            match provider.analyze(message).await {
                Ok(result) => {
                    debug!(tenant_id, provider_id, provider = %provider.name(), "Analysis succeeded");
                    return FallbackOutcome {
                        result,
                        provider: Some(provider),
                        provider_id: Some(provider_id),
                        config: Some(config),
                        error: None,
                    };
                }
                Err(e) => {
                    warn!(tenant_id, provider_id, provider = %provider.name(), error = %e, "Provider failed, trying next");
                }
            }
        }

        info!(tenant_id, "All providers failed, using keyword fallback");
        FallbackOutcome::degraded(message, Error::AllProvidersFailed)
    }

    /// Drop every cached instance of a tenant
    pub fn invalidate_tenant(&self, tenant_id: i64) {
        self.cache.retain(|(tenant, _)| *tenant != tenant_id);
        debug!(tenant_id, "Invalidated provider cache");
    }
}
