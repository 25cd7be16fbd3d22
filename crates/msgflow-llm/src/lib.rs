//! msgflow LLM - provider routing for message analysis
//!
//! This crate turns per-tenant provider records into live LLM clients:
//! - Providers: Claude, OpenAI-compatible (OpenAI, Azure OpenAI, Gemini) and Cohere
//! - Factory: vendor registry plus a shared instance cache
//! - Router: TTL-cached resolution and ordered fallback with a keyword heuristic
//! - Service: usage recording around every call
//! - Health: periodic probes with per-tenant loops

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cost;
pub mod error;
pub mod factory;
pub mod fallback;
pub mod health;
pub mod provider;
pub mod providers;
pub mod retry;
pub mod router;
pub mod service;
pub mod store;
pub mod supervisor;
pub mod types;
pub mod util;

pub use cost::{
    vendor_defaults, UsageRecord, UsageStats, UsageTracker, VendorDefaults,
    DEFAULT_MAX_REQUESTS_PER_DAY, SUPPORTED_VENDORS,
};
pub use error::{Error, Result};
pub use factory::{ProviderConstructor, ProviderFactory};
pub use fallback::{fallback_analysis, fallback_summary};
pub use health::{HealthConfig, HealthMonitor, HealthScheduler};
pub use provider::LlmProvider;
pub use retry::Retrier;
pub use router::{
    FallbackOutcome, LlmRouter, MockProbe, MockProvider, ResolvedProvider, RouterConfig,
};
pub use service::LlmService;
pub use store::{HealthStore, ProviderStore, UsageStore};
pub use supervisor::TenantSupervisor;
pub use types::{
    AnalysisResult, Feature, HealthCheckResult, HealthStatus, ProviderConfig, SummaryResult,
};

// Re-export provider types
pub use providers::{AnthropicProvider, CohereProvider, OpenAiProvider};
