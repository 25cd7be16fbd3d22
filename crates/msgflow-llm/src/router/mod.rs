//! Router - per-tenant provider resolution and fallback
//!
//! # Module Structure
//!
//! - `cache`: TTL cache of resolved provider instances
//! - `mock`: Scriptable provider for tests and embedders
//! - `router_impl`: LlmRouter implementation

mod cache;
mod mock;
mod router_impl;


pub use cache::TtlCache;
pub use mock::{MockProbe, MockProvider};
pub use router_impl::{
    FallbackOutcome, LlmRouter, ResolvedProvider, RouterConfig, DEFAULT_CACHE_TTL,
};
