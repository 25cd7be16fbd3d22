//! Anthropic - Claude Messages API
//!
//! Tags `claude` and `anthropic`. One call is bounded at 60s with retries
//! starting at 500ms.

/// HTTP client
pub mod client;
/// API types
pub mod types;

#[cfg(test)]
mod tests;

pub use client::{AnthropicClient, AnthropicProvider};
pub use types::{API_VERSION, DEFAULT_BASE_URL};
