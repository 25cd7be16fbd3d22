//! Vendor Defaults - pricing and generation settings
//!
//! Values used when an administrator creates a provider without specifying
//! a model, limits or prices.

use serde::Serialize;

/// Vendors accepted by provider administration
pub const SUPPORTED_VENDORS: &[&str] = &["claude", "openai", "azure_openai", "cohere"];

/// Default daily request cap for new providers
pub const DEFAULT_MAX_REQUESTS_PER_DAY: u32 = 10_000;

/// Default Azure OpenAI API version
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-15-preview";

/// Defaults for a newly created provider of one vendor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorDefaults {
    /// Model name
    pub model_name: &'static str,
    /// Sampling temperature
    pub temperature: f32,
    /// Max output tokens
    pub max_tokens: u32,
    /// Cost per 1K input tokens (USD)
    pub cost_per_1k_input: f64,
    /// Cost per 1K output tokens (USD)
    pub cost_per_1k_output: f64,
    /// Requests per minute
    pub max_requests_per_minute: u32,
    /// Azure API version, for Azure only
    pub azure_api_version: Option<&'static str>,
}

/// Defaults for `vendor`, or `None` when administration does not accept it
#[must_use]
pub fn vendor_defaults(vendor: &str) -> Option<VendorDefaults> {
    let base = VendorDefaults {
        model_name: "",
        temperature: 0.2,
        max_tokens: 1024,
        cost_per_1k_input: 0.0,
        cost_per_1k_output: 0.0,
        max_requests_per_minute: 60,
        azure_api_version: None,
    };
    let defaults = match vendor.to_lowercase().as_str() {
        "claude" => VendorDefaults {
            model_name: "claude-3-opus-20240229",
            cost_per_1k_input: 0.003,
            cost_per_1k_output: 0.015,
            ..base
        },
        "openai" => VendorDefaults {
            model_name: "gpt-4-turbo",
            cost_per_1k_input: 0.01,
            cost_per_1k_output: 0.03,
            ..base
        },
        "azure_openai" => VendorDefaults {
            model_name: "gpt-4o",
            cost_per_1k_input: 0.01,
            cost_per_1k_output: 0.03,
            azure_api_version: Some(DEFAULT_AZURE_API_VERSION),
            ..base
        },
        "cohere" => VendorDefaults {
            model_name: "command-r-plus",
            cost_per_1k_input: 0.0003,
            cost_per_1k_output: 0.0003,
            ..base
        },
        _ => return None,
    };
    Some(defaults)
}
