//! Cost Tracking - LLM usage and cost accounting
//!
//! # Module Structure
//!
//! - `pricing`: Vendor defaults (model, limits, per-1K prices)
//! - `record`: Usage records and statistics types
//! - `tracker`: Per-instance running counters

mod pricing;
mod record;
mod tracker;


pub use pricing::{
    vendor_defaults, VendorDefaults, DEFAULT_AZURE_API_VERSION, DEFAULT_MAX_REQUESTS_PER_DAY,
    SUPPORTED_VENDORS,
};
pub use record::{UsageRecord, UsageStats};
pub use tracker::UsageTracker;
