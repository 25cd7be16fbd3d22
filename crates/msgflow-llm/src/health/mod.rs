//! Provider health monitoring
//!
//! # Module Structure
//!
//! - `monitor`: probe loop for one tenant
//! - `scheduler`: one monitor loop per tenant

mod monitor;
mod scheduler;


pub use monitor::{HealthConfig, HealthMonitor, DEFAULT_HEALTH_INTERVAL, DEFAULT_SLOW_THRESHOLD};
pub use scheduler::HealthScheduler;
