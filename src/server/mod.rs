//! Server module for msgflow
//!
//! # Module Structure
//!
//! - `config`: Configuration structures
//! - `loader`: Configuration loading from files and environment
//! - `context`: Store, router and service wiring shared with the CLI
//! - `init`: HTTP server, background loops and shutdown

pub mod config;
mod context;
mod init;
mod loader;

pub use context::AppContext;
pub use init::run;
pub use loader::load_config;
