//! Shared service graph
//!
//! Built once per process and used by both the HTTP server and the
//! one-shot CLI commands.

use anyhow::{Context, Result};
use msgflow_core::SqlStore;
use msgflow_llm::{LlmRouter, LlmService, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use super::config::AppConfig;

/// Store, router and service wired together
pub struct AppContext {
    pub config: AppConfig,
    pub store: Arc<SqlStore>,
    pub router: Arc<LlmRouter>,
    pub service: Arc<LlmService>,
}

impl AppContext {
    /// Open the database and wire the LLM layer on top of it
    pub async fn build(config: AppConfig) -> Result<Self> {
        ensure_sqlite_dir(&config.database.url)?;
        let master_key = config.security.master_key();
        if master_key.is_none() {
            warn!("security.master_key is not set; provider API keys cannot be created or rotated");
        }

        let store = Arc::new(
            SqlStore::connect(&config.database.url, master_key)
                .await
                .context("Failed to open database")?,
        );
        debug!(url = %config.database.url, "Database ready");

        Ok(Self::from_store(config, store))
    }

    /// Wire the LLM layer over an already-open store
    pub fn from_store(config: AppConfig, store: Arc<SqlStore>) -> Self {
        let router = Arc::new(LlmRouter::new(
            store.clone(),
            Arc::new(ProviderFactory::new()),
            config.llm.router_config(),
        ));
        let service = Arc::new(LlmService::new(router.clone(), store.clone()));
        Self {
            config,
            store,
            router,
            service,
        }
    }
}

/// Create the parent directory of a file-backed SQLite URL
fn ensure_sqlite_dir(url: &str) -> Result<()> {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return Ok(());
    };
    let path = rest.trim_start_matches("//");
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path == ":memory:" {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(())
}
