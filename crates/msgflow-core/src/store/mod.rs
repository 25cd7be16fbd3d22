//! SQLite storage for providers, usage, health and analyses
//!
//! `SqlStore` implements the storage traits consumed by `msgflow-llm`
//! plus provider administration and reporting.
//!
//! # Module Structure
//!
//! - `migrations`: schema
//! - `types`: records, inputs and report rows
//! - `providers`: decrypted configs for the router
//! - `admin`: provider create/update/delete and change history
//! - `usage`: usage rows
//! - `health`: probe history and provider health flags
//! - `reports`: usage, cost, health and comparison reports
//! - `analysis`: analysis persistence

mod admin;
mod analysis;
mod health;
mod migrations;
mod providers;
mod reports;
mod types;
mod usage;

#[cfg(test)]
mod tests;

pub use analysis::AnalysisStore;
#[cfg(test)]
pub use analysis::MockAnalysisStore;
pub use reports::{budget_alert, success_rate};
pub use types::{
    CostBucket, CostReport, DailyCost, ImportantMessage, ProviderComparison, ProviderHealthSummary,
    ProviderHistoryEntry, ProviderInput, ProviderRecord, MASKED_API_KEY,
};

use msgflow_crypto::SecretCipher;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// SQLite-backed store
pub struct SqlStore {
    pool: Pool<Sqlite>,
    cipher: Option<SecretCipher>,
}

impl SqlStore {
    /// Open (creating if needed) a database file and run migrations
    pub async fn from_path(path: &Path, master_key: Option<&str>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Configuration(format!("failed to create database directory: {e}"))
            })?;
        }
        Self::connect(&format!("sqlite:{}?mode=rwc", path.display()), master_key).await
    }

    /// Connect to a database URL and run migrations
    pub async fn connect(url: &str, master_key: Option<&str>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await?;
        Self::from_pool(pool, master_key).await
    }

    /// Wrap an existing pool and run migrations.
    ///
    /// Without a master key, provider secrets can be read back as stored but
    /// new secrets cannot be written.
    pub async fn from_pool(pool: Pool<Sqlite>, master_key: Option<&str>) -> Result<Self> {
        let cipher = master_key
            .filter(|k| !k.is_empty())
            .map(SecretCipher::new)
            .transpose()?;
        let store = Self { pool, cipher };
        store.migrate().await?;
        Ok(store)
    }

    /// Whether new provider secrets can be encrypted
    #[must_use]
    pub fn has_master_key(&self) -> bool {
        self.cipher.is_some()
    }

    fn encrypt_key(&self, plaintext: &str) -> Result<String> {
        let cipher = self
            .cipher
            .as_ref()
            .ok_or_else(|| Error::Configuration("master key not configured".to_string()))?;
        Ok(cipher.encrypt(plaintext)?)
    }

    /// Decrypt a stored key; on failure the stored value is returned unchanged
    fn decrypt_key(&self, provider_id: i64, stored: String) -> String {
        let Some(cipher) = &self.cipher else {
            debug!(provider_id, "No master key, using stored API key as is");
            return stored;
        };
        match cipher.decrypt(&stored) {
            Ok(plain) => plain,
            Err(e) => {
                warn!(provider_id, error = %e, "Failed to decrypt provider API key, using stored value");
                stored
            }
        }
    }
}
