//! Server configuration types

use msgflow_core::WorkerConfig;
use msgflow_llm::{HealthConfig, RouterConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub worker: WorkerAppConfig,
}

/// HTTP listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// SQLite database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
}

fn default_database_url() -> String {
    "sqlite:data/msgflow.db?mode=rwc".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

/// Redis for the analysis queue; an empty URL disables the queue
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default)]
    pub url: String,
}

impl RedisConfig {
    /// The URL, unless the queue is disabled
    pub fn url(&self) -> Option<&str> {
        let url = self.url.trim();
        (!url.is_empty()).then_some(url)
    }
}

/// Secrets
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub master_key: String,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("master_key", &if self.master_key.is_empty() { "<unset>" } else { "<set>" })
            .finish()
    }
}

impl SecurityConfig {
    /// The master key, unless unset
    pub fn master_key(&self) -> Option<&str> {
        (!self.master_key.is_empty()).then_some(self.master_key.as_str())
    }
}

/// Router cache and health monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_health_interval_secs")]
    pub health_interval_secs: u64,
    #[serde(default = "default_slow_threshold_ms")]
    pub slow_threshold_ms: u64,
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_health_interval_secs() -> u64 {
    300
}

fn default_slow_threshold_ms() -> u64 {
    3000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            health_interval_secs: default_health_interval_secs(),
            slow_threshold_ms: default_slow_threshold_ms(),
        }
    }
}

impl LlmConfig {
    pub fn router_config(&self) -> RouterConfig {
        RouterConfig::new().with_cache_ttl(Duration::from_secs(self.cache_ttl_secs))
    }

    pub fn health_config(&self) -> HealthConfig {
        HealthConfig::new()
            .with_interval(Duration::from_secs(self.health_interval_secs.max(1)))
            .with_slow_threshold(Duration::from_millis(self.slow_threshold_ms))
    }
}

/// Analysis workers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerAppConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,
}

fn default_batch_size() -> usize {
    100
}

fn default_job_timeout_secs() -> u64 {
    120
}

impl Default for WorkerAppConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            job_timeout_secs: default_job_timeout_secs(),
        }
    }
}

impl WorkerAppConfig {
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig::new()
            .with_batch_size(self.batch_size)
            .with_job_timeout(Duration::from_secs(self.job_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_library_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.llm.router_config(), RouterConfig::default());
        assert_eq!(config.llm.health_config(), HealthConfig::default());
        assert_eq!(config.worker.worker_config(), WorkerConfig::default());
        assert!(config.redis.url().is_none());
        assert!(config.security.master_key().is_none());
    }

    #[test]
    fn test_master_key_hidden_from_debug() {
        let security = SecurityConfig {
            master_key: "super-secret-master-key-0123456789".to_string(),
        };
        let debug = format!("{security:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<set>"));
    }
}
