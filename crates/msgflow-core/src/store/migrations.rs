use super::SqlStore;
use crate::error::Result;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS llm_providers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tenant_id INTEGER NOT NULL,
        provider_name TEXT NOT NULL,
        api_key TEXT NOT NULL,
        model_name TEXT NOT NULL,
        display_name TEXT,
        base_url TEXT,
        azure_endpoint TEXT,
        azure_deployment TEXT,
        azure_api_version TEXT,
        temperature REAL NOT NULL,
        max_tokens INTEGER NOT NULL,
        cost_per_1k_input REAL NOT NULL,
        cost_per_1k_output REAL NOT NULL,
        max_requests_per_minute INTEGER NOT NULL,
        max_requests_per_day INTEGER NOT NULL,
        monthly_budget REAL,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        is_default BOOLEAN NOT NULL DEFAULT FALSE,
        is_fallback BOOLEAN NOT NULL DEFAULT FALSE,
        health_status TEXT NOT NULL DEFAULT 'unknown',
        last_health_check TIMESTAMP,
        created_at TIMESTAMP NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_llm_providers_tenant ON llm_providers(tenant_id, is_active)",
    r#"
    CREATE TABLE IF NOT EXISTS llm_usage_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tenant_id INTEGER NOT NULL,
        provider_id INTEGER NOT NULL,
        message_id INTEGER,
        input_tokens INTEGER NOT NULL,
        output_tokens INTEGER NOT NULL,
        total_tokens INTEGER NOT NULL,
        input_cost REAL NOT NULL,
        output_cost REAL NOT NULL,
        total_cost REAL NOT NULL,
        response_time_ms INTEGER NOT NULL,
        success BOOLEAN NOT NULL,
        error_message TEXT,
        feature_used TEXT,
        created_at TIMESTAMP NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_llm_usage_tenant ON llm_usage_logs(tenant_id, created_at)",
    r#"
    CREATE TABLE IF NOT EXISTS llm_provider_health (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        provider_id INTEGER NOT NULL,
        tenant_id INTEGER NOT NULL,
        check_time TIMESTAMP NOT NULL,
        status TEXT NOT NULL,
        latency_ms INTEGER NOT NULL,
        estimated_cost REAL NOT NULL DEFAULT 0,
        error_message TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_llm_health_provider ON llm_provider_health(tenant_id, provider_id, check_time)",
    r#"
    CREATE TABLE IF NOT EXISTS llm_provider_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tenant_id INTEGER NOT NULL,
        provider_id INTEGER NOT NULL,
        change_json TEXT NOT NULL,
        changed_by TEXT,
        created_at TIMESTAMP NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS message_analysis (
        tenant_id INTEGER NOT NULL,
        message_id INTEGER NOT NULL,
        analysis_json TEXT NOT NULL,
        updated_at TIMESTAMP NOT NULL,
        PRIMARY KEY (tenant_id, message_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS important_messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tenant_id INTEGER NOT NULL,
        message_id INTEGER NOT NULL,
        priority TEXT NOT NULL,
        reason TEXT NOT NULL,
        created_at TIMESTAMP NOT NULL,
        UNIQUE (tenant_id, message_id)
    )
    "#,
];

impl SqlStore {
    /// Run database migrations
    pub(super) async fn migrate(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for statement in SCHEMA {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
