use super::*;
use msgflow_llm::{
    AnalysisResult, Feature, HealthCheckResult, HealthStatus, HealthStore, ProviderStore,
    UsageRecord, UsageStore,
};
use std::time::Duration;
use tempfile::TempDir;

const MASTER_KEY: &str = "0123456789abcdef0123456789abcdef";

struct TestContext {
    store: SqlStore,
    _dir: TempDir,
}

async fn create_test_context() -> TestContext {
    create_with_key(Some(MASTER_KEY)).await
}

async fn create_with_key(master_key: Option<&str>) -> TestContext {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("msgflow_test.db");
    let store = SqlStore::from_path(&path, master_key).await.unwrap();
    TestContext { store, _dir: dir }
}

async fn add(store: &SqlStore, tenant: i64, input: ProviderInput) -> ProviderRecord {
    store.create_provider(tenant, input, Some("admin")).await.unwrap()
}

#[tokio::test]
async fn test_create_fills_vendor_defaults() {
    let ctx = create_test_context().await;
    let record = add(&ctx.store, 1, ProviderInput::new("Claude", "sk-ant-secret")).await;

    assert_eq!(record.provider_name, "claude");
    assert_eq!(record.model_name, "claude-3-opus-20240229");
    assert_eq!(record.cost_per_1k_input, 0.003);
    assert_eq!(record.cost_per_1k_output, 0.015);
    assert_eq!(record.max_tokens, 1024);
    assert_eq!(record.max_requests_per_minute, 60);
    assert_eq!(record.max_requests_per_day, 10_000);
    assert!(record.is_active);
    assert!(!record.is_default);
    assert_eq!(record.health_status, HealthStatus::Unknown);
    assert_eq!(record.api_key, MASKED_API_KEY);

    let azure = add(&ctx.store, 1, ProviderInput::new("azure_openai", "key")).await;
    assert_eq!(azure.model_name, "gpt-4o");
    assert_eq!(azure.azure_api_version.as_deref(), Some("2024-02-15-preview"));
}

#[tokio::test]
async fn test_create_validation() {
    let ctx = create_test_context().await;

    let err = ctx
        .store
        .create_provider(1, ProviderInput::new("openai", ""), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = ctx
        .store
        .create_provider(1, ProviderInput::new("mistral", "key"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(ref m) if m.contains("mistral")));
}

#[tokio::test]
async fn test_create_without_master_key_is_refused() {
    let ctx = create_with_key(None).await;
    assert!(!ctx.store.has_master_key());

    let err = ctx
        .store
        .create_provider(1, ProviderInput::new("openai", "sk-1"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[tokio::test]
async fn test_key_is_encrypted_at_rest_and_decrypted_on_load() {
    let ctx = create_test_context().await;
    let record = add(&ctx.store, 1, ProviderInput::new("openai", "sk-live-123")).await;

    let (stored,): (String,) = sqlx::query_as("SELECT api_key FROM llm_providers WHERE id = ?")
        .bind(record.id)
        .fetch_one(&ctx.store.pool)
        .await
        .unwrap();
    assert_ne!(stored, "sk-live-123");

    let config = ctx
        .store
        .get_provider_by_id(1, record.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(config.api_key, "sk-live-123");
    assert_eq!(config.model_name, "gpt-4-turbo");
}

#[tokio::test]
async fn test_undecryptable_key_is_returned_as_stored() {
    let ctx = create_test_context().await;
    let record = add(&ctx.store, 1, ProviderInput::new("openai", "sk-live-123")).await;
    sqlx::query("UPDATE llm_providers SET api_key = 'legacy-plaintext' WHERE id = ?")
        .bind(record.id)
        .execute(&ctx.store.pool)
        .await
        .unwrap();

    let config = ctx
        .store
        .get_provider_by_id(1, record.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(config.api_key, "legacy-plaintext");
}

#[tokio::test]
async fn test_single_default_on_create_and_update() {
    let ctx = create_test_context().await;
    let first = add(&ctx.store, 1, ProviderInput::new("openai", "k").with_default(true)).await;
    let second = add(&ctx.store, 1, ProviderInput::new("claude", "k").with_default(true)).await;
    let other_tenant =
        add(&ctx.store, 2, ProviderInput::new("cohere", "k").with_default(true)).await;

    let defaults = |records: Vec<ProviderRecord>| -> Vec<i64> {
        records
            .into_iter()
            .filter(|r| r.is_default)
            .map(|r| r.id)
            .collect()
    };

    let records = ctx.store.list_provider_records(1).await.unwrap();
    assert_eq!(defaults(records), vec![second.id]);

    let update = ProviderInput {
        is_default: Some(true),
        ..ProviderInput::default()
    };
    ctx.store
        .update_provider(1, first.id, update, None)
        .await
        .unwrap();
    let records = ctx.store.list_provider_records(1).await.unwrap();
    assert_eq!(defaults(records), vec![first.id]);

    // Other tenants keep their default
    let records = ctx.store.list_provider_records(2).await.unwrap();
    assert_eq!(defaults(records), vec![other_tenant.id]);

    let default = ctx.store.get_default_provider(1).await.unwrap().unwrap();
    assert_eq!(default.id, first.id);
}

#[tokio::test]
async fn test_failed_update_keeps_existing_default() {
    let ctx = create_test_context().await;
    let first = add(&ctx.store, 1, ProviderInput::new("openai", "k").with_default(true)).await;

    let update = ProviderInput {
        is_default: Some(true),
        ..ProviderInput::default()
    };
    let err = ctx
        .store
        .update_provider(1, 999, update, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let record = ctx.store.get_provider_record(1, first.id).await.unwrap();
    assert!(record.is_default);
}

#[tokio::test]
async fn test_partial_update_and_key_rotation() {
    let ctx = create_test_context().await;
    let record = add(&ctx.store, 1, ProviderInput::new("openai", "old-key")).await;

    let update = ProviderInput {
        model_name: Some("gpt-4o-mini".to_string()),
        api_key: Some("new-key".to_string()),
        ..ProviderInput::default()
    };
    let updated = ctx
        .store
        .update_provider(1, record.id, update, Some("ops"))
        .await
        .unwrap();
    assert_eq!(updated.model_name, "gpt-4o-mini");
    assert_eq!(updated.cost_per_1k_input, record.cost_per_1k_input);

    let config = ctx
        .store
        .get_provider_by_id(1, record.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(config.api_key, "new-key");

    let update = ProviderInput {
        provider_name: Some("mistral".to_string()),
        ..ProviderInput::default()
    };
    let err = ctx
        .store
        .update_provider(1, record.id, update, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_history_records_each_write() {
    let ctx = create_test_context().await;
    let record = add(&ctx.store, 1, ProviderInput::new("cohere", "k")).await;
    let update = ProviderInput {
        max_tokens: Some(2048),
        api_key: Some("rotated-secret".to_string()),
        ..ProviderInput::default()
    };
    ctx.store
        .update_provider(1, record.id, update, Some("ops"))
        .await
        .unwrap();
    ctx.store
        .delete_provider(1, record.id, Some("ops"))
        .await
        .unwrap();

    let history = ctx.store.provider_history(1, record.id).await.unwrap();
    let events: Vec<&str> = history
        .iter()
        .map(|h| h.change["event"].as_str().unwrap())
        .collect();
    assert_eq!(events, vec!["deleted", "updated", "created"]);

    let updated = &history[1];
    assert_eq!(updated.changed_by.as_deref(), Some("ops"));
    assert_eq!(updated.change["changes"]["max_tokens"], 2048);
    assert_eq!(updated.change["changes"]["api_key"], "rotated");
    assert!(!updated.change.to_string().contains("rotated-secret"));
}

#[tokio::test]
async fn test_history_is_limited_to_latest_five() {
    let ctx = create_test_context().await;
    let record = add(&ctx.store, 1, ProviderInput::new("openai", "k")).await;
    for tokens in 1..=6u32 {
        let update = ProviderInput {
            max_tokens: Some(tokens * 100),
            ..ProviderInput::default()
        };
        ctx.store
            .update_provider(1, record.id, update, None)
            .await
            .unwrap();
    }

    let history = ctx.store.provider_history(1, record.id).await.unwrap();
    assert_eq!(history.len(), 5);
    assert_eq!(history[0].change["changes"]["max_tokens"], 600);
}

#[tokio::test]
async fn test_delete_missing_provider() {
    let ctx = create_test_context().await;
    let err = ctx.store.delete_provider(1, 42, None).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(ctx.store.get_provider_record(1, 42).await.is_err());
}

#[tokio::test]
async fn test_inactive_provider_cannot_be_resolved() {
    let ctx = create_test_context().await;
    let record = add(&ctx.store, 1, ProviderInput::new("openai", "k").with_active(false)).await;

    assert!(ctx
        .store
        .get_provider_by_id(1, record.id)
        .await
        .unwrap()
        .is_none());
    // Still visible to administrators
    assert!(!ctx.store.get_provider_record(1, record.id).await.unwrap().is_active);

    let update = ProviderInput {
        is_active: Some(true),
        ..ProviderInput::default()
    };
    ctx.store
        .update_provider(1, record.id, update, None)
        .await
        .unwrap();
    assert!(ctx
        .store
        .get_provider_by_id(1, record.id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_list_providers_order_and_tenant_isolation() {
    let ctx = create_test_context().await;
    let a = add(&ctx.store, 1, ProviderInput::new("openai", "k")).await;
    let b = add(&ctx.store, 1, ProviderInput::new("claude", "k").with_default(true)).await;
    let c = add(&ctx.store, 1, ProviderInput::new("cohere", "k")).await;
    add(&ctx.store, 1, ProviderInput::new("openai", "k").with_active(false)).await;
    add(&ctx.store, 2, ProviderInput::new("openai", "k")).await;

    let ids: Vec<i64> = ctx
        .store
        .list_providers(1)
        .await
        .unwrap()
        .iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, vec![b.id, a.id, c.id]);

    assert!(ctx.store.get_provider_by_id(2, a.id).await.unwrap().is_none());
    assert_eq!(
        ctx.store.list_active_provider_ids(1).await.unwrap(),
        vec![a.id, b.id, c.id]
    );
}

#[tokio::test]
async fn test_usage_rows_and_reports() {
    let ctx = create_test_context().await;
    let openai = add(&ctx.store, 1, ProviderInput::new("openai", "k")).await;
    let claude = add(&ctx.store, 1, ProviderInput::new("claude", "k")).await;

    let ok = UsageRecord::success(1000, 500, Duration::from_millis(200)).with_feature(Feature::Analyze);
    ctx.store
        .insert_usage(1, openai.id, Some(10), ok.clone(), 0.01, 0.03)
        .await
        .unwrap();
    ctx.store
        .insert_usage(1, claude.id, None, ok.with_feature(Feature::Summarize), 0.003, 0.015)
        .await
        .unwrap();
    let failed = UsageRecord::failure(Duration::from_millis(400), "timeout")
        .with_feature(Feature::Analyze);
    ctx.store
        .insert_usage(1, openai.id, None, failed, 0.01, 0.03)
        .await
        .unwrap();

    let summary = ctx.store.usage_summary(1).await.unwrap();
    assert_eq!(summary.total_requests, 3);
    assert_eq!(summary.successful_requests, 2);
    assert_eq!(summary.failed_requests, 1);
    assert!((summary.total_cost - 0.0355).abs() < 1e-9);
    assert_eq!(summary.avg_latency, Duration::from_millis(266));

    let report = ctx.store.cost_report(1, Some(0.04)).await.unwrap();
    assert!((report.total_cost - 0.0355).abs() < 1e-9);
    assert_eq!(report.provider_costs[0].key, "openai");
    assert!((report.provider_costs[0].total_cost - 0.025).abs() < 1e-9);
    assert_eq!(report.feature_costs[0].key, "analyze");
    assert_eq!(report.daily_costs.len(), 1);
    assert_eq!(report.daily_costs[0].day.len(), 10);
    assert!(report.budget_alert);

    let relaxed = ctx.store.cost_report(1, Some(1.0)).await.unwrap();
    assert!(!relaxed.budget_alert);

    let comparison = ctx.store.provider_comparison(1).await.unwrap();
    let openai_row = comparison
        .iter()
        .find(|r| r.provider_id == openai.id)
        .unwrap();
    assert_eq!(openai_row.requests, 2);
    assert_eq!(openai_row.success_rate, 50.0);
    assert_eq!(openai_row.avg_latency_ms, 300.0);

    assert_eq!(ctx.store.usage_summary(2).await.unwrap().total_requests, 0);
}

#[tokio::test]
async fn test_health_history_and_failure_window() {
    let ctx = create_test_context().await;
    let record = add(&ctx.store, 1, ProviderInput::new("openai", "k")).await;

    let failure = || HealthCheckResult::failed(Duration::from_millis(30), "HTTP 500");
    ctx.store
        .insert_health(1, record.id, HealthCheckResult::ok(Duration::from_millis(100)))
        .await
        .unwrap();
    ctx.store.insert_health(1, record.id, failure()).await.unwrap();
    ctx.store.insert_health(1, record.id, failure()).await.unwrap();
    assert_eq!(ctx.store.recent_health_failures(1, record.id).await.unwrap(), 2);

    ctx.store.insert_health(1, record.id, failure()).await.unwrap();
    assert_eq!(ctx.store.recent_health_failures(1, record.id).await.unwrap(), 3);

    let stored = ctx.store.get_provider_record(1, record.id).await.unwrap();
    assert_eq!(stored.health_status, HealthStatus::Error);
    assert!(stored.last_health_check.is_some());

    ctx.store
        .set_provider_health(1, record.id, HealthStatus::Unhealthy)
        .await
        .unwrap();
    let overview = ctx.store.health_overview(1).await.unwrap();
    assert_eq!(overview.len(), 1);
    assert_eq!(overview[0].status, HealthStatus::Unhealthy);
    assert_eq!(overview[0].avg_latency_ms, 47.5);
}

#[tokio::test]
async fn test_store_analysis_flags_important_once() {
    let ctx = create_test_context().await;
    let analysis = AnalysisResult {
        is_important: true,
        priority: "high".to_string(),
        reason: "customer escalation".to_string(),
        ..AnalysisResult::default()
    };

    ctx.store.store_analysis(1, 77, &analysis).await.unwrap();
    ctx.store.store_analysis(1, 77, &analysis).await.unwrap();
    ctx.store
        .store_analysis(1, 78, &AnalysisResult::default())
        .await
        .unwrap();

    assert_eq!(ctx.store.get_analysis(1, 77).await.unwrap(), Some(analysis));
    assert!(ctx.store.get_analysis(2, 77).await.unwrap().is_none());

    let important = ctx.store.important_messages(1).await.unwrap();
    assert_eq!(important.len(), 1);
    assert_eq!(important[0].message_id, 77);
    assert_eq!(important[0].priority, "high");
}

#[test]
fn test_budget_alert_threshold() {
    assert!(!budget_alert(79.0, Some(100.0)));
    assert!(budget_alert(80.0, Some(100.0)));
    assert!(!budget_alert(500.0, None));
    assert!(!budget_alert(500.0, Some(0.0)));
}

#[test]
fn test_success_rate() {
    assert_eq!(success_rate(0, 0), 0.0);
    assert_eq!(success_rate(3, 4), 75.0);
}

#[tokio::test]
async fn test_tenants_with_active_providers() {
    let ctx = create_test_context().await;
    add(&ctx.store, 3, ProviderInput::new("openai", "k")).await;
    add(&ctx.store, 1, ProviderInput::new("openai", "k")).await;
    add(&ctx.store, 1, ProviderInput::new("cohere", "k")).await;
    add(&ctx.store, 2, ProviderInput::new("openai", "k").with_active(false)).await;

    assert_eq!(
        ctx.store.tenants_with_active_providers().await.unwrap(),
        vec![1, 3]
    );
}
