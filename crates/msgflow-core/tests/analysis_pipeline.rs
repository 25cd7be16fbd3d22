//! End-to-end: provider administration, queued analysis through the
//! fallback order, persistence, usage and health reporting on one SQLite
//! database.

use msgflow_core::{
    AnalysisQueue, AnalysisWorker, EventBus, MemoryQueue, ProviderInput, QueueMessage, SqlStore,
    WorkerConfig,
};
use msgflow_llm::{
    AnalysisResult, HealthConfig, HealthMonitor, HealthStatus, LlmProvider, LlmRouter, LlmService,
    MockProbe, MockProvider, ProviderConfig, ProviderFactory, RouterConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const MASTER_KEY: &str = "0123456789abcdef0123456789abcdef";

struct Pipeline {
    store: Arc<SqlStore>,
    router: Arc<LlmRouter>,
    service: Arc<LlmService>,
    _dir: TempDir,
}

/// openai instances always fail; cohere instances flag everything urgent
fn scripted_factory() -> ProviderFactory {
    let factory = ProviderFactory::empty();
    factory.register("openai", |config: ProviderConfig| {
        Ok(Arc::new(
            MockProvider::new(config)
                .failing("503 from vendor")
                .with_probe(MockProbe::Failed("503 from vendor".to_string())),
        ) as Arc<dyn LlmProvider>)
    });
    factory.register("cohere", |config: ProviderConfig| {
        let analysis = AnalysisResult {
            is_important: true,
            priority: "high".to_string(),
            reason: "customer waiting".to_string(),
            sentiment: "negative".to_string(),
            confidence: 0.9,
            ..AnalysisResult::default()
        };
        Ok(Arc::new(
            MockProvider::new(config)
                .with_analysis(analysis)
                .with_probe(MockProbe::Ok(Duration::from_millis(40))),
        ) as Arc<dyn LlmProvider>)
    });
    factory
}

async fn pipeline() -> Pipeline {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(
        SqlStore::from_path(&dir.path().join("pipeline.db"), Some(MASTER_KEY))
            .await
            .unwrap(),
    );
    let router = Arc::new(LlmRouter::new(
        store.clone(),
        Arc::new(scripted_factory()),
        RouterConfig::default(),
    ));
    let service = Arc::new(LlmService::new(router.clone(), store.clone()));
    Pipeline {
        store,
        router,
        service,
        _dir: dir,
    }
}

async fn seed_providers(store: &SqlStore, tenant_id: i64) -> (i64, i64) {
    let primary = store
        .create_provider(
            tenant_id,
            ProviderInput::new("openai", "sk-primary").with_default(true),
            Some("admin"),
        )
        .await
        .unwrap();
    let backup = store
        .create_provider(tenant_id, ProviderInput::new("cohere", "co-backup"), Some("admin"))
        .await
        .unwrap();
    (primary.id, backup.id)
}

#[tokio::test]
async fn test_queued_jobs_fall_back_and_are_persisted() {
    let p = pipeline().await;
    let (_, backup_id) = seed_providers(&p.store, 1).await;

    let queue = Arc::new(MemoryQueue::new());
    for (id, text) in [(10, "where is my order"), (11, "still nothing"), (12, "hello?")] {
        queue
            .enqueue(&QueueMessage::analyze(1, id, text))
            .await
            .unwrap();
    }

    let events = EventBus::default();
    let mut rx = events.subscribe();
    let worker = AnalysisWorker::new(
        queue.clone(),
        p.service.clone(),
        p.store.clone(),
        events,
        WorkerConfig::new(),
    );

    assert_eq!(worker.run_batch(1).await.unwrap(), 3);
    assert!(queue.is_empty(1));

    for id in [10, 11, 12] {
        let stored = p.store.get_analysis(1, id).await.unwrap().unwrap();
        assert_eq!(stored.reason, "customer waiting");
        let event = rx.recv().await.unwrap();
        assert_eq!(event.message_id, id);
        assert!(event.is_important);
    }
    assert_eq!(p.store.important_messages(1).await.unwrap().len(), 3);

    // Only the provider that answered is billed
    let stats = p.store.usage_summary(1).await.unwrap();
    assert_eq!(stats.total_requests, 3);
    assert_eq!(stats.failed_requests, 0);
    let comparison = p.store.provider_comparison(1).await.unwrap();
    let backup = comparison
        .iter()
        .find(|c| c.provider_id == backup_id)
        .unwrap();
    assert_eq!(backup.requests, 3);
}

#[tokio::test]
async fn test_tenant_without_providers_gets_keyword_fallback() {
    let p = pipeline().await;
    seed_providers(&p.store, 1).await;

    let result = p
        .service
        .analyze_with_fallback(2, "URGENT: the invoice is wrong", Some(1))
        .await;
    assert_eq!(result.reason, "keyword fallback");
    assert_eq!(result.priority, "high");
    assert_eq!(p.store.usage_summary(2).await.unwrap().total_requests, 0);
}

#[tokio::test]
async fn test_direct_call_failure_is_recorded() {
    let p = pipeline().await;
    let (primary_id, _) = seed_providers(&p.store, 1).await;

    assert!(p.service.analyze(1, primary_id, "hi", None).await.is_err());
    let stats = p.store.usage_summary(1).await.unwrap();
    assert_eq!(stats.total_requests, 1);
    assert_eq!(stats.failed_requests, 1);
}

#[tokio::test]
async fn test_health_cycle_reports_each_provider() {
    let p = pipeline().await;
    let (primary_id, backup_id) = seed_providers(&p.store, 1).await;

    let monitor = HealthMonitor::new(p.router.clone(), p.store.clone(), HealthConfig::new());
    let statuses = monitor.run_once(1).await;
    assert_eq!(statuses.len(), 2);
    let status_of = |id| statuses.iter().find(|(pid, _)| *pid == id).map(|(_, s)| *s);
    assert_eq!(status_of(backup_id), Some(HealthStatus::Ok));
    assert_ne!(status_of(primary_id), Some(HealthStatus::Ok));

    let overview = p.store.health_overview(1).await.unwrap();
    assert_eq!(overview.len(), 2);
}

#[tokio::test]
async fn test_deleted_provider_leaves_the_fallback_order() {
    let p = pipeline().await;
    let (_, backup_id) = seed_providers(&p.store, 1).await;

    p.store.delete_provider(1, backup_id, Some("admin")).await.unwrap();
    p.router.invalidate_tenant(1);

    let result = p.service.analyze_with_fallback(1, "thanks!", None).await;
    assert_eq!(result.reason, "keyword fallback");
    assert_eq!(result.sentiment, "positive");
}
