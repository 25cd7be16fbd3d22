//! Server initialization and main run loop

use anyhow::{Context, Result};
use msgflow_core::{
    wait_for_shutdown_signal, AnalysisQueue, AnalysisWorker, EventBus, RedisQueue,
    ShutdownController, WorkerScheduler,
};
use msgflow_llm::{HealthMonitor, HealthScheduler};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use super::context::AppContext;
use super::loader::load_config;
use crate::api::{self, AppState};

/// Run the server until Ctrl+C or SIGTERM
pub async fn run() -> Result<()> {
    info!("Starting msgflow v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config().context("Failed to load configuration")?;
    info!("Configuration loaded");

    let ctx = AppContext::build(config).await?;
    let shutdown = ShutdownController::new();
    let token = shutdown.token();

    let monitor = Arc::new(HealthMonitor::new(
        ctx.router.clone(),
        ctx.store.clone(),
        ctx.config.llm.health_config(),
    ));
    let health = Arc::new(HealthScheduler::with_shutdown(monitor, &token));

    let events = EventBus::default();
    let (queue, workers) = match ctx.config.redis.url() {
        Some(url) => {
            let queue: Arc<dyn AnalysisQueue> =
                Arc::new(RedisQueue::new(url).context("Invalid redis.url")?);
            let worker = AnalysisWorker::new(
                queue.clone(),
                ctx.service.clone(),
                ctx.store.clone(),
                events.clone(),
                ctx.config.worker.worker_config(),
            )
            .with_shutdown(shutdown.clone());
            let workers = Arc::new(WorkerScheduler::with_shutdown(Arc::new(worker), &token));
            info!("Analysis queue enabled");
            (Some(queue), Some(workers))
        }
        None => {
            info!("redis.url not set; batch analysis runs inline");
            (None, None)
        }
    };

    match ctx.store.tenants_with_active_providers().await {
        Ok(tenants) => {
            for tenant_id in &tenants {
                health.ensure_tenant(*tenant_id);
                if let Some(workers) = &workers {
                    workers.ensure_tenant(*tenant_id);
                }
            }
            info!(tenants = tenants.len(), "Per-tenant loops started");
        }
        Err(e) => warn!(error = %e, "Could not list tenants; loops start on first use"),
    }

    let state = AppState {
        store: ctx.store.clone(),
        service: ctx.service.clone(),
        queue,
        workers: workers.clone(),
        health: Some(health.clone()),
        events,
    };
    let app = api::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", ctx.config.server.host, ctx.config.server.port)
        .parse()
        .context("Invalid server address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("HTTP server listening on {}", addr);

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            server_shutdown.shutdown().await;
        })
        .await
        .context("HTTP server error")?;

    health.shutdown().await;
    if let Some(workers) = workers {
        workers.shutdown().await;
    }

    info!("msgflow shutdown complete");
    Ok(())
}
