//! CLI commands: `msgflow analyze` and `msgflow summarize`

use clap::Args;
use msgflow_llm::fallback_summary;
use tracing::warn;

use super::{print_json, TenantArgs};
use crate::server::AppContext;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub tenant: TenantArgs,
    /// Pin one provider instead of walking the fallback order
    #[arg(long)]
    pub provider: Option<i64>,
    /// Message text
    pub message: String,
}

#[derive(Args, Debug)]
pub struct SummarizeArgs {
    #[command(flatten)]
    pub tenant: TenantArgs,
    /// Provider id; the tenant default when omitted
    #[arg(long)]
    pub provider: Option<i64>,
    /// Conversation messages, oldest first
    #[arg(required = true)]
    pub messages: Vec<String>,
}

pub async fn run_analyze(ctx: &AppContext, args: AnalyzeArgs) -> anyhow::Result<()> {
    let tenant_id = args.tenant.tenant;
    let result = match args.provider {
        Some(provider_id) => {
            ctx.service
                .analyze(tenant_id, provider_id, &args.message, None)
                .await?
        }
        None => {
            ctx.service
                .analyze_with_fallback(tenant_id, &args.message, None)
                .await
        }
    };
    print_json(&result)
}

pub async fn run_summarize(ctx: &AppContext, args: SummarizeArgs) -> anyhow::Result<()> {
    let tenant_id = args.tenant.tenant;
    let provider_id = match args.provider {
        Some(id) => Some(id),
        None => ctx
            .router
            .resolve_default(tenant_id)
            .await
            .ok()
            .map(|resolved| resolved.config.id),
    };

    let summary = match provider_id {
        Some(id) => match ctx.service.summarize(tenant_id, id, &args.messages).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(tenant_id, provider_id = id, error = %e, "Summary failed");
                fallback_summary()
            }
        },
        None => fallback_summary(),
    };
    print_json(&summary)
}
