//! CLI commands: `msgflow usage` and `msgflow health`

use clap::Args;
use msgflow_llm::HealthMonitor;

use super::{print_json, TenantArgs};
use crate::server::AppContext;

#[derive(Args, Debug)]
pub struct UsageArgs {
    #[command(flatten)]
    pub tenant: TenantArgs,
    /// Flag spend above this many USD
    #[arg(long)]
    pub budget: Option<f64>,
    /// Print the full cost report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct HealthArgs {
    #[command(flatten)]
    pub tenant: TenantArgs,
}

pub async fn run_usage(ctx: &AppContext, args: UsageArgs) -> anyhow::Result<()> {
    let tenant_id = args.tenant.tenant;
    let report = ctx.store.cost_report(tenant_id, args.budget).await?;
    if args.json {
        return print_json(&report);
    }

    let stats = ctx.store.usage_summary(tenant_id).await?;
    println!("Tenant {tenant_id}");
    println!(
        "  Requests:  {} ({} ok, {} failed, {:.1}% success)",
        stats.total_requests,
        stats.successful_requests,
        stats.failed_requests,
        stats.success_rate() * 100.0
    );
    println!("  Spend:     ${:.4}", report.total_cost);
    println!("  Latency:   {} ms avg", stats.avg_latency.as_millis());
    for bucket in &report.provider_costs {
        println!("    {:<24} ${:.4}", bucket.key, bucket.total_cost);
    }
    if report.budget_alert {
        println!("  Budget exceeded: ${:.2}", report.budget.unwrap_or_default());
    }
    Ok(())
}

pub async fn run_health(ctx: &AppContext, args: HealthArgs) -> anyhow::Result<()> {
    let monitor = HealthMonitor::new(
        ctx.router.clone(),
        ctx.store.clone(),
        ctx.config.llm.health_config(),
    );
    let statuses = monitor.run_once(args.tenant.tenant).await;
    if statuses.is_empty() {
        println!("(no active providers)");
    }
    for (provider_id, status) in statuses {
        println!("{provider_id:<6} {status}");
    }
    Ok(())
}
