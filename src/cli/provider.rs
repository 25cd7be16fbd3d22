//! CLI command: `msgflow provider`

use clap::{Args, Subcommand};
use msgflow_core::ProviderInput;
use msgflow_llm::{HealthCheckResult, HealthStore};
use std::time::Duration;

use super::{print_json, TenantArgs};
use crate::server::AppContext;

/// Actor recorded in the change log for CLI edits
const CLI_ACTOR: &str = "cli";

#[derive(Subcommand, Debug)]
pub enum ProviderCommand {
    /// Register a provider
    Add(AddArgs),
    /// List a tenant's providers
    List(TenantArgs),
    /// Delete a provider
    Remove(ProviderRef),
    /// Probe a provider now and record the result
    Test(ProviderRef),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    #[command(flatten)]
    pub tenant: TenantArgs,
    /// Vendor tag (claude, openai, azure_openai, cohere)
    #[arg(long)]
    pub vendor: String,
    /// Vendor API key
    #[arg(long)]
    pub api_key: String,
    /// Model; defaults per vendor
    #[arg(long)]
    pub model: Option<String>,
    /// Base URL override
    #[arg(long)]
    pub base_url: Option<String>,
    /// Make this the tenant's default provider
    #[arg(long)]
    pub default: bool,
}

#[derive(Args, Debug)]
pub struct ProviderRef {
    #[command(flatten)]
    pub tenant: TenantArgs,
    /// Provider id
    #[arg(long)]
    pub id: i64,
}

pub async fn run(ctx: &AppContext, cmd: ProviderCommand) -> anyhow::Result<()> {
    match cmd {
        ProviderCommand::Add(args) => {
            let mut input = ProviderInput::new(args.vendor, args.api_key).with_default(args.default);
            if let Some(model) = args.model {
                input = input.with_model(model);
            }
            if let Some(url) = args.base_url {
                input = input.with_base_url(url);
            }
            let record = ctx
                .store
                .create_provider(args.tenant.tenant, input, Some(CLI_ACTOR))
                .await?;
            print_json(&record)
        }
        ProviderCommand::List(tenant) => {
            let records = ctx.store.list_provider_records(tenant.tenant).await?;
            if records.is_empty() {
                println!("(no providers configured for tenant {})", tenant.tenant);
                return Ok(());
            }
            println!(
                "{:<6} {:<14} {:<28} {:<8} {:<8} Health",
                "ID", "Vendor", "Model", "Active", "Default"
            );
            for r in &records {
                println!(
                    "{:<6} {:<14} {:<28} {:<8} {:<8} {}",
                    r.id, r.provider_name, r.model_name, r.is_active, r.is_default, r.health_status
                );
            }
            Ok(())
        }
        ProviderCommand::Remove(target) => {
            ctx.store
                .delete_provider(target.tenant.tenant, target.id, Some(CLI_ACTOR))
                .await?;
            println!("Deleted provider {}", target.id);
            Ok(())
        }
        ProviderCommand::Test(target) => {
            let tenant_id = target.tenant.tenant;
            let result = match ctx.service.health_check(tenant_id, target.id).await {
                Ok(result) => result,
                Err(e) if e.is_configuration() => return Err(e.into()),
                Err(e) => HealthCheckResult::failed(Duration::ZERO, e.to_string()),
            };
            ctx.store
                .insert_health(tenant_id, target.id, result.clone())
                .await?;
            print_json(&result)
        }
    }
}
