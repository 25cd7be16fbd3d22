//! CLI module for msgflow
//!
//! Provides commands:
//! - `serve`: Run the HTTP server and background loops
//! - `provider`: Administer a tenant's providers
//! - `analyze` / `summarize`: One-shot calls through the routing layer
//! - `usage` / `health`: Reports and probes

use clap::{Args, Parser, Subcommand};

pub mod analyze;
pub mod provider;
pub mod report;

use crate::server::{load_config, AppContext};

/// msgflow CLI
#[derive(Parser, Debug)]
#[command(name = "msgflow")]
#[command(about = "LLM routing for multi-tenant messaging")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Tenant selector shared by the tenant-scoped commands
#[derive(Args, Debug, Clone, Copy)]
pub struct TenantArgs {
    /// Tenant id
    #[arg(long, short = 't')]
    pub tenant: i64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the server (default)
    Serve,
    /// Manage providers
    #[command(subcommand)]
    Provider(provider::ProviderCommand),
    /// Analyze one message
    Analyze(analyze::AnalyzeArgs),
    /// Summarise a conversation
    Summarize(analyze::SummarizeArgs),
    /// Show usage and spend
    Usage(report::UsageArgs),
    /// Probe every active provider now
    Health(report::HealthArgs),
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => crate::server::run().await,
        Commands::Provider(cmd) => provider::run(&context().await?, cmd).await,
        Commands::Analyze(args) => analyze::run_analyze(&context().await?, args).await,
        Commands::Summarize(args) => analyze::run_summarize(&context().await?, args).await,
        Commands::Usage(args) => report::run_usage(&context().await?, args).await,
        Commands::Health(args) => report::run_health(&context().await?, args).await,
    }
}

async fn context() -> anyhow::Result<AppContext> {
    AppContext::build(load_config()?).await
}

/// Print a value as pretty JSON
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["msgflow"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_provider_add_parses() {
        let cli = Cli::try_parse_from([
            "msgflow", "provider", "add", "-t", "3", "--vendor", "claude", "--api-key", "k",
            "--default",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Provider(provider::ProviderCommand::Add(args))) => {
                assert_eq!(args.tenant.tenant, 3);
                assert_eq!(args.vendor, "claude");
                assert!(args.default);
                assert!(args.model.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_tenant_is_required() {
        assert!(Cli::try_parse_from(["msgflow", "usage"]).is_err());
    }

    #[test]
    fn test_summarize_takes_many_messages() {
        let cli = Cli::try_parse_from(["msgflow", "summarize", "-t", "1", "hi", "bye"]).unwrap();
        match cli.command {
            Some(Commands::Summarize(args)) => assert_eq!(args.messages, vec!["hi", "bye"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
