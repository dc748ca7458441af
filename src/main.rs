use anyhow::Result;
use clap::Parser;

use bundle_admin::cli::{Cli, Commands};
use bundle_admin::handlers;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with verbosity level
    tracing_subscriber::fmt()
        .with_max_level(cli.get_log_level())
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Starting bundle-admin {}", cli.command.name());

    match cli.command {
        Commands::Init {
            api_key,
            api_url,
            token_url,
        } => handlers::handle_init(&cli.config, api_key, api_url, token_url, cli.shop).await?,
        Commands::Config { show_secrets } => {
            handlers::handle_show_config(&cli.config, show_secrets)?
        }
        Commands::Bundles { command } => {
            handlers::handle_bundles(&cli.config, cli.shop, command).await?
        }
        Commands::Settings { command } => {
            handlers::handle_settings(&cli.config, cli.shop, command).await?
        }
        Commands::Analytics { from, to } => {
            handlers::handle_analytics(&cli.config, cli.shop, from, to).await?
        }
        Commands::Plans { command } => {
            handlers::handle_plans(&cli.config, cli.shop, command).await?
        }
        Commands::Onboarding { reset } => handlers::handle_onboarding(reset)?,
    }

    Ok(())
}
