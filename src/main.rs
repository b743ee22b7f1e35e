//! calhousing - Main Entry Point
//!
//! Runs a subcommand, or the interactive launcher when none is given.

use clap::Parser;
use calhousing::cli::{cmd_evaluate, cmd_fetch, cmd_info, cmd_interactive, cmd_predict, cmd_train, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "calhousing=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = cli.global.to_config();

    match cli.command {
        Some(Commands::Fetch { url, retries }) => {
            if let Some(url) = url {
                config.dataset_url = url;
            }
            if let Some(retries) = retries {
                config.download_retries = retries;
            }
            config.validate()?;
            cmd_fetch(&config).await?;
        }
        Some(Commands::Train(args)) => {
            cmd_train(&config, &args).await?;
        }
        Some(Commands::Evaluate) => {
            cmd_evaluate(&config)?;
        }
        Some(Commands::Predict(args)) => {
            cmd_predict(&config, &args)?;
        }
        Some(Commands::Info) => {
            cmd_info(&config)?;
        }
        None => {
            cmd_interactive(&config).await?;
        }
    }

    Ok(())
}
