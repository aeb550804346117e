use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use council_cli::cli::{Cli, Command, HistoryCommand};
use council_cli::commands;
use council_cli::config::CliConfig;
use council_cli::gateway::GatewayClient;
use council_core::{DebateSessionManager, FileDecisionStore};
use tracing::info;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // stdout carries events only.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config =
        CliConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(store) = &cli.store {
        config.defaults.store_path = Some(store.clone());
    }

    match cli.command {
        Command::Debate(args) => {
            args.apply_to(&mut config);
            config.validate()?;
            let request = args.request(&config).map_err(anyhow::Error::msg)?;

            let store_path = config.store_path();
            let store = FileDecisionStore::open(&store_path).await.with_context(|| {
                format!("Failed to open decision store {}", store_path.display())
            })?;
            let gateway = GatewayClient::new(config.gateway.clone())
                .context("Failed to build gateway client")?;
            info!(
                gateway = %config.gateway.base_url,
                store = %store_path.display(),
                members = request.council_members.len(),
                "LLM council starting"
            );

            let manager =
                DebateSessionManager::new(Arc::new(gateway), store.shared(), config.council);
            let run = manager.start(request);
            let shutdown = async {
                // A failed signal hookup just means Ctrl-C falls back to the default handler.
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            };
            let outcome =
                commands::stream_debate(run, args.format, &mut io::stdout().lock(), shutdown)
                    .await?;

            Ok(if outcome.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::History(history) => {
            let store_path = config.store_path();
            let store = FileDecisionStore::open(&store_path).await.with_context(|| {
                format!("Failed to open decision store {}", store_path.display())
            })?;
            let mut out = io::stdout().lock();
            match history {
                HistoryCommand::List { skip, limit, json } => {
                    commands::list_history(&store, skip, limit, json, &mut out).await?
                }
                HistoryCommand::Show { id, json } => {
                    commands::show_history(&store, id, json, &mut out).await?
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Models(args) => {
            config.gateway.validate().map_err(anyhow::Error::msg)?;
            let gateway = GatewayClient::new(config.gateway.clone())
                .context("Failed to build gateway client")?;
            let mut out = io::stdout().lock();
            if args.test.is_empty() {
                commands::list_models(&gateway, &mut out).await?;
                return Ok(ExitCode::SUCCESS);
            }
            let all_available = commands::test_models(&gateway, &args.test, &mut out).await?;
            Ok(if all_available {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
