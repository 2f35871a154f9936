//! KB-Atlas CLI and REST API entry point.
//!
//! Binary name: `kbatlas`
//!
//! Parses CLI arguments, initializes logging, the database and services,
//! then dispatches to a command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use anyhow::Context;
use clap::Parser;
use clap_complete::generate;

use cli::{BuilderCommand, Cli, Commands, TemplateCommand};
use kbatlas_observe::tracing_setup::{LogFormat, init_tracing, shutdown_tracing};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need logging or app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "kbatlas", &mut std::io::stdout());
        return Ok(());
    }

    let format: LogFormat = cli
        .log_format
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    init_tracing(cli.log_filter(), format, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let state = AppState::init().await?;

    match cli.command {
        Commands::Builder { ref action } => {
            let owner = cli.owner_id()?;
            match action {
                BuilderCommand::New { template } => {
                    cli::builder::new_builder(&state, &owner, template.clone(), cli.json).await?;
                }
                BuilderCommand::List => {
                    cli::builder::list(&state, &owner, cli.json).await?;
                }
                BuilderCommand::Show { id } => {
                    cli::builder::show(&state, &owner, id, cli.json).await?;
                }
                BuilderCommand::Update { id, file } => {
                    cli::builder::update(&state, &owner, id, file, cli.json).await?;
                }
                BuilderCommand::Step { id, step } => {
                    cli::builder::step(&state, &owner, id, *step, cli.json).await?;
                }
                BuilderCommand::SyncFiles { id } => {
                    cli::builder::sync_files(&state, &owner, id, cli.json).await?;
                }
                BuilderCommand::Deploy { id, environment } => {
                    cli::builder::deploy(&state, &owner, id, *environment, cli.json).await?;
                }
                BuilderCommand::Delete { id } => {
                    cli::builder::delete(&state, &owner, id, cli.json).await?;
                }
            }
        }

        Commands::Template { action } => match action {
            TemplateCommand::List { all } => {
                cli::template::list(&state, all, cli.json).await?;
            }
            TemplateCommand::Seed => {
                cli::template::seed(&state, cli.json).await?;
            }
        },

        Commands::Serve { port, host } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;

            tracing::info!(
                %addr,
                data_dir = %state.data_dir.display(),
                provider = %state.config.provider.base_url,
                "KB-Atlas API listening"
            );
            if !cli.quiet {
                println!(
                    "  {} KB-Atlas API listening on {}",
                    console::style("⚡").bold(),
                    console::style(format!("http://{addr}")).cyan()
                );
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
            }

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            tracing::info!("Server stopped");
        }

        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
