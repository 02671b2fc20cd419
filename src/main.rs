use anyhow::Context;
use clap::{Parser, Subcommand};
use lintbox::{AppState, Workbench, config, routes};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::info;

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "lintbox", about = "Remote Python linting and execution service", version)]
struct Cli {
    /// Path to TOML config file
    #[arg(short, long, default_value = "lintbox.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve,
    /// Lint a local file and print its diagnostics as JSON
    Check {
        /// Python source file
        file: PathBuf,
    },
    /// Run a local file with the configured interpreter and timeout
    Run {
        /// Python source file
        file: PathBuf,
    },
}

/// Session key used by the one-shot CLI commands.
const CLI_SESSION: &str = "cli";

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging from RUST_LOG (default: info)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lintbox=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;

    match cli.command {
        Commands::Serve => serve(cfg).await,
        Commands::Check { file } => check(cfg, &file).await,
        Commands::Run { file } => run(cfg, &file).await,
    }
}

// ── Serve ──────────────────────────────────────────────────────────────────

async fn serve(cfg: config::ServiceConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .context("invalid bind address")?;

    info!(
        "Interpreter: {} (timeout {}s), linter: {}",
        cfg.interpreter, cfg.run_timeout_secs, cfg.linter.program
    );
    let state = AppState::from_config(cfg).context("failed to initialise workbench")?;
    let app = routes::app(state.clone());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind TCP listener")?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    state.workbench.shutdown().await;
    info!("Server stopped.");
    Ok(())
}

// ── Graceful shutdown ──────────────────────────────────────────────────────

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install CTRL+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, stopping server...");
}

// ── One-shot commands ──────────────────────────────────────────────────────

async fn check(cfg: config::ServiceConfig, file: &Path) -> anyhow::Result<()> {
    let code = read_source(file)?;
    let workbench = Workbench::from_config(&cfg)?;
    let result = workbench.check(CLI_SESSION, &code).await;
    workbench.shutdown().await;

    let records = result?;
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

async fn run(cfg: config::ServiceConfig, file: &Path) -> anyhow::Result<()> {
    let code = read_source(file)?;
    let workbench = Workbench::from_config(&cfg)?;
    let result = workbench.run(CLI_SESSION, &code).await;
    workbench.shutdown().await;

    print!("{}", result?);
    Ok(())
}

fn read_source(file: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))
}
