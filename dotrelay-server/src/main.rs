use axum::{routing::get, Router};
use clap::Parser;
use dotrelay_compose::Catalog;
use dotrelay_core::Settings;
use dotrelay_runner::{probe, CancelToken, ProcessConfig, ProcessRunner, ToolRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

mod api;

use api::*;

#[derive(Parser)]
#[command(name = "dotrelay-server")]
#[command(about = "Serves .NET CLI operations over HTTP", long_about = None)]
struct Args {
    /// Path to a TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides the settings file)
    #[arg(long)]
    bind: Option<String>,

    /// Tool-chain driver to invoke (overrides the settings file)
    #[arg(long)]
    dotnet: Option<String>,

    /// Verbose logging
    #[arg(long)]
    debug: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ToolRegistry>,
    /// Cancelled on shutdown; every in-flight execution watches it.
    pub shutdown: CancelToken,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        settings.bind = bind;
    }
    if let Some(dotnet) = args.dotnet {
        settings.executable = dotnet;
    }
    settings.debug |= args.debug;
    settings.validate()?;

    init_tracing(settings.debug);

    let runner = ProcessRunner::new(ProcessConfig::from(&settings));

    info!(executable = %settings.executable, "Checking .NET CLI availability");
    let report = match probe(&settings.executable, &runner).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "The .NET CLI is not available");
            eprintln!("ERROR: .NET CLI is not available or not in PATH: {}", e);
            eprintln!("Please ensure the .NET SDK is installed and accessible.");
            std::process::exit(1);
        }
    };
    info!(
        version = %report.version,
        path = %report.path.display(),
        ".NET CLI version"
    );

    let registry = ToolRegistry::new(
        Catalog::builtin(),
        Arc::new(runner),
        settings.executable.clone(),
    );
    info!(operations = registry.catalog().len(), "Registered .NET CLI operations");

    let state = AppState {
        registry: Arc::new(registry),
        shutdown: CancelToken::new(),
    };

    let listener = tokio::net::TcpListener::bind(&settings.bind).await?;
    info!("Server listening on http://{}", settings.bind);
    axum::serve(listener, app(state.clone()))
        .with_graceful_shutdown(shutdown_signal(state.shutdown))
        .await?;

    Ok(())
}

fn init_tracing(debug: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if debug { "debug" } else { "info" })
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/tools", get(list_tools))
        .route("/api/v1/tools/:name", get(describe_tool).post(invoke_tool))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal(shutdown: CancelToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C");
        return;
    }
    info!("Shutdown requested, cancelling in-flight executions");
    shutdown.cancel();
}
