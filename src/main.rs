use anyhow::Context;
use boneguard::{config, model, server, telemetry};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Bone X-ray classification backend
#[derive(Parser, Debug)]
#[command(name = "boneguard", version, about)]
struct Cli {
    /// YAML config file (defaults to ./config.yaml when present)
    #[arg(short, long, env = "BONEGUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Model weights (.pth or .safetensors)
    #[arg(long, env = "BONEGUARD_MODEL_PATH")]
    model_path: Option<PathBuf>,

    /// Compute device: cpu, cuda[:N] or metal[:N]
    #[arg(long, env = "BONEGUARD_DEVICE")]
    device: Option<config::DeviceKind>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Init
    telemetry::init_tracing();
    let metrics = telemetry::install_metrics().context("failed to install metrics recorder")?;

    // 2. Load Config
    let mut config = config::AppConfig::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(model_path) = cli.model_path {
        config.model.path = model_path;
    }
    if let Some(device) = cli.device {
        config.model.device = device;
    }

    // 3. Load Model, once, before anything is served
    info!(
        path = %config.model.path.display(),
        architecture = config.model.architecture.name(),
        device = %config.model.device,
        "Loading model"
    );
    let handle = model::loader::load_classifier(&config.model).context("Error loading model")?;

    // 4. Create Router
    let state = server::types::AppState {
        classifier: Arc::new(handle),
        metrics,
    };
    let app = server::routes::create_router(state, config.server.max_upload_bytes);

    // 5. Bind & Serve
    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| {
            format!(
                "failed to bind {}:{}",
                config.server.host, config.server.port
            )
        })?;
    info!(
        "Server listening on http://{}:{}",
        config.server.host, config.server.port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
