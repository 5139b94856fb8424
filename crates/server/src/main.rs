use anyhow::Context;
use clap::Parser;
use server::{app, AppConfig, AppState, Args};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "server=info,stamp=info,pdf_core=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = AppConfig::from_args(&args);
    config.ensure_dirs().with_context(|| {
        format!(
            "failed to create storage directories under {}",
            args.base_dir.display()
        )
    })?;

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;

    info!(
        addr = %listener.local_addr()?,
        uploads = %config.upload_dir.display(),
        output = %config.output_dir.display(),
        "qrstamp listening"
    );

    axum::serve(listener, app(AppState::new(config)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("qrstamp stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
