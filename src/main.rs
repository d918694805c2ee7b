//! firewatch - RSS-to-Telegram incident review service
//!
//! Polls a news feed for fire-incident articles, posts candidates to a
//! Telegram chat for human approval, and persists approved incidents to
//! Supabase.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use firewatch::config;
use firewatch::services::{
    ingest, sweep, HttpArticleFetcher, RssFetcher, SupabaseRepository, TelegramNotifier,
    WebhookHandler,
};
use firewatch::store::CandidateStore;
use firewatch::AppState;

#[derive(Debug, Parser)]
#[command(name = "firewatch", version, about = "RSS-to-Telegram incident review bot")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, env = "FIREWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address for the webhook server
    #[arg(long, env = "FIREWATCH_LISTEN", default_value = "127.0.0.1:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!("Starting firewatch");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let app_config = Arc::new(config::load(args.config.as_deref())?);

    let store = Arc::new(CandidateStore::new());

    let rss_fetcher = Arc::new(RssFetcher::new(app_config.rss.clone())?);
    let article_fetcher = Arc::new(HttpArticleFetcher::new()?);
    let notifier = Arc::new(TelegramNotifier::new(app_config.telegram.clone())?);
    let repository = Arc::new(SupabaseRepository::new(app_config.supabase.clone()));

    if let Err(e) = notifier.setup_webhook().await {
        warn!("Telegram setWebhook failed: {}", e);
    }

    let webhook_handler = Arc::new(WebhookHandler::new(
        Arc::clone(&store),
        notifier.clone(),
        repository.clone(),
        article_fetcher.clone(),
        Arc::clone(&app_config),
    ));

    let shutdown = CancellationToken::new();

    let ingest_task = tokio::spawn(ingest::run_ingest_loop(
        Arc::clone(&store),
        rss_fetcher,
        notifier,
        Duration::from_secs(app_config.rss.poll_interval_seconds.max(1)),
        shutdown.clone(),
    ));

    let sweep_task = tokio::spawn(sweep::run_sweep_loop(
        Arc::clone(&store),
        repository,
        Duration::from_secs(app_config.supabase.poll_interval_seconds.max(1)),
        shutdown.clone(),
    ));

    let state = AppState::new(store, webhook_handler, app_config);
    let app = firewatch::build_router(state);

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    info!("Listening on http://{}", args.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    let _ = ingest_task.await;
    let _ = sweep_task.await;

    info!("firewatch stopped");
    Ok(())
}

/// Resolves when the process receives Ctrl+C or SIGTERM, cancelling the
/// background loops on the way out.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }

    shutdown.cancel();
}
