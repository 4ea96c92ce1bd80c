#![forbid(unsafe_code)]

//! `cartstream` — real-time cart update bus and recipe suggestion server.
//!
//! Bootstraps configuration, starts the HTTP/SSE transport, the suggestion
//! engine with its background schedulers, and the cache eviction sweeper.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use cartstream::config::GlobalConfig;
use cartstream::hub::CartUpdateHub;
use cartstream::server::{self, AppState};
use cartstream::suggest::{cache, SuggestionCache, SuggestionEngine};
use cartstream::upstream::{
    CartService, HttpCartService, HttpProductCatalog, HttpRecipeOrchestrator, ProductCatalog,
    RecipeOrchestrator,
};
use cartstream::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "cartstream", about = "Cart update bus and recipe suggestion server", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("cartstream server bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let config = Arc::new(GlobalConfig::load_from_path(&args.config)?);
    info!("configuration loaded");

    let client = reqwest::Client::new();

    // ── Build collaborator ports ────────────────────────
    let cart: Arc<dyn CartService> = Arc::new(HttpCartService::new(
        client.clone(),
        config.upstream.cart_service_url.clone(),
    ));
    let catalog: Arc<dyn ProductCatalog> = Arc::new(HttpProductCatalog::new(
        client.clone(),
        config.upstream.product_catalog_url.clone(),
    ));
    let orchestrator: Arc<dyn RecipeOrchestrator> = Arc::new(HttpRecipeOrchestrator::new(
        client,
        config.upstream.recipe_service_url.clone(),
    ));

    let ct = CancellationToken::new();

    // ── Suggestion cache and eviction sweeper ───────────
    let suggestion_cache = Arc::new(SuggestionCache::new());
    let sweeper_handle = cache::spawn_ttl_sweeper(
        Arc::clone(&suggestion_cache),
        config.suggest.cache_ttl_seconds,
        ct.clone(),
    );
    info!("suggestion cache sweeper started");

    // ── Suggestion engine ───────────────────────────────
    let engine = Arc::new(SuggestionEngine::new(
        suggestion_cache,
        Arc::clone(&orchestrator),
        Arc::clone(&cart),
        Arc::clone(&catalog),
        config.suggest.clone(),
        ct.child_token(),
    ));

    // ── Shared application state ────────────────────────
    let hub = CartUpdateHub::new(config.mailbox_capacity);
    let state = Arc::new(AppState {
        config: Arc::clone(&config),
        hub,
        engine,
        cart,
        catalog,
        orchestrator,
    });

    // ── Start transport ─────────────────────────────────
    let http_ct = ct.clone();
    let http_state = Arc::clone(&state);
    let http_handle = tokio::spawn(async move {
        if let Err(err) = server::serve(http_state, http_ct).await {
            error!(%err, "http transport failed");
        }
    });

    info!("cartstream server ready");

    // ── Wait for shutdown signal ────────────────────────
    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    let _ = tokio::join!(http_handle, sweeper_handle);
    info!("cartstream shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
