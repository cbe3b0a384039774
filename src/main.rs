//! microterm-feeds - Entry Point
//!
//! Headless dashboard runner: follows every configured feed through
//! the polling core, logs each view change and serves metrics and
//! health probes. Runs until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml (path from argv[1]) + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Create ApiClient (same-origin GET + concurrency + rate limit)
//! 4. Create MetricsRegistry and FeedRegistry
//! 5. Spawn health server (/live + /ready) and Prometheus exporter
//! 6. Spawn one view task per enabled feed
//! 7. Wait for SIGINT → graceful shutdown (unready→release→stop)

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use microterm_feeds::adapters::http::ApiClient;
use microterm_feeds::adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use microterm_feeds::config::{self, AppConfig};
use microterm_feeds::domain::payloads::FeedValue;
use microterm_feeds::ports::telemetry::{FeedTelemetry, NoopTelemetry};
use microterm_feeds::usecases::{FeedRegistry, FeedView, ViewAdapter};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = config::loader::load_config(&path).context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.dashboard.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.dashboard.name,
        version = env!("CARGO_PKG_VERSION"),
        base_url = %config.api.base_url,
        feeds = config.feeds.len(),
        "Starting microterm feeds"
    );

    // ── 3. Shutdown signal channel ──────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    // ── 4. HTTP transport + registries ──────────────────────
    let client =
        Arc::new(ApiClient::new(&config.api.client_config()).context("Failed to create API client")?);

    let metrics = Arc::new(MetricsRegistry::new().context("Failed to create metrics registry")?);
    let telemetry: Arc<dyn FeedTelemetry> = if config.metrics.enabled {
        Arc::clone(&metrics) as Arc<dyn FeedTelemetry>
    } else {
        Arc::new(NoopTelemetry)
    };
    let registry = Arc::new(FeedRegistry::<FeedValue>::with_telemetry(client, telemetry));

    if !registry.upstream_healthy().await {
        warn!(base_url = %config.api.base_url, "Feed API not reachable yet, polling anyway");
    }

    // ── 5. Health + metrics servers ─────────────────────────
    let health = Arc::new(HealthState::new());
    let mut servers: Vec<JoinHandle<()>> = Vec::new();

    let health_server = HealthServer::new(Arc::clone(&health), config.metrics.health_port);
    let health_shutdown = shutdown_tx.subscribe();
    servers.push(tokio::spawn(async move {
        if let Err(e) = health_server.run(health_shutdown).await {
            error!(error = %e, "Health server failed");
        }
    }));

    if config.metrics.enabled {
        let bind = config.metrics.bind_address.clone();
        let metrics_shutdown = shutdown_tx.subscribe();
        let exporter = Arc::clone(&metrics);
        servers.push(tokio::spawn(async move {
            if let Err(e) = exporter.serve(bind, metrics_shutdown).await {
                error!(error = %e, "Metrics server failed");
            }
        }));
    }

    // ── 6. One view per enabled feed ────────────────────────
    let views = spawn_views(&config, &registry, &health, &shutdown_tx)?;

    info!(views = views.len(), "All feeds subscribed - dashboard is running");

    // ── 7. Wait for SIGINT ──────────────────────────────────
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for SIGINT");
    }
    info!("SIGINT received, initiating graceful shutdown");

    // 1. Readiness probe → 503
    health.begin_shutdown();

    // 2. Stop views; each releases its subscription on drop
    let _ = shutdown_tx.send(());
    for handle in views {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    // 3. Stop anything still polling
    registry.shutdown();

    // 4. Let the servers drain
    for handle in servers {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    info!("Shutdown complete");
    Ok(())
}

/// Subscribe a view for every enabled feed and drive it in its own task.
fn spawn_views(
    config: &AppConfig,
    registry: &Arc<FeedRegistry<FeedValue>>,
    health: &Arc<HealthState>,
    shutdown_tx: &broadcast::Sender<()>,
) -> Result<Vec<JoinHandle<()>>> {
    let mut handles = Vec::new();

    for feed in config.feeds.iter().filter(|f| f.enabled) {
        let key = feed.key()?;
        let view = ViewAdapter::new(Arc::clone(registry), key.clone(), feed.schedule())
            .with_context(|| format!("Failed to subscribe to {key}"))?;

        health.set_feed(&key, false);
        let health = Arc::clone(health);
        let mut shutdown_rx = shutdown_tx.subscribe();

        handles.push(tokio::spawn(async move {
            let mut view = view;
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    next = view.changed() => {
                        let Some(next) = next else {
                            warn!(feed = %view.key(), "Feed torn down under its view");
                            break;
                        };
                        health.set_feed(view.key(), next.data.is_some());
                        log_view(&view, &next);
                    }
                }
            }
            health.remove_feed(view.key());
        }));
    }

    Ok(handles)
}

/// Log one delivered projection.
fn log_view(view: &ViewAdapter<FeedValue>, next: &FeedView<FeedValue>) {
    let items = next.data.as_deref().map_or(0, FeedValue::len);
    if next.is_stale || (next.data.is_none() && !next.is_loading) {
        let entry = view.entry();
        warn!(
            feed = %view.key(),
            items,
            consecutive_failures = entry.consecutive_failures,
            error = ?entry.last_error,
            "Feed view degraded"
        );
    } else {
        info!(feed = %view.key(), items, loading = next.is_loading, "Feed view updated");
    }
}
