//! Prometheus Metrics Registry - Feed Observability
//!
//! Registers and exposes Prometheus metrics on :9090. Fetch errors
//! are swallowed by the polling loop, so this is where they surface:
//! outcome counters, fetch latency, failure streaks, staleness and
//! subscriber counts, all labelled by feed key.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use crate::domain::entry::FeedState;
use crate::domain::error::FetchError;
use crate::domain::feed::FeedKey;
use crate::ports::telemetry::FeedTelemetry;

/// Centralized Prometheus metrics for the feed core.
///
/// All metrics follow the naming convention `microterm_feed_*` and
/// carry a `feed` label with the feed key (e.g. `deals:5`).
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Fetches by outcome (`ok`, `network`, `timeout`, `decode`, `empty`).
    pub fetches: IntCounterVec,
    /// Fetch latency histogram (milliseconds).
    pub fetch_latency_ms: HistogramVec,
    /// Current failure streak.
    pub consecutive_failures: IntGaugeVec,
    /// Staleness flag (1 = stale or failed, 0 = fresh). Set on commit
    /// and when a view observes age promotion.
    pub stale: GaugeVec,
    /// Live subscriptions per feed.
    pub subscribers: IntGaugeVec,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    ///
    /// # Errors
    /// Returns error if a metric cannot be created or registered.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let fetches = IntCounterVec::new(
            Opts::new("microterm_feed_fetches_total", "Feed fetches by outcome"),
            &["feed", "outcome"],
        )?;

        let fetch_latency_ms = HistogramVec::new(
            HistogramOpts::new(
                "microterm_feed_fetch_latency_ms",
                "Feed fetch latency in milliseconds",
            )
            .buckets(vec![
                10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
            ]),
            &["feed"],
        )?;

        let consecutive_failures = IntGaugeVec::new(
            Opts::new(
                "microterm_feed_consecutive_failures",
                "Failed fetches since the last success",
            ),
            &["feed"],
        )?;

        let stale = GaugeVec::new(
            Opts::new(
                "microterm_feed_stale",
                "Whether the feed is serving stale or no data (1=yes, 0=no)",
            ),
            &["feed"],
        )?;

        let subscribers = IntGaugeVec::new(
            Opts::new("microterm_feed_subscribers", "Live subscriptions per feed"),
            &["feed"],
        )?;

        registry.register(Box::new(fetches.clone()))?;
        registry.register(Box::new(fetch_latency_ms.clone()))?;
        registry.register(Box::new(consecutive_failures.clone()))?;
        registry.register(Box::new(stale.clone()))?;
        registry.register(Box::new(subscribers.clone()))?;

        Ok(Self {
            registry,
            fetches,
            fetch_latency_ms,
            consecutive_failures,
            stale,
            subscribers,
        })
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    /// Serve Prometheus metrics on the configured bind address.
    ///
    /// # Errors
    /// Returns error if the listener cannot bind or the server fails.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics_self = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics_self);
                async move { metrics.render() }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}

impl FeedTelemetry for MetricsRegistry {
    fn fetch_completed(&self, key: &FeedKey, error: Option<&FetchError>, elapsed: Duration) {
        let feed = key.to_string();
        let outcome = error.map_or("ok", FetchError::kind);
        self.fetches.with_label_values(&[feed.as_str(), outcome]).inc();
        self.fetch_latency_ms
            .with_label_values(&[feed.as_str()])
            .observe(elapsed.as_secs_f64() * 1000.0);
    }

    fn entry_committed(&self, key: &FeedKey, state: FeedState, consecutive_failures: u32) {
        let feed = key.to_string();
        self.consecutive_failures
            .with_label_values(&[feed.as_str()])
            .set(i64::from(consecutive_failures));
        let stale = if state == FeedState::Fresh { 0.0 } else { 1.0 };
        self.stale.with_label_values(&[feed.as_str()]).set(stale);
    }

    fn staleness_observed(&self, key: &FeedKey, stale: bool) {
        let feed = key.to_string();
        self.stale
            .with_label_values(&[feed.as_str()])
            .set(if stale { 1.0 } else { 0.0 });
    }

    fn subscribers_changed(&self, key: &FeedKey, subscribers: usize) {
        let feed = key.to_string();
        if subscribers == 0 {
            // Evicted: drop the per-feed gauges instead of freezing them.
            let labels = [feed.as_str()];
            let _ = self.stale.remove_label_values(&labels);
            let _ = self.consecutive_failures.remove_label_values(&labels);
            let _ = self.subscribers.remove_label_values(&labels);
            return;
        }
        self.subscribers
            .with_label_values(&[feed.as_str()])
            .set(i64::try_from(subscribers).unwrap_or(i64::MAX));
    }
}
