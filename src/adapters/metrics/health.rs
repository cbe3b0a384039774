//! Health Check Server - Liveness and Readiness Probes
//!
//! Exposes /live and /ready endpoints via axum 0.7. The process is
//! ready once at least one feed has data to show and shutdown has not
//! started; a dashboard with only loading panels is not ready.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{info, instrument};

use crate::domain::feed::FeedKey;

/// Shared health state polled by readiness probes.
#[derive(Debug, Default)]
pub struct HealthState {
    /// Whether each followed feed currently has a value.
    feeds: DashMap<FeedKey, bool>,
    /// Set once graceful shutdown begins.
    shutting_down: AtomicBool,
}

impl HealthState {
    /// Create an empty health state (not ready).
    pub fn new() -> Self {
        Self::default()
    }

    /// Record whether `key` has data to show.
    pub fn set_feed(&self, key: &FeedKey, has_data: bool) {
        self.feeds.insert(key.clone(), has_data);
    }

    /// Stop tracking `key`.
    pub fn remove_feed(&self, key: &FeedKey) {
        self.feeds.remove(key);
    }

    /// Flip readiness off for the rest of the process lifetime.
    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::Relaxed);
    }

    /// Check if the dashboard has anything to serve.
    pub fn is_ready(&self) -> bool {
        !self.shutting_down.load(Ordering::Relaxed)
            && self.feeds.iter().any(|entry| *entry.value())
    }
}

/// Axum-based health check HTTP server.
pub struct HealthServer {
    /// Health state shared with all feed views.
    state: Arc<HealthState>,
    /// Bind port (default 8080 from config).
    port: u16,
}

impl HealthServer {
    /// Create a new health server.
    pub const fn new(state: Arc<HealthState>, port: u16) -> Self {
        Self { state, port }
    }

    /// Build the probe router.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/live", get(Self::liveness))
            .route("/ready", get(Self::readiness))
            .with_state(Arc::clone(&self.state))
    }

    /// Serve probes until the shutdown broadcast fires.
    ///
    /// # Errors
    /// Returns error if the listener cannot bind or the server fails.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let app = self.router();

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!(address = %addr, "Health server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }

    /// Liveness probe: always returns 200 if the process is running.
    async fn liveness() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }

    /// Readiness probe: 200 only when some feed has data.
    async fn readiness(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
        if state.is_ready() {
            (StatusCode::OK, "READY")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
        }
    }
}
