//! HTTP receiver for NiFi provenance and bulletin reports
//!
//! NiFi's reporting tasks POST JSON arrays of events. Each request is
//! translated into one trace batch and handed to the downstream consumer.

mod api;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use nifi_otel_core::config::ServerConfig;
use nifi_otel_core::consumer::TraceConsumer;
use nifi_otel_core::metrics::SharedMetrics;
use nifi_otel_core::EventTranslator;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Shared application state
pub struct AppState {
    /// Held for one batch translation or one sweep, never across an await
    pub translator: Mutex<EventTranslator>,
    pub consumer: Arc<dyn TraceConsumer>,
    pub metrics: SharedMetrics,
}

impl AppState {
    /// Sweep expired lineage entries and update the gauges
    pub fn sweep(&self) -> usize {
        let mut translator = self.translator.lock();
        let removed = translator.sweep();
        self.metrics.record_sweep(removed, translator.lineage_len());
        removed
    }
}

/// The receiver: router, state, and optional periodic sweeping
pub struct ReceiverServer {
    config: ServerConfig,
    state: Arc<AppState>,
    sweep_interval: Option<Duration>,
}

impl ReceiverServer {
    pub fn new(
        config: ServerConfig,
        translator: EventTranslator,
        consumer: Arc<dyn TraceConsumer>,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            config,
            state: Arc::new(AppState {
                translator: Mutex::new(translator),
                consumer,
                metrics,
            }),
            sweep_interval: None,
        }
    }

    /// Also sweep on a fixed interval; `None` or zero disables it
    pub fn with_sweep_interval(mut self, interval: Option<Duration>) -> Self {
        self.sweep_interval = interval.filter(|d| !d.is_zero());
        self
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(
                &self.config.provenance_url_path,
                post(api::receive_provenance),
            )
            .route(&self.config.bulletin_url_path, post(api::receive_bulletins))
            .route("/health", get(api::health_check))
            .route("/metrics", get(api::get_metrics_prometheus))
            .route("/api/metrics", get(api::get_metrics))
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(self.config.max_body_bytes))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve until `shutdown` resolves, then flush the consumer
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();

        let sweeper = self.sweep_interval.map(|interval| {
            let state = self.state.clone();
            info!(interval_secs = interval.as_secs_f64(), "Periodic lineage sweep enabled");
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    let removed = state.sweep();
                    if removed > 0 {
                        debug!(removed, "Periodic lineage sweep");
                    }
                }
            })
        });

        info!("NiFi receiver listening on {}", listener.local_addr()?);
        info!("  - provenance at POST {}", self.config.provenance_url_path);
        info!("  - bulletins at POST {}", self.config.bulletin_url_path);

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        if let Some(handle) = sweeper {
            handle.abort();
        }
        if let Err(e) = self.state.consumer.flush().await {
            warn!(error = %e, "Failed to flush consumer on shutdown");
        }
        info!("NiFi receiver stopped");

        result?;
        Ok(())
    }
}
