//! HTTP surface: a landing page and the scrape endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use canalzk_collector::{Collector, ExporterConfig};
use canalzk_config::ConfigManager;
use canalzk_coord::CoordStore;
use canalzk_monitor::{render_prometheus, PROMETHEUS_CONTENT_TYPE};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CoordStore>,
    pub config: Arc<ConfigManager<ExporterConfig>>,
}

impl AppState {
    pub fn new(store: Arc<dyn CoordStore>, config: Arc<ConfigManager<ExporterConfig>>) -> Self {
        Self { store, config }
    }
}

/// Routes are fixed at construction; `web.metrics_path` is not hot-reloaded.
pub fn router(state: AppState) -> Router {
    let metrics_path = state.config.get().web.metrics_path.clone();
    Router::new()
        .route("/", get(landing))
        .route(&metrics_path, get(metrics))
        .with_state(state)
}

async fn landing(State(state): State<AppState>) -> Html<String> {
    let path = state.config.get().web.metrics_path.clone();
    Html(format!(
        "<html>\n<head><title>Canal ZooKeeper Exporter</title></head>\n<body>\n\
         <h1>Canal ZooKeeper Exporter</h1>\n\
         <p><a href=\"{path}\">Metrics</a></p>\n</body>\n</html>\n"
    ))
}

async fn metrics(State(state): State<AppState>) -> Response {
    // One snapshot per scrape; a concurrent reload applies to the next one.
    let cfg: Arc<ExporterConfig> = Arc::clone(&*state.config.get());
    let collector = Collector::new(state.store.clone(), cfg.zk.timeout);

    let samples =
        match tokio::time::timeout(cfg.web.timeout, collector.collect(&cfg.clusters)).await {
            Ok(samples) => samples,
            Err(_) => {
                tracing::warn!(timeout = ?cfg.web.timeout, "scrape exceeded web timeout");
                return (StatusCode::SERVICE_UNAVAILABLE, "scrape timed out\n").into_response();
            }
        };

    match render_prometheus(&cfg.namespace, &samples) {
        Ok(body) => ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("error encoding metrics: {}\n", e),
            )
                .into_response()
        }
    }
}
