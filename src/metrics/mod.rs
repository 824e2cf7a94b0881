use crate::error::{ReqLimitError, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use tracing::{debug, info};

pub const REQUESTS_TOTAL: &str = "reqlimit_requests_total";
pub const STORE_ERRORS_TOTAL: &str = "reqlimit_store_errors_total";

/// Metrics service for collecting and exposing Prometheus metrics
#[derive(Clone)]
pub struct MetricsService {
    handle: Arc<PrometheusHandle>,
}

impl MetricsService {
    /// Install the global Prometheus recorder. Only one may exist per process.
    pub fn new() -> Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            ReqLimitError::Config(format!("Failed to install metrics recorder: {}", e))
        })?;

        Self::register_metrics();

        info!("Metrics service initialized successfully");

        Ok(Self {
            handle: Arc::new(handle),
        })
    }

    fn register_metrics() {
        describe_counter!(
            REQUESTS_TOTAL,
            "Total number of rate limiter evaluations by outcome"
        );
        describe_counter!(
            STORE_ERRORS_TOTAL,
            "Total number of evaluations that failed in the counter store"
        );

        debug!("All metrics registered with descriptions");
    }

    /// Render metrics in Prometheus format
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Metrics endpoint handler
pub async fn metrics_handler(State(service): State<MetricsService>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        service.render(),
    )
}

/// Record one evaluation outcome
pub fn record_evaluation(limiter: &str, exceeded: bool) {
    let labels = [
        ("limiter", limiter.to_string()),
        (
            "outcome",
            if exceeded { "exceeded" } else { "allowed" }.to_string(),
        ),
    ];
    counter!(REQUESTS_TOTAL, &labels).increment(1);
}

/// Record a counter store failure
pub fn record_store_error(limiter: &str) {
    let labels = [("limiter", limiter.to_string())];
    counter!(STORE_ERRORS_TOTAL, &labels).increment(1);
}
