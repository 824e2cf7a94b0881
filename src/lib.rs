pub mod config;
pub mod error;
pub mod metrics;
pub mod rate_limit;
pub mod store;

use crate::config::ReqLimitConfig;
use crate::error::{ReqLimitError, Result};
use crate::metrics::{metrics_handler, MetricsService};
use crate::rate_limit::{rate_limit_middleware, LimiterRegistry, RateLimiter};
use axum::{middleware, routing::get, Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Limiter registered when the configuration defines none
pub const DEFAULT_LIMITER: (&str, u64, u32) = ("rps", 60, 20);

/// Build the demo application: `/limit` guarded by every limiter, `/health`
/// unguarded, and `/metrics` when a metrics service is given.
pub fn build_app(limiters: &[RateLimiter], metrics: Option<MetricsService>) -> Router {
    let mut limited = Router::new().route("/limit", get(limit_handler));
    for limiter in limiters {
        limited = limited.route_layer(middleware::from_fn_with_state(
            limiter.clone(),
            rate_limit_middleware,
        ));
    }

    let mut app = Router::new()
        .route("/health", get(health_handler))
        .merge(limited);

    if let Some(metrics) = metrics {
        app = app.merge(
            Router::new()
                .route("/metrics", get(metrics_handler))
                .with_state(metrics),
        );
    }

    app.layer(TraceLayer::new_for_http())
}

async fn limit_handler() -> &'static str {
    "Hello and welcome to \"/limit\""
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Register every configured limiter on the registry
pub fn register_limiters(
    registry: &mut LimiterRegistry,
    config: &ReqLimitConfig,
) -> Result<Vec<RateLimiter>> {
    if config.limiters.is_empty() {
        let (name, interval_secs, limit) = DEFAULT_LIMITER;
        return Ok(vec![registry.new_limiter(name, interval_secs, limit)?]);
    }

    config
        .limiters
        .iter()
        .map(|l| registry.new_limiter(&l.name, l.interval_secs, l.limit))
        .collect()
}

/// Run the rate limited server until Ctrl-C, then close the registry
pub async fn serve(config: ReqLimitConfig) -> Result<()> {
    config.validate()?;

    info!("Starting rate limited server");

    let mut registry = LimiterRegistry::connect(&config.store).await?;
    let result = run(&mut registry, &config).await;

    // Closed exactly once, whether or not serving succeeded.
    registry.close();
    result
}

async fn run(registry: &mut LimiterRegistry, config: &ReqLimitConfig) -> Result<()> {
    let limiters = register_limiters(registry, config)?;
    info!("Loaded {} limiters", limiters.len());

    let metrics = if config.metrics {
        Some(MetricsService::new()?)
    } else {
        None
    };

    let app = build_app(&limiters, metrics);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(ReqLimitError::Io)?;

    info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

/// Initialize tracing/logging
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reqlimit=debug,tower_http=debug".into()),
        )
        .with_target(false)
        .compact()
        .init();
}
