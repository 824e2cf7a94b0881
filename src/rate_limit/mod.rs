//! Rate limiting module
//!
//! Fixed-window limiting over a shared counter store. A `LimiterRegistry`
//! owns the store and namespace and mints named `RateLimiter`s; each
//! evaluation increments the counter at
//! `[<namespace>:]limiter:<name>:<identity>` and compares it to the limit.
//!
//! The window starts with the first request and lasts `interval_secs`.
//! Bursts straddling a window boundary can exceed the limit over a sliding
//! interval; this approximation is accepted.
//!
//! # Example
//!
//! ```rust,no_run
//! use reqlimit::config::StoreConfig;
//! use reqlimit::rate_limit::{rate_limit_middleware, LimiterRegistry};
//! use axum::{middleware, routing::get, Router};
//!
//! #[tokio::main]
//! async fn main() -> reqlimit::error::Result<()> {
//!     let config = StoreConfig {
//!         namespace: "Appname".to_string(),
//!         ..StoreConfig::default()
//!     };
//!
//!     let mut registry = LimiterRegistry::connect(&config).await?;
//!     let rps = registry.new_limiter("rps", 60, 20)?;
//!
//!     let _app: Router = Router::new()
//!         .route("/limit", get(|| async { "Hello" }))
//!         .route_layer(middleware::from_fn_with_state(rps, rate_limit_middleware));
//!
//!     registry.close();
//!     Ok(())
//! }
//! ```

pub mod client_ip;
pub mod limiter;
pub mod middleware;
pub mod registry;
pub mod types;

// Re-export commonly used types
pub use client_ip::client_ip;
pub use limiter::RateLimiter;
pub use middleware::{add_rate_limit_headers, rate_limit_middleware};
pub use registry::LimiterRegistry;
pub use types::{LimiterDefinition, RateLimitResult, WindowKey};
