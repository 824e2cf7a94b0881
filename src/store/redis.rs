use super::CounterStore;
use crate::error::{ReqLimitError, Result};
use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, PoolConfig, Runtime};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, info};
use url::Url;

/// Redis-backed counter store over a pool of authenticated connections
pub struct RedisStore {
    /// Connection pool
    pool: Pool,
    /// `host:port`, kept for logging
    host: String,
}

impl RedisStore {
    /// Create the pool and verify the store is reachable.
    ///
    /// One connection is acquired and pinged before returning, so an
    /// unreachable host or a rejected password surfaces here as
    /// `ReqLimitError::Connection`.
    pub async fn connect(
        host: &str,
        password: Option<&SecretString>,
        pool_size: usize,
    ) -> Result<Self> {
        let url = redis_url(host, password)?;

        let mut config = Config::from_url(url);
        config.pool = Some(PoolConfig::new(pool_size.max(1)));

        let pool = config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| ReqLimitError::Connection(e.to_string()))?;

        let store = Self {
            pool,
            host: host.to_string(),
        };

        if let Err(e) = store.ping().await {
            error!(host = %store.host, "Failed to connect to Redis: {}", e);
            store.pool.close();
            return Err(ReqLimitError::Connection(e.to_string()));
        }

        info!(host = %store.host, pool_size, "Connected to Redis counter store");
        Ok(store)
    }

    /// Test Redis connection
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        redis::cmd("PING")
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(ReqLimitError::from)
    }

    /// Maximum number of pooled connections
    pub fn pool_size(&self) -> usize {
        self.pool.status().max_size
    }

    async fn connection(&self) -> Result<Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| ReqLimitError::Store(format!("Failed to acquire connection: {}", e)))
    }
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn incr_and_expire(&self, key: &str, ttl_secs: u64) -> Result<i64> {
        // Returned to the pool when dropped, on every path.
        let mut conn = self.connection().await?;

        let count: i64 = redis::cmd("INCR")
            .arg(key)
            .query_async(&mut conn)
            .await?;

        if count == 1 {
            redis::cmd("EXPIRE")
                .arg(key)
                .arg(ttl_secs)
                .query_async::<_, ()>(&mut conn)
                .await?;
            debug!("Started window for key {} ({}s)", key, ttl_secs);
        }

        Ok(count)
    }

    fn close(&self) {
        info!(host = %self.host, "Closing Redis connection pool");
        self.pool.close();
    }

    fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

/// Build a `redis://` URL from `host:port` and an optional password
fn redis_url(host: &str, password: Option<&SecretString>) -> Result<String> {
    let mut url = Url::parse(&format!("redis://{}", host))
        .map_err(|e| ReqLimitError::Config(format!("Invalid store host '{}': {}", host, e)))?;

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ReqLimitError::Config(format!(
            "Invalid store host '{}': missing hostname",
            host
        )));
    }

    if let Some(password) = password {
        let password = password.expose_secret();
        if !password.is_empty() {
            url.set_password(Some(password)).map_err(|_| {
                ReqLimitError::Config(format!("Cannot attach password to host '{}'", host))
            })?;
        }
    }

    Ok(url.into())
}
