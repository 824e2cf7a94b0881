use super::limiter::RateLimiter;
use super::types::LimiterDefinition;
use crate::config::{StoreBackend, StoreConfig};
use crate::error::{ReqLimitError, Result};
use crate::store::memory::DEFAULT_PURGE_INTERVAL;
use crate::store::{CounterStore, MemoryStore, RedisStore};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// Owns the counter store and namespace, and mints named limiters
///
/// Limiter names are unique per registry. Registration takes `&mut self`, so
/// it happens during single-threaded setup before limiters are handed out.
pub struct LimiterRegistry {
    namespace: Arc<str>,
    store: Arc<dyn CounterStore>,
    names: HashSet<String>,
    purge_task: Option<JoinHandle<()>>,
}

impl LimiterRegistry {
    /// Connect to the configured store eagerly
    ///
    /// The memory backend is swept for expired windows until `close`.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        match config.backend {
            StoreBackend::Redis => {
                let store = RedisStore::connect(
                    &config.host,
                    config.password.as_ref(),
                    config.effective_pool_size(),
                )
                .await?;
                Ok(Self::with_store(config.namespace.as_str(), Arc::new(store)))
            }
            StoreBackend::Memory => {
                info!("Using in-memory counter store");
                Ok(Self::with_memory_store(
                    config.namespace.as_str(),
                    Arc::new(MemoryStore::new()),
                    DEFAULT_PURGE_INTERVAL,
                ))
            }
        }
    }

    /// Build a registry over an existing store
    pub fn with_store(namespace: impl Into<String>, store: Arc<dyn CounterStore>) -> Self {
        let namespace: String = namespace.into();
        Self {
            namespace: Arc::from(namespace),
            store,
            names: HashSet::new(),
            purge_task: None,
        }
    }

    /// Build a registry over a memory store, purging expired windows every
    /// `purge_every` until the registry is closed
    pub fn with_memory_store(
        namespace: impl Into<String>,
        store: Arc<MemoryStore>,
        purge_every: Duration,
    ) -> Self {
        let purge_task = store.start_purging(purge_every);
        let mut registry = Self::with_store(namespace, store);
        registry.purge_task = Some(purge_task);
        registry
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Register a new limiter allowing `limit` requests per `interval_secs`.
    ///
    /// Fails with `ReqLimitError::DuplicateLimiter` when `name` is already
    /// registered here, and with `ReqLimitError::Config` for an empty name or
    /// a zero interval or limit.
    pub fn new_limiter(
        &mut self,
        name: &str,
        interval_secs: u64,
        limit: u32,
    ) -> Result<RateLimiter> {
        if name.is_empty() {
            return Err(ReqLimitError::Config("Limiter name cannot be empty".to_string()));
        }
        if interval_secs == 0 {
            return Err(ReqLimitError::Config(format!(
                "Limiter interval must be > 0 for limiter: {}",
                name
            )));
        }
        if limit == 0 {
            return Err(ReqLimitError::Config(format!(
                "Limiter limit must be > 0 for limiter: {}",
                name
            )));
        }
        if !self.names.insert(name.to_string()) {
            return Err(ReqLimitError::DuplicateLimiter(name.to_string()));
        }

        info!(
            namespace = %self.namespace,
            "Registered limiter {}: {} requests per {}s",
            name, limit, interval_secs
        );

        Ok(RateLimiter::new(
            LimiterDefinition {
                name: name.to_string(),
                interval_secs,
                limit,
            },
            self.namespace.clone(),
            self.store.clone(),
        ))
    }

    /// Whether `name` is already taken
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Registered limiter names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Release the store's connections. Limiters minted here fail with a
    /// store error afterwards.
    pub fn close(self) {
        info!(namespace = %self.namespace, "Closing limiter registry");
        if let Some(task) = self.purge_task {
            task.abort();
        }
        self.store.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(namespace: &str) -> LimiterRegistry {
        LimiterRegistry::with_store(namespace, Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_new_limiter() {
        let mut registry = registry("Appname");
        let limiter = registry.new_limiter("rps", 60, 20).unwrap();

        assert_eq!(limiter.name(), "rps");
        assert_eq!(limiter.interval_secs(), 60);
        assert_eq!(limiter.limit(), 20);
        assert!(registry.contains("rps"));
        assert_eq!(registry.namespace(), "Appname");
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let mut registry = registry("");
        registry.new_limiter("rps", 60, 20).unwrap();

        let err = registry.new_limiter("rps", 1, 5).unwrap_err();
        assert!(matches!(err, ReqLimitError::DuplicateLimiter(ref name) if name == "rps"));
        assert!(err.is_configuration());

        // Other names are still accepted
        assert!(registry.new_limiter("rpm", 60, 100).is_ok());
        let mut names: Vec<_> = registry.names().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["rpm", "rps"]);
    }

    #[test]
    fn test_names_are_scoped_per_registry() {
        let mut first = registry("");
        let mut second = registry("");

        assert!(first.new_limiter("rps", 60, 20).is_ok());
        assert!(second.new_limiter("rps", 60, 20).is_ok());
    }

    #[test]
    fn test_invalid_definitions() {
        let mut registry = registry("");

        assert!(matches!(
            registry.new_limiter("", 60, 20),
            Err(ReqLimitError::Config(_))
        ));
        assert!(matches!(
            registry.new_limiter("rps", 0, 20),
            Err(ReqLimitError::Config(_))
        ));
        assert!(matches!(
            registry.new_limiter("rps", 60, 0),
            Err(ReqLimitError::Config(_))
        ));

        // Rejected definitions do not reserve the name
        assert!(!registry.contains("rps"));
    }

    #[tokio::test]
    async fn test_limiters_share_namespace_and_store() {
        let store = Arc::new(MemoryStore::new());
        let mut registry = LimiterRegistry::with_store("Appname", store.clone());
        let limiter = registry.new_limiter("rps", 60, 20).unwrap();

        limiter.evaluate("1.2.3.4").await.unwrap();
        assert_eq!(store.count("Appname:limiter:rps:1.2.3.4"), Some(1));
    }

    #[tokio::test]
    async fn test_close_releases_store() {
        let store = Arc::new(MemoryStore::new());
        let mut registry = LimiterRegistry::with_store("", store.clone());
        let limiter = registry.new_limiter("rps", 60, 20).unwrap();

        registry.close();
        assert!(store.is_closed());
        assert!(matches!(
            limiter.evaluate("1.2.3.4").await,
            Err(ReqLimitError::Store(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_memory_backend() {
        let config = StoreConfig {
            backend: StoreBackend::Memory,
            namespace: "mem".to_string(),
            ..StoreConfig::default()
        };

        let mut registry = LimiterRegistry::connect(&config).await.unwrap();
        let limiter = registry.new_limiter("rps", 60, 1).unwrap();
        assert!(!limiter.evaluate("1.2.3.4").await.unwrap());
        assert!(limiter.evaluate("1.2.3.4").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_registry_purges_expired_windows() {
        let store = Arc::new(MemoryStore::new());
        let mut registry =
            LimiterRegistry::with_memory_store("", store.clone(), Duration::from_secs(60));
        let limiter = registry.new_limiter("rps", 1, 20).unwrap();

        for i in 0..1000 {
            limiter.evaluate(&format!("10.0.{}.{}", i / 256, i % 256)).await.unwrap();
        }
        assert_eq!(store.len(), 1000);

        tokio::time::advance(Duration::from_secs(3600)).await;
        tokio::task::yield_now().await;

        limiter.evaluate("192.168.0.1").await.unwrap();
        assert_eq!(store.len(), 1);

        registry.close();
        assert!(store.is_closed());
    }

    #[tokio::test]
    async fn test_connect_unreachable_redis() {
        let config = StoreConfig {
            host: "127.0.0.1:1".to_string(),
            ..StoreConfig::default()
        };

        assert!(matches!(
            LimiterRegistry::connect(&config).await,
            Err(ReqLimitError::Connection(_))
        ));
    }
}
