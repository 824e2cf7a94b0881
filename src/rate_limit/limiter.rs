use super::types::{LimiterDefinition, RateLimitResult, WindowKey};
use crate::error::Result;
use crate::metrics::{record_evaluation, record_store_error};
use crate::store::CounterStore;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Fixed-window rate limiter minted by a `LimiterRegistry`
///
/// Cloning is cheap; clones share the registry's store and namespace.
#[derive(Clone)]
pub struct RateLimiter {
    definition: Arc<LimiterDefinition>,
    namespace: Arc<str>,
    store: Arc<dyn CounterStore>,
}

impl RateLimiter {
    pub(crate) fn new(
        definition: LimiterDefinition,
        namespace: Arc<str>,
        store: Arc<dyn CounterStore>,
    ) -> Self {
        Self {
            definition: Arc::new(definition),
            namespace,
            store,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn limit(&self) -> u32 {
        self.definition.limit
    }

    pub fn interval_secs(&self) -> u64 {
        self.definition.interval_secs
    }

    pub fn definition(&self) -> &LimiterDefinition {
        &self.definition
    }

    /// Store key for `identity` under this limiter
    pub fn window_key(&self, identity: &str) -> WindowKey {
        WindowKey::new(&self.namespace, &self.definition.name, identity)
    }

    /// Count one request for `identity` and report whether it is over quota.
    ///
    /// A store failure is returned as an error; the caller decides whether
    /// to fail open or closed.
    pub async fn evaluate(&self, identity: &str) -> Result<bool> {
        self.check(identity).await.map(|result| result.exceeded)
    }

    /// Like `evaluate`, with the window count attached
    pub async fn check(&self, identity: &str) -> Result<RateLimitResult> {
        let key = self.window_key(identity);

        let count = match self
            .store
            .incr_and_expire(key.as_str(), self.definition.interval_secs)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                error!(limiter = %self.name(), "Counter store error for key {}: {}", key, e);
                record_store_error(self.name());
                return Err(e);
            }
        };

        let result = RateLimitResult::new(
            count,
            self.definition.limit,
            self.definition.interval_secs,
        );

        if result.exceeded {
            warn!(
                limiter = %self.name(),
                "Rate limit exceeded for key: {} ({}/{})",
                key, count, self.definition.limit
            );
        } else {
            debug!(
                limiter = %self.name(),
                "Rate limit check passed for key {}: count={}, remaining={}",
                key,
                count,
                result.remaining()
            );
        }
        record_evaluation(self.name(), result.exceeded);

        Ok(result)
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("definition", &self.definition)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}
