//! Counter stores
//!
//! A counter store holds one integer counter per window key and supports an
//! atomic increment. The entry's time-to-live is set only when the increment
//! creates it (count == 1), which yields fixed windows:
//!
//! - **Redis** (`RedisStore`): shared across processes through a pooled
//!   connection set
//! - **Memory** (`MemoryStore`): in-process, for single-instance deployments
//!   and tests
//!
//! The increment and the expiry are two separate operations. A crash between
//! them can leave a counter without a TTL; the count itself stays correct.

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use crate::error::Result;
use async_trait::async_trait;

/// Backing store for window counters
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment the counter at `key`, creating it at 1 if absent, and set
    /// its expiry to `ttl_secs` when this call created it.
    ///
    /// Returns the post-increment count.
    async fn incr_and_expire(&self, key: &str, ttl_secs: u64) -> Result<i64>;

    /// Release every resource held by the store
    fn close(&self);

    fn is_closed(&self) -> bool;
}
