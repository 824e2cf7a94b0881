use std::fmt;
use std::time::Duration;

/// Immutable definition of a named limiter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterDefinition {
    /// Unique name within a registry
    pub name: String,
    /// Window length in seconds
    pub interval_secs: u64,
    /// Maximum number of requests per window
    pub limit: u32,
}

impl LimiterDefinition {
    /// Get the interval as a Duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Store key identifying one requester's window for one limiter.
///
/// Rendered as `[<namespace>:]limiter:<name>:<identity>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowKey(String);

impl WindowKey {
    pub fn new(namespace: &str, limiter: &str, identity: &str) -> Self {
        if namespace.is_empty() {
            Self(format!("limiter:{}:{}", limiter, identity))
        } else {
            Self(format!("{}:limiter:{}:{}", namespace, limiter, identity))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for WindowKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Outcome of a single evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    /// Whether the identity is over its quota for this window
    pub exceeded: bool,
    /// Post-increment count for the window
    pub count: i64,
    /// Configured limit
    pub limit: u32,
    /// Window length in seconds
    pub interval_secs: u64,
}

impl RateLimitResult {
    pub fn new(count: i64, limit: u32, interval_secs: u64) -> Self {
        Self {
            exceeded: count > i64::from(limit),
            count,
            limit,
            interval_secs,
        }
    }

    /// Requests left in the current window
    pub fn remaining(&self) -> u64 {
        (i64::from(self.limit) - self.count).max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_key_with_namespace() {
        let key = WindowKey::new("Appname", "rps", "1.2.3.4");
        assert_eq!(key.as_str(), "Appname:limiter:rps:1.2.3.4");
    }

    #[test]
    fn test_window_key_without_namespace() {
        let key = WindowKey::new("", "rps", "1.2.3.4");
        assert_eq!(key.as_str(), "limiter:rps:1.2.3.4");
        assert_eq!(key.to_string(), "limiter:rps:1.2.3.4");
    }

    #[test]
    fn test_window_key_is_deterministic() {
        assert_eq!(
            WindowKey::new("ns", "rps", "10.0.0.1"),
            WindowKey::new("ns", "rps", "10.0.0.1")
        );
        assert_ne!(
            WindowKey::new("ns", "rps", "10.0.0.1"),
            WindowKey::new("ns", "rpm", "10.0.0.1")
        );
        assert_ne!(
            WindowKey::new("a", "rps", "10.0.0.1"),
            WindowKey::new("b", "rps", "10.0.0.1")
        );
    }

    #[test]
    fn test_rate_limit_result() {
        let at_limit = RateLimitResult::new(20, 20, 60);
        assert!(!at_limit.exceeded);
        assert_eq!(at_limit.remaining(), 0);

        let under = RateLimitResult::new(5, 20, 60);
        assert!(!under.exceeded);
        assert_eq!(under.remaining(), 15);

        let over = RateLimitResult::new(21, 20, 60);
        assert!(over.exceeded);
        assert_eq!(over.remaining(), 0);
    }

    #[test]
    fn test_definition_interval() {
        let definition = LimiterDefinition {
            name: "rps".to_string(),
            interval_secs: 60,
            limit: 20,
        };
        assert_eq!(definition.interval(), Duration::from_secs(60));
    }
}
