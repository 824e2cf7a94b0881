use crate::error::{ReqLimitError, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::path::Path;
use tracing::debug;

pub const DEFAULT_STORE_HOST: &str = "localhost:6379";
pub const DEFAULT_POOL_SIZE: usize = 5;

/// Main service configuration
#[derive(Debug, Deserialize)]
pub struct ReqLimitConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Counter store configuration
    #[serde(default)]
    pub store: StoreConfig,
    /// Limiter definitions
    #[serde(default)]
    pub limiters: Vec<LimiterConfig>,
    /// Expose Prometheus metrics on `/metrics`
    #[serde(default = "default_true")]
    pub metrics: bool,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Which counter store backs the registry
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    Memory,
}

/// Counter store and namespace configuration for a limiter registry
#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Key prefix shared by every limiter; empty means unscoped
    #[serde(default)]
    pub namespace: String,
    /// Store address as `host:port`
    #[serde(default = "default_store_host")]
    pub host: String,
    #[serde(default)]
    pub password: Option<SecretString>,
    /// Connection pool size; values <= 0 fall back to the default
    #[serde(default = "default_pool_size")]
    pub pool_size: i64,
}

/// A single named limiter
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LimiterConfig {
    pub name: String,
    /// Window length in seconds
    pub interval_secs: u64,
    /// Maximum requests per window
    pub limit: u32,
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_store_host() -> String {
    DEFAULT_STORE_HOST.to_string()
}

fn default_pool_size() -> i64 {
    DEFAULT_POOL_SIZE as i64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            namespace: String::new(),
            host: default_store_host(),
            password: None,
            pool_size: default_pool_size(),
        }
    }
}

impl StoreConfig {
    /// Pool size actually used when connecting
    pub fn effective_pool_size(&self) -> usize {
        if self.pool_size > 0 {
            self.pool_size as usize
        } else {
            DEFAULT_POOL_SIZE
        }
    }
}

impl LimiterConfig {
    pub fn new(name: impl Into<String>, interval_secs: u64, limit: u32) -> Self {
        Self {
            name: name.into(),
            interval_secs,
            limit,
        }
    }
}

impl ReqLimitConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReqLimitError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| ReqLimitError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Override store settings from `REQLIMIT_*` environment variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(namespace) = env::var("REQLIMIT_NAMESPACE") {
            debug!("Namespace overridden from environment");
            self.store.namespace = namespace;
        }
        if let Ok(host) = env::var("REQLIMIT_STORE_HOST") {
            debug!("Store host overridden from environment");
            self.store.host = host;
        }
        if let Ok(password) = env::var("REQLIMIT_STORE_PASSWORD") {
            self.store.password = Some(SecretString::new(password));
        }
        if let Ok(pool_size) = env::var("REQLIMIT_POOL_SIZE") {
            self.store.pool_size = pool_size.parse().map_err(|e| {
                ReqLimitError::Config(format!("Invalid REQLIMIT_POOL_SIZE '{}': {}", pool_size, e))
            })?;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.store.backend == StoreBackend::Redis && self.store.host.is_empty() {
            return Err(ReqLimitError::Config("Store host cannot be empty".to_string()));
        }

        let mut names = HashSet::new();
        for limiter in &self.limiters {
            if limiter.name.is_empty() {
                return Err(ReqLimitError::Config("Limiter name cannot be empty".to_string()));
            }
            if limiter.interval_secs == 0 {
                return Err(ReqLimitError::Config(format!(
                    "Limiter interval must be > 0 for limiter: {}",
                    limiter.name
                )));
            }
            if limiter.limit == 0 {
                return Err(ReqLimitError::Config(format!(
                    "Limiter limit must be > 0 for limiter: {}",
                    limiter.name
                )));
            }
            if !names.insert(limiter.name.as_str()) {
                return Err(ReqLimitError::DuplicateLimiter(limiter.name.clone()));
            }
        }

        Ok(())
    }

    /// Create a default configuration for testing
    pub fn default_config() -> Self {
        Self {
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            limiters: vec![],
            metrics: true,
        }
    }
}
