//! Application configuration management.

use std::time::Duration;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Runtime environment settings.
    #[serde(default)]
    pub app: RuntimeConfig,
    /// Billing HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Request queue consumer configuration.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Gateway configuration.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Deployment environment. Selects the log format and default level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Developer machine: human-readable logs at debug level.
    Local,
    /// Shared development: JSON logs at debug level.
    Dev,
    /// Production: JSON logs at info level.
    #[default]
    Prod,
}

impl Environment {
    /// Default `tracing` filter directive for this environment.
    #[must_use]
    pub const fn default_log_filter(self) -> &'static str {
        match self {
            Self::Local | Self::Dev => "purse=debug,tower_http=debug",
            Self::Prod => "purse=info,tower_http=info",
        }
    }

    /// Whether logs should be emitted as JSON lines.
    #[must_use]
    pub const fn json_logs(self) -> bool {
        !matches!(self, Self::Local)
    }
}

/// Runtime environment settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeConfig {
    /// Deployment environment.
    #[serde(default)]
    pub env: Environment,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// Socket address string (`host:port`).
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Timeout for establishing a new connection.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Timeout for acquiring a pooled connection.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_acquire_timeout() -> u64 {
    5
}

/// Request queue consumer configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Sleep between polls when a topic is empty.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// How long a fetched message stays invisible to other consumers.
    #[serde(default = "default_lease")]
    pub lease_secs: u64,
    /// Deliveries before a message is dead-lettered.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay before a failed message is redelivered.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
    /// Upper bound for one escrow unit of work.
    #[serde(default = "default_unit_timeout")]
    pub unit_timeout_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            lease_secs: default_lease(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff(),
            unit_timeout_secs: default_unit_timeout(),
        }
    }
}

impl QueueConfig {
    /// Poll interval as a `Duration`.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Lease as a `Duration`.
    #[must_use]
    pub const fn lease(&self) -> Duration {
        Duration::from_secs(self.lease_secs)
    }

    /// Retry backoff as a `Duration`.
    #[must_use]
    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Unit timeout as a `Duration`.
    #[must_use]
    pub const fn unit_timeout(&self) -> Duration {
        Duration::from_secs(self.unit_timeout_secs)
    }
}

fn default_poll_interval() -> u64 {
    250
}

fn default_lease() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_backoff() -> u64 {
    500
}

fn default_unit_timeout() -> u64 {
    10
}

/// Gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Base URL of the billing server read API.
    #[serde(default = "default_billing_url")]
    pub billing_url: String,
    /// Timeout for proxied requests.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_gateway_port(),
            billing_url: default_billing_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl GatewayConfig {
    /// Socket address string (`host:port`).
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_billing_url() -> String {
    "http://billing:8082".to_string()
}

fn default_request_timeout() -> u64 {
    5
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("PURSE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
