//! # Driver Configuration
//!
//! [`Config`] carries the DSN, the per-phase timeouts, the pool knobs, and the
//! retry budget consumed by the orchestrator. It is built through
//! [`ConfigBuilder`], either fluently or from the environment.
//!
//! ## Environment Variables
//!
//! - `DBPROBE_DSN` - Scheme-qualified connection string (required)
//! - `DBPROBE_CONNECT_TIMEOUT` - Open + initial ping bound (default: 10s)
//! - `DBPROBE_PING_TIMEOUT` - Ping bound (default: 10s)
//! - `DBPROBE_READ_TIMEOUT` - Read-back bound (default: 10s)
//! - `DBPROBE_WRITE_TIMEOUT` - Write bound (default: 10s)
//! - `DBPROBE_TABLE_CREATION_TIMEOUT` - DDL bound (default: 10s)
//! - `DBPROBE_MAX_RETRIES` - Orchestrator retry budget (default: 3)
//! - `DBPROBE_RETRY_INTERVAL` - Base retry backoff (default: 1s)
//! - `DBPROBE_CREATE_HEALTH_TABLE` - Run DDL during connect (default: true)
//! - `DBPROBE_MAX_OPEN_CONNS` - Pool size, 0 = unlimited (default: 5)
//! - `DBPROBE_MAX_IDLE_CONNS` - Idle connections kept (default: 2)
//! - `DBPROBE_CONN_MAX_LIFETIME` - Connection lifetime, `0`/`none` = unlimited (default: 5m)
//! - `DBPROBE_CONN_MAX_IDLE_TIME` - Idle lifetime, `0`/`none` = unlimited (default: 2m)
//!
//! Durations use `humantime` syntax (`500ms`, `10s`, `2m 30s`).

use std::{env, time::Duration};

use crate::error::DriverError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_OPEN_CONNS: u32 = 5;
pub const DEFAULT_MAX_IDLE_CONNS: u32 = 2;
pub const DEFAULT_CONN_MAX_LIFETIME: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_CONN_MAX_IDLE_TIME: Duration = Duration::from_secs(2 * 60);

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for DriverError {
    fn from(err: ConfigError) -> Self {
        DriverError::InvalidConfig(err.to_string())
    }
}

/// Per-driver configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub dsn: String,
    pub connect_timeout: Duration,
    pub ping_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub table_creation_timeout: Duration,
    /// Consumed by the orchestrator; drivers never retry
    pub max_retries: u32,
    pub retry_interval: Duration,
    pub create_health_table: bool,
    /// 0 = unlimited
    pub max_open_conns: u32,
    /// 0 = keep no idle connections
    pub max_idle_conns: u32,
    /// `None` = unlimited
    pub conn_max_lifetime: Option<Duration>,
    /// `None` = unlimited
    pub conn_max_idle_time: Option<Duration>,
}

impl Config {
    /// Start a builder for `dsn`
    pub fn builder(dsn: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new().dsn(dsn)
    }
}

/// Builder for [`Config`] with environment variable support
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            config: Config {
                dsn: String::new(),
                connect_timeout: DEFAULT_TIMEOUT,
                ping_timeout: DEFAULT_TIMEOUT,
                read_timeout: DEFAULT_TIMEOUT,
                write_timeout: DEFAULT_TIMEOUT,
                table_creation_timeout: DEFAULT_TIMEOUT,
                max_retries: DEFAULT_MAX_RETRIES,
                retry_interval: DEFAULT_RETRY_INTERVAL,
                create_health_table: true,
                max_open_conns: DEFAULT_MAX_OPEN_CONNS,
                max_idle_conns: DEFAULT_MAX_IDLE_CONNS,
                conn_max_lifetime: Some(DEFAULT_CONN_MAX_LIFETIME),
                conn_max_idle_time: Some(DEFAULT_CONN_MAX_IDLE_TIME),
            },
        }
    }
}

impl ConfigBuilder {
    /// Create a new builder with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from `DBPROBE_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if any variable has an invalid value.
    /// Validation happens in [`ConfigBuilder::build`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::default();

        if let Some(dsn) = get_env_string("DBPROBE_DSN") {
            builder = builder.dsn(dsn);
        }

        // Timeouts
        if let Some(timeout) = get_env_duration("DBPROBE_CONNECT_TIMEOUT")? {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = get_env_duration("DBPROBE_PING_TIMEOUT")? {
            builder = builder.ping_timeout(timeout);
        }
        if let Some(timeout) = get_env_duration("DBPROBE_READ_TIMEOUT")? {
            builder = builder.read_timeout(timeout);
        }
        if let Some(timeout) = get_env_duration("DBPROBE_WRITE_TIMEOUT")? {
            builder = builder.write_timeout(timeout);
        }
        if let Some(timeout) = get_env_duration("DBPROBE_TABLE_CREATION_TIMEOUT")? {
            builder = builder.table_creation_timeout(timeout);
        }

        // Retries
        if let Some(retries) = get_env_u32("DBPROBE_MAX_RETRIES")? {
            builder = builder.max_retries(retries);
        }
        if let Some(interval) = get_env_duration("DBPROBE_RETRY_INTERVAL")? {
            builder = builder.retry_interval(interval);
        }

        if let Some(create) = get_env_bool("DBPROBE_CREATE_HEALTH_TABLE")? {
            builder = builder.create_health_table(create);
        }

        // Pool
        if let Some(max_open) = get_env_u32("DBPROBE_MAX_OPEN_CONNS")? {
            builder = builder.max_open_conns(max_open);
        }
        if let Some(max_idle) = get_env_u32("DBPROBE_MAX_IDLE_CONNS")? {
            builder = builder.max_idle_conns(max_idle);
        }
        if let Some(lifetime) = get_env_optional_duration("DBPROBE_CONN_MAX_LIFETIME")? {
            builder = builder.conn_max_lifetime(lifetime);
        }
        if let Some(idle_time) = get_env_optional_duration("DBPROBE_CONN_MAX_IDLE_TIME")? {
            builder = builder.conn_max_idle_time(idle_time);
        }

        Ok(builder)
    }

    pub fn dsn(mut self, dsn: impl Into<String>) -> Self {
        self.config.dsn = dsn.into();
        self
    }

    /// Apply one timeout to all five probe phases
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.connect_timeout(timeout)
            .ping_timeout(timeout)
            .read_timeout(timeout)
            .write_timeout(timeout)
            .table_creation_timeout(timeout)
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn ping_timeout(mut self, timeout: Duration) -> Self {
        self.config.ping_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    pub fn table_creation_timeout(mut self, timeout: Duration) -> Self {
        self.config.table_creation_timeout = timeout;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.config.retry_interval = interval;
        self
    }

    pub fn create_health_table(mut self, create: bool) -> Self {
        self.config.create_health_table = create;
        self
    }

    pub fn max_open_conns(mut self, max_open: u32) -> Self {
        self.config.max_open_conns = max_open;
        self
    }

    pub fn max_idle_conns(mut self, max_idle: u32) -> Self {
        self.config.max_idle_conns = max_idle;
        self
    }

    pub fn conn_max_lifetime(mut self, lifetime: Option<Duration>) -> Self {
        self.config.conn_max_lifetime = lifetime;
        self
    }

    pub fn conn_max_idle_time(mut self, idle_time: Option<Duration>) -> Self {
        self.config.conn_max_idle_time = idle_time;
        self
    }

    /// Validate and produce the final configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` for an empty DSN or a zero timeout.
    pub fn build(self) -> Result<Config, ConfigError> {
        let config = self.config;

        if config.dsn.trim().is_empty() {
            return Err(ConfigError::ValidationError("dsn must not be empty".into()));
        }

        let timeouts = [
            ("connect_timeout", config.connect_timeout),
            ("ping_timeout", config.ping_timeout),
            ("read_timeout", config.read_timeout),
            ("write_timeout", config.write_timeout),
            ("table_creation_timeout", config.table_creation_timeout),
        ];
        for (name, value) in timeouts {
            if value.is_zero() {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be greater than zero"
                )));
            }
        }

        tracing::debug!(
            dsn = %crate::sanitization::redact_dsn(&config.dsn),
            max_retries = config.max_retries,
            max_open_conns = config.max_open_conns,
            "configuration validated"
        );
        Ok(config)
    }
}

fn get_env_string(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn get_env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match env::var(key) {
        Ok(val) => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!(
                    "invalid boolean value '{val}', expected true/false/1/0/yes/no/on/off"
                ),
            }),
        },
        Err(_) => Ok(None),
    }
}

fn get_env_u32(key: &str) -> Result<Option<u32>, ConfigError> {
    match env::var(key) {
        Ok(val) => val
            .parse::<u32>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid u32 value '{val}': {e}"),
            }),
        Err(_) => Ok(None),
    }
}

fn get_env_duration(key: &str) -> Result<Option<Duration>, ConfigError> {
    match env::var(key) {
        Ok(val) => humantime::parse_duration(val.trim())
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid duration '{val}': {e}"),
            }),
        Err(_) => Ok(None),
    }
}

/// Outer `None` = unset, inner `None` = unlimited
fn get_env_optional_duration(key: &str) -> Result<Option<Option<Duration>>, ConfigError> {
    match env::var(key) {
        Ok(val) => match val.trim().to_lowercase().as_str() {
            "0" | "none" | "unlimited" => Ok(Some(None)),
            trimmed => humantime::parse_duration(trimmed)
                .map(|d| Some(Some(d).filter(|d| !d.is_zero())))
                .map_err(|e| ConfigError::InvalidEnvVar {
                    key: key.to_string(),
                    message: format!("invalid duration '{val}': {e}"),
                }),
        },
        Err(_) => Ok(None),
    }
}
