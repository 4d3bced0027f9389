//! # dbprobe-core
//!
//! Shared vocabulary for the dbprobe database health checker: the
//! [`Driver`] contract, its [`Config`], the tri-state [`Status`], the metric
//! map convention and the error taxonomy. Backend implementations live in
//! `dbprobe-drivers`.

pub mod backend;
pub mod config;
pub mod driver;
pub mod error;
pub mod metrics;
pub mod record;
pub mod sanitization;
pub mod status;

pub use backend::BackendKind;
pub use config::{Config, ConfigBuilder, ConfigError};
pub use driver::Driver;
pub use error::{BoxError, DriverError, OperationError};
pub use metrics::{MetricMap, Phase, ProbeMetrics};
pub use record::{HEALTH_TABLE, HEALTHY_VALUE, HealthRecord};
pub use sanitization::redact_dsn;
pub use status::Status;
