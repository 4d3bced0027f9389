//! # dbprobe
//!
//! Database health checks for PostgreSQL, MySQL, SQLite and SQL Server.
//!
//! A [`Driver`] is built from a scheme-qualified DSN by [`new_driver`]. Each
//! driver connects, pings, writes a health record and reads it back, and after
//! every step reports a tri-state [`Status`] plus a metric map.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use dbprobe::{Config, Status, new_driver};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), dbprobe::DriverError> {
//! let config = Config::builder("file:/var/lib/app/health.db")
//!     .with_timeout(Duration::from_secs(5))
//!     .build()?;
//! let mut driver = new_driver(config)?;
//! let ctx = CancellationToken::new();
//!
//! driver.connect(&ctx).await?;
//! driver.ping(&ctx).await?;
//! driver.check_read_write(&ctx).await?;
//! assert_eq!(driver.status(), Status::Up);
//! driver.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `postgres`, `mysql`, `sqlite`, `mssql` - backend drivers (all default)
//! - `observability` - Prometheus exporter and tracing setup (default)

pub use dbprobe_core as core;
pub use dbprobe_drivers as drivers;

#[cfg(feature = "observability")]
pub use dbprobe_observability as observability;

pub use dbprobe_core::{
    BackendKind, Config, ConfigBuilder, ConfigError, Driver, DriverError, HealthRecord, MetricMap,
    OperationError, Status, redact_dsn,
};
pub use dbprobe_core::metrics::names as metric_names;
pub use dbprobe_drivers::new_driver;

#[cfg(feature = "observability")]
pub use dbprobe_observability::ProbeExporter;
