//! The health-check contract implemented by every backend

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::backend::BackendKind;
use crate::error::DriverError;
use crate::metrics::MetricMap;
use crate::status::Status;

/// A database health-check driver.
///
/// Probe methods take `&mut self`: one driver serves one caller at a time.
/// Every operation is bounded by its configured timeout and abandoned as soon
/// as `ctx` is cancelled.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Backend this driver talks to
    fn backend(&self) -> BackendKind;

    /// Open the pool, ping it, and provision the health table if configured.
    async fn connect(&mut self, ctx: &CancellationToken) -> Result<(), DriverError>;

    /// Round-trip a liveness check.
    async fn ping(&mut self, ctx: &CancellationToken) -> Result<(), DriverError>;

    /// Write a fresh health record and read it back on the same connection.
    async fn check_read_write(&mut self, ctx: &CancellationToken) -> Result<(), DriverError>;

    /// Release the pool. A no-op when never connected.
    async fn close(&mut self) -> Result<(), DriverError>;

    /// Status after the most recent operation
    fn status(&self) -> Status;

    /// Snapshot of the accumulated metrics
    fn metrics(&self) -> MetricMap;
}
