//! The Connect / Ping / CheckReadWrite protocol shared by every backend
//!
//! [`ProbeDriver`] owns the pool, the status and the metric map; a [`Backend`]
//! only supplies its native connection manager and its literal statements.

use std::time::Duration;

use async_trait::async_trait;
use dbprobe_core::{
    BackendKind, BoxError, Config, Driver, DriverError, HealthRecord, MetricMap, Phase,
    ProbeMetrics, Status, metrics::PARTIAL_SUCCESS,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::pool::{ConnectionManager, ConnectionPool, PoolOptions, PoolState};
use crate::timeout::bounded;

/// Native connection type of a backend
pub type Conn<B> = <<B as Backend>::Manager as ConnectionManager>::Connection;

/// Dialect hooks plugged into [`ProbeDriver`]
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    type Manager: ConnectionManager;

    fn kind(&self) -> BackendKind;

    /// Parse the DSN into a connection manager without touching the network.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::InvalidDsn` when the DSN cannot be parsed.
    fn manager(&self, config: &Config) -> Result<Self::Manager, DriverError>;

    fn pool_options(&self, config: &Config) -> PoolOptions {
        PoolOptions::from_config(config)
    }

    /// Cheapest round trip the server answers
    async fn ping(&self, conn: &mut Conn<Self>) -> Result<(), BoxError>;

    /// Session settings applied on the connect connection, bounded by `limit`
    async fn configure(
        &self,
        _conn: &mut Conn<Self>,
        _ctx: &CancellationToken,
        _limit: Duration,
        _metrics: &mut ProbeMetrics,
    ) -> Result<(), DriverError> {
        Ok(())
    }

    /// Idempotent DDL for the health table
    async fn create_health_table(&self, conn: &mut Conn<Self>) -> Result<(), BoxError>;

    async fn write_record(
        &self,
        conn: &mut Conn<Self>,
        record: &HealthRecord,
    ) -> Result<(), BoxError>;

    /// Most recent record, or `None` when the table is empty
    async fn read_latest(&self, conn: &mut Conn<Self>) -> Result<Option<HealthRecord>, BoxError>;
}

/// A [`Driver`] implemented on top of a [`Backend`]
pub struct ProbeDriver<B: Backend> {
    backend: B,
    config: Config,
    pool: Option<ConnectionPool<B::Manager>>,
    status: Status,
    metrics: ProbeMetrics,
}

impl<B: Backend> ProbeDriver<B> {
    /// Build a driver; no connection is opened until `connect`
    pub fn with_backend(backend: B, config: Config) -> Self {
        Self {
            backend,
            config,
            pool: None,
            status: Status::Down,
            metrics: ProbeMetrics::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Pool settings this driver opens its pool with
    pub fn pool_options(&self) -> PoolOptions {
        self.backend.pool_options(&self.config)
    }

    /// Occupancy of the live pool, if connected
    pub fn pool_state(&self) -> Option<PoolState> {
        self.pool.as_ref().map(ConnectionPool::state)
    }

    pub fn is_connected(&self) -> bool {
        self.pool.is_some()
    }

    fn succeed(&mut self, phase: Phase, elapsed: Option<Duration>) {
        self.metrics.record_success(phase, 1.0);
        if let Some(elapsed) = elapsed {
            self.metrics.record_latency(phase, elapsed);
        }
        tracing::debug!(
            backend = %self.backend.kind(),
            phase = %phase,
            latency_seconds = elapsed.map(|e| e.as_secs_f64()),
            "probe phase succeeded"
        );
    }

    fn fail(
        &mut self,
        phase: Phase,
        value: f64,
        elapsed: Option<Duration>,
        err: DriverError,
    ) -> DriverError {
        self.metrics.record_success(phase, value);
        if let Some(elapsed) = elapsed {
            self.metrics.record_latency(phase, elapsed);
        }
        self.status = err.status();
        tracing::warn!(
            backend = %self.backend.kind(),
            phase = %phase,
            latency_seconds = elapsed.map(|e| e.as_secs_f64()),
            error = %err,
            status = %self.status,
            "probe phase failed"
        );
        err
    }

    async fn close_pool(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
        }
    }
}

#[async_trait]
impl<B: Backend> Driver for ProbeDriver<B> {
    fn backend(&self) -> BackendKind {
        self.backend.kind()
    }

    async fn connect(&mut self, ctx: &CancellationToken) -> Result<(), DriverError> {
        let kind = self.backend.kind();
        let start = Instant::now();
        self.close_pool().await;

        let manager = match self.backend.manager(&self.config) {
            Ok(manager) => manager,
            Err(err) => {
                return Err(self.fail(Phase::Connection, 0.0, Some(start.elapsed()), err));
            }
        };

        let pool = ConnectionPool::new(manager, self.backend.pool_options(&self.config));
        let backend = &self.backend;
        let opened = bounded(ctx, self.config.connect_timeout, async {
            let mut conn = pool.get().await?;
            conn.poison();
            backend.ping(&mut conn).await?;
            conn.clear_poison();
            Ok::<_, BoxError>(conn)
        })
        .await;

        let mut conn = match opened {
            Ok(conn) => conn,
            Err(source) => {
                pool.close().await;
                let err = DriverError::Connect {
                    backend: kind,
                    source,
                };
                return Err(self.fail(Phase::Connection, 0.0, Some(start.elapsed()), err));
            }
        };

        let remaining = self
            .config
            .connect_timeout
            .saturating_sub(start.elapsed());
        conn.poison();
        let configured = self
            .backend
            .configure(&mut conn, ctx, remaining, &mut self.metrics)
            .await;
        let connect_latency = start.elapsed();
        if configured.is_ok() {
            conn.clear_poison();
        }
        if let Err(err) = configured {
            drop(conn);
            self.pool = Some(pool);
            return Err(self.fail(
                Phase::Connection,
                PARTIAL_SUCCESS,
                Some(connect_latency),
                err,
            ));
        }

        if self.config.create_health_table {
            let backend = &self.backend;
            conn.poison();
            let created = bounded(
                ctx,
                self.config.table_creation_timeout,
                backend.create_health_table(&mut conn),
            )
            .await;
            if created.is_ok() {
                conn.clear_poison();
            }
            drop(conn);
            self.pool = Some(pool);

            if let Err(source) = created {
                self.metrics.record_latency(Phase::Connection, connect_latency);
                self.metrics
                    .record_success(Phase::Connection, PARTIAL_SUCCESS);
                let err = DriverError::TableCreation {
                    backend: kind,
                    source,
                };
                return Err(self.fail(Phase::TableCreation, 0.0, None, err));
            }
            self.succeed(Phase::TableCreation, None);
        } else {
            drop(conn);
            self.pool = Some(pool);
        }

        self.succeed(Phase::Connection, Some(connect_latency));
        self.status = Status::Up;
        tracing::info!(backend = %kind, "connected");
        Ok(())
    }

    async fn ping(&mut self, ctx: &CancellationToken) -> Result<(), DriverError> {
        let kind = self.backend.kind();
        let Some(pool) = &self.pool else {
            return Err(self.fail(Phase::Ping, 0.0, None, DriverError::NotConnected));
        };

        let start = Instant::now();
        let backend = &self.backend;
        let result = bounded(ctx, self.config.ping_timeout, async {
            let mut conn = pool.get().await?;
            conn.poison();
            backend.ping(&mut conn).await?;
            conn.clear_poison();
            Ok::<_, BoxError>(())
        })
        .await;
        let elapsed = start.elapsed();

        match result {
            Ok(()) => {
                self.succeed(Phase::Ping, Some(elapsed));
                if self.status.is_down() {
                    self.status = Status::Up;
                }
                Ok(())
            }
            Err(source) => {
                let err = DriverError::Ping {
                    backend: kind,
                    source,
                };
                Err(self.fail(Phase::Ping, 0.0, Some(elapsed), err))
            }
        }
    }

    async fn check_read_write(&mut self, ctx: &CancellationToken) -> Result<(), DriverError> {
        let kind = self.backend.kind();
        let Some(pool) = &self.pool else {
            self.metrics.record_success(Phase::Write, 0.0);
            return Err(self.fail(Phase::Read, 0.0, None, DriverError::NotConnected));
        };

        let expected = HealthRecord::healthy_now();
        let start = Instant::now();
        let backend = &self.backend;
        let written = bounded(ctx, self.config.write_timeout, async {
            let mut conn = pool.get().await?;
            conn.poison();
            backend.write_record(&mut conn, &expected).await?;
            conn.clear_poison();
            Ok::<_, BoxError>(conn)
        })
        .await;
        let elapsed = start.elapsed();

        let mut conn = match written {
            Ok(conn) => conn,
            Err(source) => {
                let err = DriverError::Write {
                    backend: kind,
                    source,
                };
                return Err(self.fail(Phase::Write, 0.0, Some(elapsed), err));
            }
        };
        self.succeed(Phase::Write, Some(elapsed));

        let start = Instant::now();
        conn.poison();
        let read = bounded(
            ctx,
            self.config.read_timeout,
            self.backend.read_latest(&mut conn),
        )
        .await;
        let elapsed = start.elapsed();
        if read.is_ok() {
            conn.clear_poison();
        }
        drop(conn);

        match read {
            Ok(Some(actual)) if actual == expected => {
                self.succeed(Phase::Read, Some(elapsed));
                self.status = Status::Up;
                Ok(())
            }
            Ok(Some(actual)) => {
                let err = DriverError::Inconsistent { expected, actual };
                Err(self.fail(Phase::Read, PARTIAL_SUCCESS, Some(elapsed), err))
            }
            Ok(None) => {
                let err = DriverError::MissingRecord { backend: kind };
                Err(self.fail(Phase::Read, 0.0, Some(elapsed), err))
            }
            Err(source) => {
                let err = DriverError::Read {
                    backend: kind,
                    source,
                };
                Err(self.fail(Phase::Read, 0.0, Some(elapsed), err))
            }
        }
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if self.pool.is_some() {
            self.close_pool().await;
            tracing::debug!(backend = %self.backend.kind(), "connection pool closed");
        }
        Ok(())
    }

    fn status(&self) -> Status {
        self.status
    }

    fn metrics(&self) -> MetricMap {
        self.metrics.snapshot(self.status, self.backend.kind())
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use dbprobe_core::metrics::names;

    use super::scripted::{Script, ScriptedBackend};
    use super::*;

    fn driver_with(dsn: &str) -> (ProbeDriver<ScriptedBackend>, Arc<Script>) {
        let backend = ScriptedBackend::default();
        let script = Arc::clone(&backend.script);
        let config = Config::builder(dsn)
            .with_timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        (ProbeDriver::with_backend(backend, config), script)
    }

    fn driver() -> (ProbeDriver<ScriptedBackend>, Arc<Script>) {
        driver_with("postgres://probe@localhost/health")
    }

    #[tokio::test]
    async fn test_fresh_driver_is_down() {
        let (driver, _) = driver();
        assert_eq!(driver.status(), Status::Down);
        assert!(!driver.is_connected());

        let metrics = driver.metrics();
        assert_eq!(metrics[names::SERVICE_HEALTH], 0.0);
        assert_eq!(metrics[names::DRIVER_TYPE], 1.0);
    }

    #[tokio::test]
    async fn test_full_cycle_is_up() {
        let (mut driver, _) = driver();
        let ctx = CancellationToken::new();

        driver.connect(&ctx).await.unwrap();
        driver.ping(&ctx).await.unwrap();
        driver.check_read_write(&ctx).await.unwrap();

        assert_eq!(driver.status(), Status::Up);
        let metrics = driver.metrics();
        assert_eq!(metrics[names::CONNECTION_SUCCESS], 1.0);
        assert_eq!(metrics[names::TABLE_CREATION_SUCCESS], 1.0);
        assert_eq!(metrics[names::PING_SUCCESS], 1.0);
        assert_eq!(metrics[names::WRITE_SUCCESS], 1.0);
        assert_eq!(metrics[names::READ_SUCCESS], 1.0);
        assert_eq!(metrics[names::SERVICE_HEALTH], 1.0);
        for key in [
            names::CONNECTION_LATENCY,
            names::PING_LATENCY,
            names::WRITE_LATENCY,
            names::READ_LATENCY,
        ] {
            assert!(metrics[key] >= 0.0, "{key} missing");
        }
    }

    #[tokio::test]
    async fn test_connect_failure_is_down() {
        let (mut driver, script) = driver();
        Script::set(&script.refuse_connect, true);

        let err = driver.connect(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, DriverError::Connect { .. }));
        assert_eq!(driver.status(), Status::Down);
        assert!(!driver.is_connected());

        let metrics = driver.metrics();
        assert_eq!(metrics[names::CONNECTION_SUCCESS], 0.0);
        assert!(metrics.contains_key(names::CONNECTION_LATENCY));
        assert!(!metrics.contains_key(names::TABLE_CREATION_SUCCESS));
    }

    #[tokio::test]
    async fn test_connect_ping_failure_is_down() {
        let (mut driver, script) = driver();
        Script::set(&script.fail_ping, true);

        let err = driver.connect(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, DriverError::Connect { .. }));
        assert_eq!(driver.status(), Status::Down);
        assert_eq!(driver.metrics()[names::CONNECTION_SUCCESS], 0.0);
    }

    #[tokio::test]
    async fn test_invalid_dsn_is_down() {
        let (mut driver, script) = driver_with("postgres://%%");

        let err = driver.connect(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, DriverError::InvalidDsn { .. }));
        assert_eq!(driver.status(), Status::Down);
        assert_eq!(driver.metrics()[names::CONNECTION_SUCCESS], 0.0);
        assert_eq!(script.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_table_creation_failure_keeps_pool() {
        let (mut driver, script) = driver();
        Script::set(&script.fail_ddl, true);
        let ctx = CancellationToken::new();

        let err = driver.connect(&ctx).await.unwrap_err();
        assert!(matches!(err, DriverError::TableCreation { .. }));
        assert_eq!(driver.status(), Status::Degraded);
        assert!(driver.is_connected());

        let metrics = driver.metrics();
        assert_eq!(metrics[names::CONNECTION_SUCCESS], 0.5);
        assert_eq!(metrics[names::TABLE_CREATION_SUCCESS], 0.0);
        assert_eq!(metrics[names::SERVICE_HEALTH], 0.5);

        // a successful ping leaves Degraded alone
        driver.ping(&ctx).await.unwrap();
        assert_eq!(driver.status(), Status::Degraded);
        assert_eq!(driver.metrics()[names::PING_SUCCESS], 1.0);
    }

    #[tokio::test]
    async fn test_configure_failure_is_degraded() {
        let (mut driver, script) = driver();
        Script::set(&script.fail_configure, true);

        let err = driver.connect(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, DriverError::Configure { .. }));
        assert_eq!(driver.status(), Status::Degraded);
        assert!(driver.is_connected());
        assert_eq!(driver.metrics()[names::CONNECTION_SUCCESS], 0.5);
        assert_eq!(script.ddl_runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_table_creation_can_be_disabled() {
        let backend = ScriptedBackend::default();
        let script = Arc::clone(&backend.script);
        let config = Config::builder("postgres://h/db")
            .create_health_table(false)
            .build()
            .unwrap();
        let mut driver = ProbeDriver::with_backend(backend, config);

        driver.connect(&CancellationToken::new()).await.unwrap();
        assert_eq!(script.ddl_runs.load(Ordering::SeqCst), 0);
        assert!(!driver.metrics().contains_key(names::TABLE_CREATION_SUCCESS));
    }

    #[tokio::test]
    async fn test_ping_without_connection() {
        let (mut driver, _) = driver();

        let err = driver.ping(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, DriverError::NotConnected));
        assert_eq!(driver.status(), Status::Down);
        assert_eq!(driver.metrics()[names::PING_SUCCESS], 0.0);
    }

    #[tokio::test]
    async fn test_ping_failure_then_recovery() {
        let (mut driver, script) = driver();
        let ctx = CancellationToken::new();
        driver.connect(&ctx).await.unwrap();

        Script::set(&script.fail_ping, true);
        let err = driver.ping(&ctx).await.unwrap_err();
        assert!(matches!(err, DriverError::Ping { .. }));
        assert_eq!(driver.status(), Status::Down);
        assert_eq!(driver.metrics()[names::PING_SUCCESS], 0.0);

        Script::set(&script.fail_ping, false);
        driver.ping(&ctx).await.unwrap();
        assert_eq!(driver.status(), Status::Up);
        assert_eq!(driver.metrics()[names::PING_SUCCESS], 1.0);
    }

    #[tokio::test]
    async fn test_ping_timeout() {
        let (mut driver, script) = driver();
        let ctx = CancellationToken::new();
        driver.connect(&ctx).await.unwrap();

        Script::set(&script.hang_ping, true);
        let err = driver.ping(&ctx).await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(driver.status(), Status::Down);
        assert_eq!(driver.metrics()[names::PING_SUCCESS], 0.0);
    }

    #[tokio::test]
    async fn test_timed_out_connection_is_not_reused() {
        let (mut driver, script) = driver();
        let ctx = CancellationToken::new();
        driver.connect(&ctx).await.unwrap();
        assert_eq!(driver.pool_state().map(|s| s.idle), Some(1));

        Script::set(&script.hang_ping, true);
        assert!(driver.ping(&ctx).await.unwrap_err().is_timeout());
        assert_eq!(
            driver.pool_state(),
            Some(PoolState {
                open: 0,
                idle: 0,
                in_use: 0
            })
        );

        Script::set(&script.hang_ping, false);
        driver.check_read_write(&ctx).await.unwrap();
        assert_eq!(script.connects.load(Ordering::SeqCst), 2);
        assert_eq!(script.write_conn.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_request_drops_connection() {
        let (mut driver, script) = driver();
        let ctx = CancellationToken::new();
        driver.connect(&ctx).await.unwrap();

        // healthy cycles keep reusing the connect connection
        driver.check_read_write(&ctx).await.unwrap();
        assert_eq!(script.connects.load(Ordering::SeqCst), 1);

        Script::set(&script.fail_write, true);
        assert!(driver.check_read_write(&ctx).await.is_err());
        assert_eq!(driver.pool_state().map(|s| s.open), Some(0));

        Script::set(&script.fail_write, false);
        driver.check_read_write(&ctx).await.unwrap();
        assert_eq!(script.write_conn.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_ping_cancelled() {
        let (mut driver, script) = driver();
        let ctx = CancellationToken::new();
        driver.connect(&ctx).await.unwrap();

        Script::set(&script.hang_ping, true);
        ctx.cancel();
        let err = driver.ping(&ctx).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(driver.status(), Status::Down);
    }

    #[tokio::test]
    async fn test_read_write_without_connection() {
        let (mut driver, _) = driver();

        let err = driver
            .check_read_write(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::NotConnected));
        assert_eq!(driver.status(), Status::Down);

        let metrics = driver.metrics();
        assert_eq!(metrics[names::WRITE_SUCCESS], 0.0);
        assert_eq!(metrics[names::READ_SUCCESS], 0.0);
    }

    #[tokio::test]
    async fn test_stale_read_is_degraded() {
        let (mut driver, script) = driver();
        let ctx = CancellationToken::new();
        driver.connect(&ctx).await.unwrap();

        Script::set(&script.stale_read, true);
        let err = driver.check_read_write(&ctx).await.unwrap_err();
        match err {
            DriverError::Inconsistent { expected, actual } => {
                assert_eq!(expected.check_time - actual.check_time, 3600);
            }
            other => panic!("expected Inconsistent, got {other:?}"),
        }
        assert_eq!(driver.status(), Status::Degraded);
        let metrics = driver.metrics();
        assert_eq!(metrics[names::WRITE_SUCCESS], 1.0);
        assert_eq!(metrics[names::READ_SUCCESS], 0.5);
    }

    #[tokio::test]
    async fn test_write_failure_is_degraded() {
        let (mut driver, script) = driver();
        let ctx = CancellationToken::new();
        driver.connect(&ctx).await.unwrap();

        Script::set(&script.fail_write, true);
        let err = driver.check_read_write(&ctx).await.unwrap_err();
        assert!(matches!(err, DriverError::Write { .. }));
        assert_eq!(driver.status(), Status::Degraded);

        let metrics = driver.metrics();
        assert_eq!(metrics[names::WRITE_SUCCESS], 0.0);
        assert!(!metrics.contains_key(names::READ_SUCCESS));
    }

    #[tokio::test]
    async fn test_read_failure_is_degraded() {
        let (mut driver, script) = driver();
        let ctx = CancellationToken::new();
        driver.connect(&ctx).await.unwrap();

        Script::set(&script.fail_read, true);
        let err = driver.check_read_write(&ctx).await.unwrap_err();
        assert!(matches!(err, DriverError::Read { .. }));
        assert_eq!(driver.status(), Status::Degraded);
        assert_eq!(driver.metrics()[names::READ_SUCCESS], 0.0);
    }

    #[tokio::test]
    async fn test_empty_table_is_missing_record() {
        let (mut driver, script) = driver();
        let ctx = CancellationToken::new();
        driver.connect(&ctx).await.unwrap();

        Script::set(&script.lose_writes, true);
        let err = driver.check_read_write(&ctx).await.unwrap_err();
        assert!(matches!(err, DriverError::MissingRecord { .. }));
        assert_eq!(driver.status(), Status::Degraded);
        assert_eq!(driver.metrics()[names::READ_SUCCESS], 0.0);
    }

    #[tokio::test]
    async fn test_degraded_cycle_recovers_to_up() {
        let (mut driver, script) = driver();
        let ctx = CancellationToken::new();
        driver.connect(&ctx).await.unwrap();

        Script::set(&script.fail_write, true);
        assert!(driver.check_read_write(&ctx).await.is_err());
        assert_eq!(driver.status(), Status::Degraded);

        Script::set(&script.fail_write, false);
        driver.check_read_write(&ctx).await.unwrap();
        assert_eq!(driver.status(), Status::Up);
    }

    #[tokio::test]
    async fn test_read_uses_write_connection() {
        let backend = ScriptedBackend::default();
        let script = Arc::clone(&backend.script);
        let config = Config::builder("postgres://h/db")
            .max_open_conns(4)
            .max_idle_conns(4)
            .build()
            .unwrap();
        let mut driver = ProbeDriver::with_backend(backend, config);
        let ctx = CancellationToken::new();
        driver.connect(&ctx).await.unwrap();

        driver.check_read_write(&ctx).await.unwrap();
        let written_on = script.write_conn.load(Ordering::SeqCst);
        assert_ne!(written_on, 0);
        assert_eq!(written_on, script.read_conn.load(Ordering::SeqCst));
        assert_eq!(driver.pool_state().map(|s| s.in_use), Some(0));
    }

    #[tokio::test]
    async fn test_metrics_returns_copy() {
        let (mut driver, _) = driver();
        driver.connect(&CancellationToken::new()).await.unwrap();

        let mut snapshot = driver.metrics();
        snapshot.insert(names::CONNECTION_SUCCESS.to_string(), -1.0);
        snapshot.clear();

        assert_eq!(driver.metrics()[names::CONNECTION_SUCCESS], 1.0);
    }

    #[tokio::test]
    async fn test_reconnect_closes_previous_pool() {
        let (mut driver, script) = driver();
        let ctx = CancellationToken::new();

        driver.connect(&ctx).await.unwrap();
        driver.connect(&ctx).await.unwrap();

        assert_eq!(script.connects.load(Ordering::SeqCst), 2);
        assert_eq!(script.disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(driver.status(), Status::Up);
    }

    #[tokio::test]
    async fn test_close() {
        let (mut driver, script) = driver();
        driver.close().await.unwrap();

        driver.connect(&CancellationToken::new()).await.unwrap();
        driver.close().await.unwrap();
        assert!(!driver.is_connected());
        assert_eq!(script.disconnects.load(Ordering::SeqCst), 1);

        let err = driver.ping(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, DriverError::NotConnected));
    }
}
