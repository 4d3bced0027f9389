//! SQLite health-check backend
//!
//! DSNs are SQLite URIs (`file:/var/lib/app.db?cache=shared`). rusqlite is
//! blocking, so every statement runs on the blocking thread pool and is
//! interrupted through the connection's [`InterruptHandle`] when the caller
//! stops waiting for it.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use dbprobe_core::metrics::names;
use dbprobe_core::{
    BackendKind, BoxError, Config, DriverError, HealthRecord, ProbeMetrics,
};
use rusqlite::{Connection, InterruptHandle, OpenFlags, OptionalExtension, params};
use tokio_util::sync::CancellationToken;

use crate::pool::{ConnectionManager, PoolOptions};
use crate::probe::{Backend, ProbeDriver};
use crate::timeout::bounded;

/// SQLite serializes writers; more connections only add lock contention
pub const MAX_OPEN_CONNS: u32 = 10;

/// SQLite [`Driver`](dbprobe_core::Driver)
pub type SqliteDriver = ProbeDriver<SqliteBackend>;

impl ProbeDriver<SqliteBackend> {
    pub fn new(config: Config) -> Self {
        Self::with_backend(SqliteBackend, config)
    }
}

/// A rusqlite connection shared with the blocking thread that drives it
pub struct SqliteConnection {
    conn: Arc<Mutex<Connection>>,
    interrupt: Arc<InterruptHandle>,
}

impl SqliteConnection {
    /// Run `f` on the blocking pool, interrupting it if this future is dropped
    pub async fn call<F, T>(&self, f: F) -> Result<T, BoxError>
    where
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let guard = InterruptGuard {
            handle: Some(Arc::clone(&self.interrupt)),
        };

        let result = tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut conn)
        })
        .await;
        guard.disarm();

        Ok(result??)
    }
}

struct InterruptGuard {
    handle: Option<Arc<InterruptHandle>>,
}

impl InterruptGuard {
    fn disarm(mut self) {
        self.handle = None;
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            tracing::debug!("interrupting abandoned sqlite statement");
            handle.interrupt();
        }
    }
}

/// Opens SQLite connections for the pool
pub struct SqliteManager {
    dsn: String,
    busy_timeout: Duration,
}

#[async_trait]
impl ConnectionManager for SqliteManager {
    type Connection = SqliteConnection;

    async fn connect(&self) -> Result<SqliteConnection, BoxError> {
        let dsn = self.dsn.clone();
        let busy_timeout = self.busy_timeout;

        let conn = tokio::task::spawn_blocking(move || -> rusqlite::Result<Connection> {
            let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX;
            let conn = Connection::open_with_flags(&dsn, flags)?;
            conn.busy_timeout(busy_timeout)?;
            if let Err(e) = conn.pragma_update(None, "foreign_keys", true) {
                tracing::debug!(error = %e, "foreign_keys pragma not applied to pooled connection");
            }
            Ok(conn)
        })
        .await??;

        let interrupt = Arc::new(conn.get_interrupt_handle());
        Ok(SqliteConnection {
            conn: Arc::new(Mutex::new(conn)),
            interrupt,
        })
    }
}

/// SQLite dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteBackend;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS dbprobe_health_check (
    id INTEGER PRIMARY KEY,
    check_time INTEGER NOT NULL,
    check_value TEXT NOT NULL
)";

const UPSERT: &str = "INSERT OR REPLACE INTO dbprobe_health_check (id, check_time, check_value)
    VALUES (1, ?1, ?2)";

const SELECT_LATEST: &str =
    "SELECT check_time, check_value FROM dbprobe_health_check WHERE id = 1";

#[async_trait]
impl Backend for SqliteBackend {
    type Manager = SqliteManager;

    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn manager(&self, config: &Config) -> Result<SqliteManager, DriverError> {
        let dsn = config.dsn.trim();
        let Some(target) = dsn.strip_prefix("file:") else {
            return Err(DriverError::InvalidDsn {
                backend: BackendKind::Sqlite,
                reason: "expected a file: URI".into(),
            });
        };
        let path = target.split('?').next().unwrap_or_default();
        if path.is_empty() {
            return Err(DriverError::InvalidDsn {
                backend: BackendKind::Sqlite,
                reason: "missing database path".into(),
            });
        }

        Ok(SqliteManager {
            dsn: dsn.to_string(),
            busy_timeout: config.write_timeout,
        })
    }

    fn pool_options(&self, config: &Config) -> PoolOptions {
        let mut options = PoolOptions::from_config(config);
        if options.max_open == 0 || options.max_open > MAX_OPEN_CONNS {
            options.max_open = MAX_OPEN_CONNS;
        }
        options
    }

    async fn ping(&self, conn: &mut SqliteConnection) -> Result<(), BoxError> {
        conn.call(|c| c.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)))
            .await
            .map(drop)
    }

    async fn configure(
        &self,
        conn: &mut SqliteConnection,
        ctx: &CancellationToken,
        limit: Duration,
        metrics: &mut ProbeMetrics,
    ) -> Result<(), DriverError> {
        bounded(
            ctx,
            limit,
            conn.call(|c| c.pragma_update(None, "foreign_keys", true)),
        )
        .await
        .map_err(|source| DriverError::Configure {
            backend: BackendKind::Sqlite,
            setting: "foreign_keys",
            source,
        })?;

        let journal_mode = bounded(
            ctx,
            limit,
            conn.call(|c| c.query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0))),
        )
        .await;
        let wal = match journal_mode {
            Ok(mode) => {
                tracing::debug!(journal_mode = %mode, "sqlite journal mode");
                mode.eq_ignore_ascii_case("wal")
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to enable WAL journal mode");
                false
            }
        };
        metrics.set(names::WAL_ENABLED, if wal { 1.0 } else { 0.0 });

        Ok(())
    }

    async fn create_health_table(&self, conn: &mut SqliteConnection) -> Result<(), BoxError> {
        conn.call(|c| c.execute_batch(CREATE_TABLE)).await
    }

    async fn write_record(
        &self,
        conn: &mut SqliteConnection,
        record: &HealthRecord,
    ) -> Result<(), BoxError> {
        let record = record.clone();
        conn.call(move |c| c.execute(UPSERT, params![record.check_time, record.check_value]))
            .await
            .map(drop)
    }

    async fn read_latest(
        &self,
        conn: &mut SqliteConnection,
    ) -> Result<Option<HealthRecord>, BoxError> {
        conn.call(|c| {
            c.query_row(SELECT_LATEST, [], |row| {
                Ok(HealthRecord::new(row.get(0)?, row.get::<_, String>(1)?))
            })
            .optional()
        })
        .await
    }
}
