//! MySQL health-check backend

use async_trait::async_trait;
use dbprobe_core::{BackendKind, BoxError, Config, DriverError, HealthRecord};
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts};

use crate::pool::ConnectionManager;
use crate::probe::{Backend, ProbeDriver};

/// MySQL [`Driver`](dbprobe_core::Driver)
pub type MySqlDriver = ProbeDriver<MySqlBackend>;

impl ProbeDriver<MySqlBackend> {
    pub fn new(config: Config) -> Self {
        Self::with_backend(MySqlBackend, config)
    }
}

/// Opens `mysql_async` connections for the pool
pub struct MySqlManager {
    opts: Opts,
}

#[async_trait]
impl ConnectionManager for MySqlManager {
    type Connection = Conn;

    async fn connect(&self) -> Result<Conn, BoxError> {
        Ok(Conn::new(self.opts.clone()).await?)
    }

    async fn disconnect(&self, conn: Conn) {
        if let Err(e) = conn.disconnect().await {
            tracing::debug!(backend = "mysql", error = %e, "disconnect failed");
        }
    }
}

/// MySQL dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlBackend;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS dbprobe_health_check (
    id INT PRIMARY KEY,
    check_time BIGINT NOT NULL,
    check_value VARCHAR(255) NOT NULL
) ENGINE=InnoDB";

const UPSERT: &str = "INSERT INTO dbprobe_health_check (id, check_time, check_value)
    VALUES (1, ?, ?)
    ON DUPLICATE KEY UPDATE check_time = ?, check_value = ?";

const SELECT_LATEST: &str = "SELECT check_time, check_value FROM dbprobe_health_check
    ORDER BY check_time DESC LIMIT 1";

#[async_trait]
impl Backend for MySqlBackend {
    type Manager = MySqlManager;

    fn kind(&self) -> BackendKind {
        BackendKind::Mysql
    }

    fn manager(&self, config: &Config) -> Result<MySqlManager, DriverError> {
        let opts = Opts::from_url(config.dsn.trim()).map_err(|e| DriverError::InvalidDsn {
            backend: BackendKind::Mysql,
            reason: e.to_string(),
        })?;
        Ok(MySqlManager { opts })
    }

    async fn ping(&self, conn: &mut Conn) -> Result<(), BoxError> {
        conn.ping().await?;
        Ok(())
    }

    async fn create_health_table(&self, conn: &mut Conn) -> Result<(), BoxError> {
        conn.query_drop(CREATE_TABLE).await?;
        Ok(())
    }

    async fn write_record(&self, conn: &mut Conn, record: &HealthRecord) -> Result<(), BoxError> {
        let HealthRecord {
            check_time,
            check_value,
        } = record.clone();
        conn.exec_drop(
            UPSERT,
            (check_time, check_value.clone(), check_time, check_value),
        )
        .await?;
        Ok(())
    }

    async fn read_latest(&self, conn: &mut Conn) -> Result<Option<HealthRecord>, BoxError> {
        let row: Option<(i64, String)> = conn.query_first(SELECT_LATEST).await?;
        Ok(row.map(|(check_time, check_value)| HealthRecord::new(check_time, check_value)))
    }
}
