//! DSN scheme to driver resolution

use dbprobe_core::{BackendKind, Config, Driver, DriverError, redact_dsn};

/// Build the driver matching the DSN scheme.
///
/// No network I/O happens here; the returned driver starts `Down` until
/// `connect` succeeds.
///
/// # Errors
///
/// - `UnsupportedScheme` when the DSN prefix matches no backend
/// - `BackendUnavailable` when the backend's cargo feature is disabled
pub fn new_driver(config: Config) -> Result<Box<dyn Driver>, DriverError> {
    let Some(kind) = BackendKind::from_dsn(&config.dsn) else {
        return Err(DriverError::UnsupportedScheme {
            dsn: redact_dsn(&config.dsn),
        });
    };

    tracing::debug!(backend = %kind, dsn = %redact_dsn(&config.dsn), "creating driver");

    match kind {
        #[cfg(feature = "postgres")]
        BackendKind::Postgres => Ok(Box::new(crate::postgres::PostgresDriver::new(config))),
        #[cfg(feature = "mysql")]
        BackendKind::Mysql => Ok(Box::new(crate::mysql::MySqlDriver::new(config))),
        #[cfg(feature = "sqlite")]
        BackendKind::Sqlite => Ok(Box::new(crate::sqlite::SqliteDriver::new(config))),
        #[cfg(feature = "mssql")]
        BackendKind::Mssql => Ok(Box::new(crate::mssql::MssqlDriver::new(config))),
        #[allow(unreachable_patterns)]
        backend => Err(DriverError::BackendUnavailable { backend }),
    }
}
