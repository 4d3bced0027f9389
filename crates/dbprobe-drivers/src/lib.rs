//! # dbprobe-drivers
//!
//! Health-check drivers for PostgreSQL, MySQL, SQLite and SQL Server.
//!
//! Every backend is a [`ProbeDriver`] over a dialect [`Backend`]: the shared
//! protocol handles pooling, deadlines, status and metrics, while each backend
//! only owns its native client and its literal statements.
//!
//! ## Features
//!
//! - `postgres` - PostgreSQL via `tokio-postgres`
//! - `mysql` - MySQL via `mysql_async`
//! - `sqlite` - SQLite via `rusqlite` (bundled)
//! - `mssql` - SQL Server via `tiberius`
//!
//! All four are enabled by default.

pub mod factory;
pub mod pool;
pub mod probe;
pub mod timeout;

#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use factory::new_driver;
pub use pool::{ConnectionManager, ConnectionPool, PoolError, PoolOptions, PoolState};
pub use probe::{Backend, ProbeDriver};

#[cfg(feature = "mssql")]
pub use mssql::MssqlDriver;
#[cfg(feature = "mysql")]
pub use mysql::MySqlDriver;
#[cfg(feature = "postgres")]
pub use postgres::PostgresDriver;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDriver;
