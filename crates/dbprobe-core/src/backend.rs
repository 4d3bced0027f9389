//! Backend identification by DSN scheme

use serde::{Deserialize, Serialize};

/// Supported relational backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Postgres,
    Mysql,
    Sqlite,
    Mssql,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [
        BackendKind::Postgres,
        BackendKind::Mysql,
        BackendKind::Sqlite,
        BackendKind::Mssql,
    ];

    /// Resolve a backend from the DSN prefix.
    ///
    /// `postgresql://` is accepted as an alias of `postgres://`. SQLite DSNs
    /// are URIs starting with `file:`.
    pub fn from_dsn(dsn: &str) -> Option<Self> {
        let dsn = dsn.trim_start();
        if dsn.starts_with("postgres://") || dsn.starts_with("postgresql://") {
            Some(BackendKind::Postgres)
        } else if dsn.starts_with("mysql://") {
            Some(BackendKind::Mysql)
        } else if dsn.starts_with("file:") {
            Some(BackendKind::Sqlite)
        } else if dsn.starts_with("sqlserver://") {
            Some(BackendKind::Mssql)
        } else {
            None
        }
    }

    /// Canonical DSN prefix
    pub fn scheme(&self) -> &'static str {
        match self {
            BackendKind::Postgres => "postgres://",
            BackendKind::Mysql => "mysql://",
            BackendKind::Sqlite => "file:",
            BackendKind::Mssql => "sqlserver://",
        }
    }

    /// Value exported as `db_driver_type`
    pub fn type_code(&self) -> f64 {
        match self {
            BackendKind::Postgres => 1.0,
            BackendKind::Mysql => 2.0,
            BackendKind::Sqlite => 3.0,
            BackendKind::Mssql => 4.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Postgres => "postgres",
            BackendKind::Mysql => "mysql",
            BackendKind::Sqlite => "sqlite",
            BackendKind::Mssql => "mssql",
        }
    }

    /// Prefix `dsn` with this backend's scheme unless it already resolves to it
    pub fn qualify_dsn(&self, dsn: &str) -> String {
        if BackendKind::from_dsn(dsn) == Some(*self) {
            dsn.to_string()
        } else {
            format!("{}{}", self.scheme(), dsn)
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(BackendKind::Postgres),
            "mysql" => Ok(BackendKind::Mysql),
            "sqlite" | "sqlite3" => Ok(BackendKind::Sqlite),
            "mssql" | "sqlserver" => Ok(BackendKind::Mssql),
            other => Err(format!("unknown database type '{other}'")),
        }
    }
}
