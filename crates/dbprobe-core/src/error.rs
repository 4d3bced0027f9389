//! Error taxonomy for driver operations
//!
//! Every failing probe step maps to one [`DriverError`] variant, and every
//! variant knows which [`Status`] it leaves the driver in. Bounded operations
//! report why they stopped through [`OperationError`].

use std::time::Duration;

use thiserror::Error;

use crate::backend::BackendKind;
use crate::record::HealthRecord;
use crate::status::Status;

/// Boxed error from a native database client
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why a bounded operation did not complete
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("cancelled by caller")]
    Cancelled,

    #[error(transparent)]
    Backend(BoxError),
}

impl OperationError {
    /// Wrap any client error
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        OperationError::Backend(err.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, OperationError::TimedOut(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, OperationError::Cancelled)
    }
}

/// Errors produced by the driver factory and the probe operations
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("unsupported database scheme in DSN '{dsn}'")]
    UnsupportedScheme { dsn: String },

    #[error("{backend} support is not compiled into this build")]
    BackendUnavailable { backend: BackendKind },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid {backend} DSN: {reason}")]
    InvalidDsn { backend: BackendKind, reason: String },

    #[error("failed to connect to {backend}: {source}")]
    Connect {
        backend: BackendKind,
        #[source]
        source: OperationError,
    },

    #[error("not connected")]
    NotConnected,

    #[error("{backend} ping failed: {source}")]
    Ping {
        backend: BackendKind,
        #[source]
        source: OperationError,
    },

    #[error("failed to create health table on {backend}: {source}")]
    TableCreation {
        backend: BackendKind,
        #[source]
        source: OperationError,
    },

    #[error("failed to apply {setting} on {backend}: {source}")]
    Configure {
        backend: BackendKind,
        setting: &'static str,
        #[source]
        source: OperationError,
    },

    #[error("{backend} write failed: {source}")]
    Write {
        backend: BackendKind,
        #[source]
        source: OperationError,
    },

    #[error("{backend} read failed: {source}")]
    Read {
        backend: BackendKind,
        #[source]
        source: OperationError,
    },

    #[error("no health record found on {backend}")]
    MissingRecord { backend: BackendKind },

    #[error("inconsistent read-back: expected {expected}, got {actual}")]
    Inconsistent {
        expected: HealthRecord,
        actual: HealthRecord,
    },
}

impl DriverError {
    /// Status a driver is left in after this error.
    ///
    /// Factory and configuration errors happen before a driver exists and
    /// report `Down`.
    pub fn status(&self) -> Status {
        match self {
            DriverError::UnsupportedScheme { .. }
            | DriverError::BackendUnavailable { .. }
            | DriverError::InvalidConfig(_)
            | DriverError::InvalidDsn { .. }
            | DriverError::Connect { .. }
            | DriverError::NotConnected
            | DriverError::Ping { .. } => Status::Down,
            DriverError::TableCreation { .. }
            | DriverError::Configure { .. }
            | DriverError::Write { .. }
            | DriverError::Read { .. }
            | DriverError::MissingRecord { .. }
            | DriverError::Inconsistent { .. } => Status::Degraded,
        }
    }

    /// Whether the failure came from a deadline
    pub fn is_timeout(&self) -> bool {
        self.operation_error().is_some_and(OperationError::is_timeout)
    }

    /// Whether the failure came from caller cancellation
    pub fn is_cancelled(&self) -> bool {
        self.operation_error()
            .is_some_and(OperationError::is_cancelled)
    }

    fn operation_error(&self) -> Option<&OperationError> {
        match self {
            DriverError::Connect { source, .. }
            | DriverError::Ping { source, .. }
            | DriverError::TableCreation { source, .. }
            | DriverError::Configure { source, .. }
            | DriverError::Write { source, .. }
            | DriverError::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}
