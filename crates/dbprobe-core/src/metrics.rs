//! Metric-map convention shared by every driver
//!
//! Each probe phase writes exactly one `db_<phase>_success` entry (0, 0.5 or 1)
//! and, when the phase is timed, one `db_<phase>_latency_seconds` entry.
//! Values accumulate across calls on the same driver; [`ProbeMetrics::snapshot`]
//! hands out a fresh copy with the derived `service_health` gauge.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::backend::BackendKind;
use crate::status::Status;

/// Metric name to value mapping returned by `Driver::metrics`
pub type MetricMap = BTreeMap<String, f64>;

/// Well-known metric names
pub mod names {
    pub const CONNECTION_SUCCESS: &str = "db_connection_success";
    pub const CONNECTION_LATENCY: &str = "db_connection_latency_seconds";
    pub const TABLE_CREATION_SUCCESS: &str = "db_table_creation_success";
    pub const PING_SUCCESS: &str = "db_ping_success";
    pub const PING_LATENCY: &str = "db_ping_latency_seconds";
    pub const WRITE_SUCCESS: &str = "db_write_success";
    pub const WRITE_LATENCY: &str = "db_write_latency_seconds";
    pub const READ_SUCCESS: &str = "db_read_success";
    pub const READ_LATENCY: &str = "db_read_latency_seconds";
    pub const WAL_ENABLED: &str = "db_wal_enabled";
    pub const DRIVER_TYPE: &str = "db_driver_type";
    pub const SERVICE_HEALTH: &str = "service_health";

    /// Every name a driver may emit
    pub const ALL: &[&str] = &[
        CONNECTION_SUCCESS,
        CONNECTION_LATENCY,
        TABLE_CREATION_SUCCESS,
        PING_SUCCESS,
        PING_LATENCY,
        WRITE_SUCCESS,
        WRITE_LATENCY,
        READ_SUCCESS,
        READ_LATENCY,
        WAL_ENABLED,
        DRIVER_TYPE,
        SERVICE_HEALTH,
    ];
}

/// Probe phases that report success metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Connection,
    TableCreation,
    Ping,
    Write,
    Read,
}

impl Phase {
    /// Name of the `_success` metric for this phase
    pub fn success_key(&self) -> &'static str {
        match self {
            Phase::Connection => names::CONNECTION_SUCCESS,
            Phase::TableCreation => names::TABLE_CREATION_SUCCESS,
            Phase::Ping => names::PING_SUCCESS,
            Phase::Write => names::WRITE_SUCCESS,
            Phase::Read => names::READ_SUCCESS,
        }
    }

    /// Name of the `_latency_seconds` metric, if the phase is timed
    pub fn latency_key(&self) -> Option<&'static str> {
        match self {
            Phase::Connection => Some(names::CONNECTION_LATENCY),
            Phase::Ping => Some(names::PING_LATENCY),
            Phase::Write => Some(names::WRITE_LATENCY),
            Phase::Read => Some(names::READ_LATENCY),
            Phase::TableCreation => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Connection => "connection",
            Phase::TableCreation => "table_creation",
            Phase::Ping => "ping",
            Phase::Write => "write",
            Phase::Read => "read",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial credit recorded when a phase half-succeeded
pub const PARTIAL_SUCCESS: f64 = 0.5;

/// Accumulating metric store owned by a single driver
#[derive(Debug, Clone, Default)]
pub struct ProbeMetrics {
    values: MetricMap,
}

impl ProbeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of a phase (0.0, 0.5 or 1.0)
    pub fn record_success(&mut self, phase: Phase, value: f64) {
        self.set(phase.success_key(), value);
    }

    /// Record the latency of a timed phase; untimed phases are ignored
    pub fn record_latency(&mut self, phase: Phase, elapsed: Duration) {
        if let Some(key) = phase.latency_key() {
            self.set(key, elapsed.as_secs_f64());
        }
    }

    /// Set an arbitrary metric value
    pub fn set(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_string(), value);
    }

    /// Read back a recorded value
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Copy of the accumulated values plus the derived gauges
    pub fn snapshot(&self, status: Status, backend: BackendKind) -> MetricMap {
        let mut metrics = self.values.clone();
        metrics.insert(names::SERVICE_HEALTH.to_string(), status.health_value());
        metrics.insert(names::DRIVER_TYPE.to_string(), backend.type_code());
        metrics
    }
}
