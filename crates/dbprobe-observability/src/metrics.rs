//! Prometheus export of driver metric maps
//!
//! Every name a driver may emit becomes one gauge labelled by `backend`, so the
//! series count is bounded by `names::ALL × BackendKind::ALL`. Names outside
//! that set are rejected instead of registered on the fly.

use std::collections::HashMap;

use dbprobe_core::metrics::names;
use dbprobe_core::{BackendKind, MetricMap, Status};
use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use thiserror::Error;

/// Gauges and counters for probe results, registered on a caller-owned registry
#[derive(Debug, Clone)]
pub struct ProbeExporter {
    registry: Registry,
    gauges: HashMap<&'static str, GaugeVec>,
    cycles_total: CounterVec, // cardinality: 4 backends × 3 statuses
}

impl ProbeExporter {
    /// Register the probe metrics under `namespace` on `registry`.
    ///
    /// Registering twice with the same namespace on one registry fails with
    /// `AlreadyReg`.
    pub fn new(registry: &Registry, namespace: &str) -> Result<Self, ExporterError> {
        let mut gauges = HashMap::with_capacity(names::ALL.len());
        for &name in names::ALL {
            let gauge = GaugeVec::new(
                Opts::new(format!("{}_{}", namespace, name), help_for(name)),
                &["backend"],
            )?;
            registry.register(Box::new(gauge.clone()))?;
            gauges.insert(name, gauge);
        }

        let cycles_total = CounterVec::new(
            Opts::new(
                format!("{}_probe_cycles_total", namespace),
                "Completed probe cycles by final status",
            ),
            &["backend", "status"],
        )?;
        registry.register(Box::new(cycles_total.clone()))?;

        Ok(Self {
            registry: registry.clone(),
            gauges,
            cycles_total,
        })
    }

    /// Copy a driver metric map into the gauges for `backend`.
    ///
    /// The whole map is checked before any gauge moves, so a rejected map
    /// leaves the exported values untouched.
    pub fn observe(&self, backend: BackendKind, metrics: &MetricMap) -> Result<(), ExporterError> {
        if let Some(unknown) = metrics.keys().find(|k| !self.gauges.contains_key(k.as_str())) {
            return Err(ExporterError::UnknownMetric(unknown.clone()));
        }

        let label = backend.as_str();
        for (name, value) in metrics {
            if let Some(gauge) = self.gauges.get(name.as_str()) {
                gauge.with_label_values(&[label]).set(*value);
            }
        }
        Ok(())
    }

    /// Count one finished cycle.
    pub fn record_cycle(&self, backend: BackendKind, status: Status) {
        self.cycles_total
            .with_label_values(&[backend.as_str(), status.as_str()])
            .inc();
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, ExporterError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| ExporterError::Encoding(e.to_string()))
    }

    /// Registry the exporter writes to
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

fn help_for(name: &str) -> &'static str {
    match name {
        names::CONNECTION_SUCCESS => "Connection and setup outcome (0, 0.5 or 1)",
        names::CONNECTION_LATENCY => "Time spent opening the connection",
        names::TABLE_CREATION_SUCCESS => "Health table provisioning outcome",
        names::PING_SUCCESS => "Ping outcome",
        names::PING_LATENCY => "Ping round trip",
        names::WRITE_SUCCESS => "Health record write outcome",
        names::WRITE_LATENCY => "Health record write duration",
        names::READ_SUCCESS => "Health record read-back outcome",
        names::READ_LATENCY => "Health record read duration",
        names::WAL_ENABLED => "Whether SQLite runs in WAL journal mode",
        names::DRIVER_TYPE => "Numeric backend code (1 postgres, 2 mysql, 3 sqlite, 4 mssql)",
        names::SERVICE_HEALTH => "Overall status (1 up, 0.5 degraded, 0 down)",
        _ => "dbprobe metric",
    }
}

/// Exporter errors
#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("unknown metric {0}")]
    UnknownMetric(String),

    #[error("exposition output is not UTF-8: {0}")]
    Encoding(String),
}
