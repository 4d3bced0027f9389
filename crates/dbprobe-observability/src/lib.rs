//! dbprobe Observability
//!
//! Prometheus export of driver metric maps and `tracing` subscriber setup
//! for the probe binary.

#[cfg(feature = "metrics")]
pub mod metrics;

#[cfg(feature = "tracing")]
pub mod trace;

#[cfg(feature = "metrics")]
pub use metrics::{ExporterError, ProbeExporter};

#[cfg(feature = "tracing")]
pub use trace::{LogFormat, init_tracing};

/// Default metric namespace
pub const DEFAULT_NAMESPACE: &str = "dbprobe";
