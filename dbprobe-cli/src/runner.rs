//! Probe cycles with retry, reporting and periodic scheduling

use std::time::Duration;

use clap::ValueEnum;
use dbprobe_core::{BackendKind, Driver, DriverError, MetricMap, Status};
use dbprobe_observability::ProbeExporter;
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Upper bound on a single retry delay
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// How cycle results are written out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MetricsFormat {
    /// A structured `tracing` event
    #[default]
    Log,
    /// One JSON document per cycle on stdout
    Json,
    /// Prometheus text exposition on stdout
    Prometheus,
}

/// Outcome of one cycle, retries included
#[derive(Debug)]
pub struct CycleReport {
    pub status: Status,
    pub attempts: u32,
    pub metrics: MetricMap,
    pub error: Option<DriverError>,
}

impl CycleReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Serialize)]
struct CycleSummary<'a> {
    service: &'a str,
    backend: BackendKind,
    status: Status,
    attempts: u32,
    metrics: &'a MetricMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Delay before retry number `attempt + 1`: `base · 2^attempt`, capped.
pub fn backoff(base: Duration, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

/// Drives one driver through connect, ping and read/write cycles
pub struct Runner {
    driver: Box<dyn Driver>,
    exporter: ProbeExporter,
    service: String,
    max_retries: u32,
    retry_interval: Duration,
    format: MetricsFormat,
}

impl Runner {
    pub fn new(driver: Box<dyn Driver>, exporter: ProbeExporter) -> Self {
        Self {
            driver,
            exporter,
            service: "dbprobe".to_string(),
            max_retries: 0,
            retry_interval: Duration::from_secs(1),
            format: MetricsFormat::Log,
        }
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    pub fn with_retries(mut self, max_retries: u32, retry_interval: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_interval = retry_interval;
        self
    }

    pub fn with_format(mut self, format: MetricsFormat) -> Self {
        self.format = format;
        self
    }

    pub fn exporter(&self) -> &ProbeExporter {
        &self.exporter
    }

    async fn cycle(&mut self, ctx: &CancellationToken) -> Result<(), DriverError> {
        self.driver.connect(ctx).await?;
        self.driver.ping(ctx).await?;
        self.driver.check_read_write(ctx).await
    }

    /// Run one cycle, retrying failures with exponential backoff, then report.
    pub async fn run_once(&mut self, ctx: &CancellationToken) -> CycleReport {
        let backend = self.driver.backend();
        let mut attempt = 0;

        let error = loop {
            let Err(err) = self.cycle(ctx).await else {
                break None;
            };

            if ctx.is_cancelled() || attempt >= self.max_retries {
                break Some(err);
            }

            let delay = backoff(self.retry_interval, attempt);
            tracing::warn!(
                backend = %backend,
                attempt = attempt + 1,
                retry_in = %humantime::format_duration(delay),
                error = %err,
                "probe cycle failed, retrying"
            );

            tokio::select! {
                biased;
                _ = ctx.cancelled() => break Some(err),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        };

        let report = CycleReport {
            status: self.driver.status(),
            attempts: attempt + 1,
            metrics: self.driver.metrics(),
            error,
        };
        self.report(backend, &report);
        report
    }

    /// Run a cycle now and one per `interval` until `ctx` is cancelled, then
    /// close the driver. Returns the number of cycles run.
    pub async fn run_periodic(&mut self, ctx: &CancellationToken, interval: Duration) -> u64 {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = 0;

        loop {
            tokio::select! {
                biased;
                _ = ctx.cancelled() => break,
                _ = ticker.tick() => {
                    self.run_once(ctx).await;
                    cycles += 1;
                }
            }
        }

        tracing::info!(cycles, "probe loop stopped");
        self.close().await;
        cycles
    }

    pub async fn close(&mut self) {
        if let Err(err) = self.driver.close().await {
            tracing::warn!(error = %err, "failed to close driver");
        }
    }

    fn report(&self, backend: BackendKind, report: &CycleReport) {
        if let Err(err) = self.exporter.observe(backend, &report.metrics) {
            tracing::warn!(error = %err, "metrics not exported");
        }
        self.exporter.record_cycle(backend, report.status);

        match report.error.as_ref() {
            None => tracing::info!(
                service = %self.service,
                backend = %backend,
                status = %report.status,
                attempts = report.attempts,
                "probe cycle succeeded"
            ),
            Some(err) => tracing::error!(
                service = %self.service,
                backend = %backend,
                status = %report.status,
                attempts = report.attempts,
                error = %err,
                "probe cycle failed"
            ),
        }

        match self.format {
            MetricsFormat::Log => {
                tracing::info!(service = %self.service, backend = %backend, metrics = ?report.metrics, "metrics");
            }
            MetricsFormat::Json => {
                let summary = CycleSummary {
                    service: &self.service,
                    backend,
                    status: report.status,
                    attempts: report.attempts,
                    metrics: &report.metrics,
                    error: report.error.as_ref().map(|e| e.to_string()),
                };
                match serde_json::to_string(&summary) {
                    Ok(line) => println!("{line}"),
                    Err(err) => tracing::warn!(error = %err, "failed to serialize metrics"),
                }
            }
            MetricsFormat::Prometheus => match self.exporter.encode() {
                Ok(text) => print!("{text}"),
                Err(err) => tracing::warn!(error = %err, "failed to encode metrics"),
            },
        }
    }
}
