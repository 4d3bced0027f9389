use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgAction, Parser};
use dbprobe_core::{BackendKind, Config, ConfigBuilder, redact_dsn};
use dbprobe_observability::{DEFAULT_NAMESPACE, LogFormat, ProbeExporter, init_tracing};
use tokio::signal;
use tokio_util::sync::CancellationToken;

mod runner;

use runner::{MetricsFormat, Runner};

#[derive(Parser, Debug)]
#[command(name = "dbprobe", version)]
#[command(about = "dbprobe - database health prober for PostgreSQL, MySQL, SQLite and SQL Server")]
struct Cli {
    /// Database type; prefixes the DSN with its scheme when missing
    #[arg(long)]
    db_type: Option<BackendKind>,

    /// Connection string (falls back to DBPROBE_DSN)
    #[arg(long)]
    db_dsn: Option<String>,

    /// Run a single cycle and exit 0 on success, 1 on failure
    #[arg(long)]
    once: bool,

    /// Time between cycles in periodic mode
    #[arg(long, default_value = "60s", value_parser = humantime::parse_duration)]
    interval: Duration,

    /// Bound applied to every probe phase [default: 10s]
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Create the health-check table during connect [default: true]
    #[arg(long, action = ArgAction::Set)]
    create_table: Option<bool>,

    /// Retries of a failed cycle [default: 3]
    #[arg(long)]
    max_retries: Option<u32>,

    /// Base backoff between retries, doubled per attempt [default: 1s]
    #[arg(long, value_parser = humantime::parse_duration)]
    retry_interval: Option<Duration>,

    /// Name attached to every report
    #[arg(long, default_value = "dbprobe")]
    service_name: String,

    /// Log output layout (json, pretty)
    #[arg(long, default_value = "json")]
    log_format: LogFormat,

    /// Where cycle metrics go
    #[arg(long, value_enum, default_value_t = MetricsFormat::Log)]
    metrics_format: MetricsFormat,
}

impl Cli {
    /// Layer flags over `DBPROBE_*` variables and defaults
    fn config(&self) -> Result<Config, String> {
        let mut builder = ConfigBuilder::from_env().map_err(|e| e.to_string())?;

        if let Some(dsn) = &self.db_dsn {
            builder = builder.dsn(dsn.clone());
        }
        if let Some(timeout) = self.timeout {
            builder = builder.with_timeout(timeout);
        }
        if let Some(create) = self.create_table {
            builder = builder.create_health_table(create);
        }
        if let Some(retries) = self.max_retries {
            builder = builder.max_retries(retries);
        }
        if let Some(interval) = self.retry_interval {
            builder = builder.retry_interval(interval);
        }

        let mut config = builder.build().map_err(|e| e.to_string())?;
        if let Some(kind) = self.db_type {
            config.dsn = kind.qualify_dsn(&config.dsn);
        }
        Ok(config)
    }
}

/// Cancel `token` on SIGINT or SIGTERM
async fn shutdown_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT (Ctrl+C), shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
    token.cancel();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = match cli.config() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let (max_retries, retry_interval) = (config.max_retries, config.retry_interval);
    let dsn = redact_dsn(&config.dsn);

    let driver = match dbprobe_drivers::new_driver(config) {
        Ok(driver) => driver,
        Err(err) => {
            tracing::error!(error = %err, "cannot create driver");
            return ExitCode::FAILURE;
        }
    };

    let registry = prometheus::Registry::new();
    let exporter = match ProbeExporter::new(&registry, DEFAULT_NAMESPACE) {
        Ok(exporter) => exporter,
        Err(err) => {
            tracing::error!(error = %err, "cannot register metrics");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        service = %cli.service_name,
        backend = %driver.backend(),
        dsn = %dsn,
        once = cli.once,
        "starting dbprobe"
    );

    let mut runner = Runner::new(driver, exporter)
        .with_service(cli.service_name.clone())
        .with_retries(max_retries, retry_interval)
        .with_format(cli.metrics_format);

    let token = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(token.clone()));

    if cli.once {
        let report = runner.run_once(&token).await;
        runner.close().await;
        return if report.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    runner.run_periodic(&token, cli.interval).await;
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["dbprobe", "--db-dsn", "file:/tmp/x.db"]);
        assert!(!cli.once);
        assert_eq!(cli.interval, Duration::from_secs(60));
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.metrics_format, MetricsFormat::Log);
        assert!(cli.timeout.is_none());
        assert!(cli.create_table.is_none());
    }

    #[test]
    fn test_flags_parse() {
        let cli = Cli::parse_from([
            "dbprobe",
            "--db-type",
            "postgres",
            "--db-dsn",
            "u:p@db:5432/health",
            "--once",
            "--timeout",
            "3s",
            "--create-table",
            "false",
            "--max-retries",
            "5",
            "--retry-interval",
            "250ms",
            "--log-format",
            "pretty",
            "--metrics-format",
            "prometheus",
        ]);
        assert_eq!(cli.db_type, Some(BackendKind::Postgres));
        assert!(cli.once);
        assert_eq!(cli.timeout, Some(Duration::from_secs(3)));
        assert_eq!(cli.create_table, Some(false));
        assert_eq!(cli.max_retries, Some(5));
        assert_eq!(cli.retry_interval, Some(Duration::from_millis(250)));
        assert_eq!(cli.log_format, LogFormat::Pretty);
        assert_eq!(cli.metrics_format, MetricsFormat::Prometheus);
    }

    #[test]
    fn test_config_qualifies_dsn() {
        let cli = Cli::parse_from([
            "dbprobe",
            "--db-type",
            "postgres",
            "--db-dsn",
            "u:p@db/health",
            "--timeout",
            "3s",
        ]);
        let config = cli.config().unwrap();
        assert_eq!(config.dsn, "postgres://u:p@db/health");
        assert_eq!(config.ping_timeout, Duration::from_secs(3));
        assert_eq!(config.table_creation_timeout, Duration::from_secs(3));

        let cli = Cli::parse_from(["dbprobe", "--db-type", "sqlite", "--db-dsn", "file:/tmp/a.db"]);
        assert_eq!(cli.config().unwrap().dsn, "file:/tmp/a.db");
    }

    #[test]
    fn test_rejects_unknown_db_type() {
        assert!(Cli::try_parse_from(["dbprobe", "--db-type", "oracle"]).is_err());
    }
}
