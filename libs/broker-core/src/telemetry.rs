//! Structured logging and Prometheus metrics setup shared by both services.
//!
//! Logging is configured from a small JSON document (the `K_LOGGING_CONFIG`
//! environment variable); metrics are exported in Prometheus text format
//! from whatever the process registers via the `metrics` facade.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Deserialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Log output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable, ANSI-colored when attached to a terminal.
    Console,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::Json
    }
}

/// Parsed shape of `K_LOGGING_CONFIG`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// An `EnvFilter` directive string, e.g. `"info,broker_core=debug"`.
    /// Falls back to `RUST_LOG`, then `"info"`, when absent.
    #[serde(default)]
    pub level: Option<String>,
}

impl LoggingConfig {
    /// Parse `K_LOGGING_CONFIG`'s JSON value, falling back to defaults for a
    /// missing or malformed variable rather than failing startup over it.
    pub fn from_env() -> Self {
        match std::env::var("K_LOGGING_CONFIG") {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                eprintln!("K_LOGGING_CONFIG is not valid JSON ({e}), using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let directives = self
            .level
            .clone()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| "info".to_owned());
        EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Install the global `tracing` subscriber. Idempotent per process: a second
/// call is a no-op (logged, not panicked) since both `apps/ingress` and
/// `apps/filter` share this entry point and tests may call it more than
/// once across the crate graph.
pub fn init_logging(config: &LoggingConfig) {
    let filter = config.env_filter();
    let registry = Registry::default().with(filter);

    let result = match config.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json().with_target(true)).try_init(),
        LogFormat::Console => registry.with(tracing_subscriber::fmt::layer().with_target(true)).try_init(),
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already initialized: {e}");
    }
}

/// Install the process-wide Prometheus recorder and return the handle used
/// to render `/metrics` exposition text. Call once at startup before any
/// `metrics::counter!`/`histogram!` call site runs.
pub fn install_prometheus_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("install global Prometheus recorder")
}

/// Dedicated bind address for a standalone metrics listener, when the
/// service exposes `/metrics` on a separate port rather than folding it
/// into the main router. Unused by default; both data-plane services serve
/// `/metrics` from their primary router instead.
#[derive(Debug, Clone, Copy)]
pub struct MetricsListenAddr(pub SocketAddr);

/// Metric name constants so call sites can't typo a name that a dashboard
/// or alert already depends on.
pub mod metric_names {
    /// Histogram: wall-clock time to fully process and acknowledge an
    /// inbound ingress request, in seconds.
    pub const PROCESS_DURATION: &str = "process.duration";
    /// Histogram: wall-clock time from trigger dispatch to subscriber
    /// response, in seconds.
    pub const DISPATCH_DURATION: &str = "dispatch.duration";
}
