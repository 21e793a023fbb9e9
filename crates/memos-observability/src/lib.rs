//! Tracing subscriber initialization. Grounded on the teacher's
//! `server/observability` crate, minus the OpenTelemetry/Prometheus
//! exporters it carries for its own ML pipeline — this system has no
//! equivalent collaborator to export to, so only the local subscriber
//! survives the transform.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(anyhow!("unsupported log format: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub service_name: String,
    pub log_format: LogFormat,
    pub log_level: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "memos-server".into(),
            log_format: LogFormat::Pretty,
            log_level: "info".into(),
        }
    }
}

/// Dropping this un-installs nothing (there's no exporter to flush), but it
/// exists so callers hold onto a handle the way `init_tracing` callers
/// always do, and so a future exporter has somewhere to hook in.
pub struct TracingGuard;

pub fn init_tracing(config: &TracingConfig) -> Result<TracingGuard> {
    let env_filter = EnvFilter::try_new(config.log_level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::Registry::default().with(env_filter);
    let result = match config.log_format {
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json().with_target(true)).try_init(),
    };
    result.map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))?;

    tracing::info!(service_name = %config.service_name, format = config.log_format.as_str(), "tracing initialized");
    Ok(TracingGuard)
}
