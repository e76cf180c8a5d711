//! Tracing subscriber setup.
//!
//! - `MACROSCAN_LOG_FORMAT`: `compact` (default), `pretty`, or `json`
//! - `RUST_LOG`: level filter (default `info`)
//!
//! Logs go to stderr so stdout carries only command output.

use tracing_subscriber::EnvFilter;

pub const LOG_FORMAT_ENV: &str = "MACROSCAN_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|raw| raw.trim().to_ascii_lowercase()).as_deref() {
            Some("pretty") => Self::Pretty,
            Some("json") => Self::Json,
            _ => Self::Compact,
        }
    }

    pub fn from_env() -> Self {
        Self::parse(std::env::var(LOG_FORMAT_ENV).ok().as_deref())
    }
}

/// Installs the global subscriber. Call once, before any command runs.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match LogFormat::from_env() {
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}
