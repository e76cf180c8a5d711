mod history;
mod positioning;
mod scan;
mod universe;

use std::sync::Arc;
use std::time::Instant;

use macroscan_core::{
    AlphaVantageSource, Envelope, EnvelopeError, EnvelopeMeta, HttpClient, ProviderId,
    ReqwestHttpClient, ScanConfig, SeriesSource,
};
use serde_json::Value;
use uuid::Uuid;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// Column-oriented view used by the table and CSV renderers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Summary lines printed under the table in table format.
    pub footer: Vec<String>,
}

impl TextTable {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            footer: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn push_footer(&mut self, line: impl Into<String>) {
        self.footer.push(line.into());
    }
}

#[derive(Debug)]
pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub source_chain: Vec<ProviderId>,
    pub table: Option<TextTable>,
}

impl CommandResult {
    pub fn ok(data: Value, source_chain: Vec<ProviderId>) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
            source_chain,
            table: None,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_table(mut self, table: TextTable) -> Self {
        self.table = Some(table);
        self
    }
}

/// A finished command: the envelope plus an optional tabular view.
pub struct Outcome {
    pub envelope: Envelope<Value>,
    pub table: Option<TextTable>,
}

pub async fn run(cli: &Cli) -> Result<Outcome, CliError> {
    let config = load_config(cli)?;
    let started = Instant::now();

    let command_result = match &cli.command {
        Command::Scan(args) => scan::run(args, config).await?,
        Command::History(args) => history::run(args, &config).await?,
        Command::Positioning(args) => positioning::run(args, &config).await?,
        Command::Universe => universe::run(&config)?,
    };

    let CommandResult {
        data,
        warnings,
        errors,
        source_chain,
        table,
    } = command_result;

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let meta = EnvelopeMeta::new(request_id(), source_chain, latency_ms)?.with_warnings(warnings);
    let envelope = Envelope::new(meta, data).with_errors(errors)?;
    Ok(Outcome { envelope, table })
}

impl Outcome {
    /// Exit verdict once the envelope has been written.
    ///
    /// Strict mode fails on any warning or error; otherwise only errors
    /// (a partial result) fail.
    pub fn verdict(&self, strict: bool) -> Result<(), CliError> {
        let envelope = &self.envelope;
        if strict && !envelope.is_clean() {
            return Err(CliError::StrictModeViolation {
                warning_count: envelope.meta.warnings.len(),
                error_count: envelope.errors.len(),
            });
        }
        if envelope.has_errors() {
            return Err(CliError::PartialResult {
                error_count: envelope.errors.len(),
            });
        }
        Ok(())
    }
}

fn request_id() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

fn load_config(cli: &Cli) -> Result<ScanConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => ScanConfig::load(path)?,
        None => ScanConfig::default(),
    };
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    Ok(config)
}

pub(crate) fn http_client() -> Result<Arc<dyn HttpClient>, CliError> {
    let client = ReqwestHttpClient::new().map_err(|error| CliError::Command(error.to_string()))?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

pub(crate) fn series_source(config: &ScanConfig) -> Result<Arc<dyn SeriesSource>, CliError> {
    let source = AlphaVantageSource::new(http_client()?)
        .with_endpoints(config.endpoint_table()?)
        .with_timeout_ms(config.timeout_ms);
    Ok(Arc::new(source))
}
