//! Machine-readable output wrapper.
//!
//! Every command answers with `{meta, data, errors}`. Per-instrument problems
//! land in `errors` next to whatever data did arrive, so a consumer can tell
//! a partial scan from a clean one without parsing log lines.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    FetchError, FetchErrorKind, InstrumentFailure, PositioningError, ProviderId, ValidationError,
};

pub const SCHEMA_VERSION: &str = "v1.0.0";

const MIN_REQUEST_ID_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub meta: EnvelopeMeta,
    pub data: T,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<EnvelopeError>,
}

impl<T> Envelope<T> {
    pub fn new(meta: EnvelopeMeta, data: T) -> Self {
        Self {
            meta,
            data,
            errors: Vec::new(),
        }
    }

    /// Attaches errors after checking that each one is well formed.
    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Result<Self, ValidationError> {
        for error in &errors {
            error.validate()?;
        }
        self.errors.extend(errors);
        Ok(self)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Neither warnings nor errors were recorded.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.meta.warnings.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    pub request_id: String,
    pub schema_version: String,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    /// Providers consulted, in call order.
    pub source_chain: Vec<ProviderId>,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl EnvelopeMeta {
    pub fn new(
        request_id: impl Into<String>,
        source_chain: Vec<ProviderId>,
        latency_ms: u64,
    ) -> Result<Self, ValidationError> {
        let request_id = request_id.into();
        if request_id.trim().len() < MIN_REQUEST_ID_LEN {
            return Err(ValidationError::InvalidRequestId);
        }
        if source_chain.is_empty() {
            return Err(ValidationError::EmptySourceChain);
        }

        Ok(Self {
            request_id,
            schema_version: SCHEMA_VERSION.to_owned(),
            generated_at: OffsetDateTime::now_utc(),
            source_chain,
            latency_ms,
            warnings: Vec::new(),
        })
    }

    pub fn with_warnings<I>(mut self, warnings: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.warnings.extend(warnings.into_iter().map(Into::into));
        self
    }

    /// Major component of the schema version, if it is `vMAJOR.MINOR.PATCH`.
    pub fn schema_major(&self) -> Option<u32> {
        let parts = self
            .schema_version
            .strip_prefix('v')?
            .split('.')
            .map(|part| part.parse::<u32>().ok())
            .collect::<Option<Vec<_>>>()?;
        match parts.as_slice() {
            [major, _, _] => Some(*major),
            _ => None,
        }
    }
}

/// One problem reported alongside (possibly partial) data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeError {
    /// Stable dotted code, e.g. `fetch.rate_limited`.
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ProviderId>,
}

impl EnvelopeError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let error = Self {
            code: code.into(),
            message: message.into(),
            symbol: None,
            retryable: None,
            source: None,
        };
        error.validate()?;
        Ok(error)
    }

    pub fn from_fetch(error: &FetchError, source: ProviderId) -> Result<Self, ValidationError> {
        Ok(Self::new(error.code(), error.message())?
            .with_retryable(error.retryable())
            .with_source(source))
    }

    /// A dropped scan instrument; only rate-limit exhaustion is worth retrying later.
    pub fn from_failure(
        failure: &InstrumentFailure,
        source: ProviderId,
    ) -> Result<Self, ValidationError> {
        let retryable = failure.code == FetchErrorKind::RateLimited.code();
        Ok(Self::new(failure.code.as_str(), failure.message.as_str())?
            .with_symbol(failure.symbol.as_str())
            .with_retryable(retryable)
            .with_source(source))
    }

    /// A positioning query that cannot be answered as asked; not retryable.
    pub fn from_positioning(error: &PositioningError) -> Result<Self, ValidationError> {
        Ok(Self::new(error.code(), error.to_string())?.with_retryable(false))
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    pub fn with_source(mut self, source: ProviderId) -> Self {
        self.source = Some(source);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.code.trim().is_empty() {
            return Err(ValidationError::EmptyErrorCode);
        }
        if self.message.trim().is_empty() {
            return Err(ValidationError::EmptyErrorMessage);
        }
        Ok(())
    }
}
