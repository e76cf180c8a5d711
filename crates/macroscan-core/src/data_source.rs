//! Series source contract and fetch outcome classification.
//!
//! A [`SeriesSource`] performs exactly one provider call per invocation and
//! classifies every non-success into a [`FetchErrorKind`]. Retrying across
//! credentials is the job of [`crate::retry::RetryingFetcher`], not the source.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::{Credential, InstrumentDescriptor, PositioningRecord, PriceSeries, ProviderId};

/// Non-success outcome of a single provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// Provider answered with an advisory/notice instead of data.
    RateLimited,
    /// The expected top-level series key is absent.
    SchemaMissing,
    /// No close-like field, or a close value that does not parse.
    FieldNotFound,
    /// Timeout, connection failure, non-JSON body, unexpected status.
    Transport,
}

impl FetchErrorKind {
    pub const fn code(self) -> &'static str {
        match self {
            Self::RateLimited => "fetch.rate_limited",
            Self::SchemaMissing => "fetch.schema_missing",
            Self::FieldNotFound => "fetch.field_not_found",
            Self::Transport => "fetch.transport_error",
        }
    }
}

/// Structured fetch failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    kind: FetchErrorKind,
    message: String,
}

impl FetchError {
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::RateLimited, message)
    }

    pub fn schema_missing(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::SchemaMissing, message)
    }

    pub fn field_not_found(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::FieldNotFound, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Transport, message)
    }

    fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> FetchErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Whether a different credential could plausibly succeed.
    pub const fn retryable(&self) -> bool {
        matches!(self.kind, FetchErrorKind::RateLimited)
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for FetchError {}

/// One-call series provider.
///
/// Implementations must be `Send + Sync`; a scan may share one source across tasks.
pub trait SeriesSource: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Performs one provider call for `instrument` with `credential`.
    fn fetch_series<'a>(
        &'a self,
        instrument: &'a InstrumentDescriptor,
        credential: &'a Credential,
    ) -> Pin<Box<dyn Future<Output = Result<PriceSeries, FetchError>> + Send + 'a>>;
}

/// Weekly positioning report provider.
pub trait PositioningSource: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Fetches up to `limit` most recent reports for markets containing `market_key`.
    fn fetch_positioning<'a>(
        &'a self,
        market_key: &'a str,
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PositioningRecord>, FetchError>> + Send + 'a>>;
}
