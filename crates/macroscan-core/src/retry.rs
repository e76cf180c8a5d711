//! Credential-rotating retry for a single instrument.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data_source::{FetchError, SeriesSource};
use crate::{CredentialRotator, InstrumentDescriptor, PriceSeries, ValidationError};

/// Which failed outcomes advance to the next credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryMode {
    /// Only rate-limit outcomes rotate; every other outcome is terminal.
    #[default]
    RateLimitedOnly,
    /// Rotate on every failure (legacy behaviour).
    AllFailures,
}

impl RetryMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RateLimitedOnly => "rate_limited_only",
            Self::AllFailures => "all_failures",
        }
    }

    pub fn should_rotate(self, error: &FetchError) -> bool {
        match self {
            Self::RateLimitedOnly => error.retryable(),
            Self::AllFailures => true,
        }
    }
}

impl Display for RetryMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetryMode {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "rate_limited_only" => Ok(Self::RateLimitedOnly),
            "all_failures" => Ok(Self::AllFailures),
            other => Err(ValidationError::InvalidRetryMode {
                value: other.to_owned(),
            }),
        }
    }
}

/// Successful retry result.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub series: PriceSeries,
    /// Credentials consumed, including the successful one.
    pub attempts: usize,
}

/// Every attempted credential failed, or a terminal outcome stopped rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryFailure {
    pub last_error: FetchError,
    pub attempts: usize,
    pub exhausted: bool,
}

impl Display for RetryFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.exhausted {
            write!(f, "all {} credentials failed; last: {}", self.attempts, self.last_error)
        } else {
            write!(f, "stopped after {} attempt(s): {}", self.attempts, self.last_error)
        }
    }
}

impl std::error::Error for RetryFailure {}

/// Wraps a [`SeriesSource`] with the "try every credential" policy.
///
/// Attempts are strictly sequential: each one runs only after the previous failed.
pub struct RetryingFetcher<'a, S: ?Sized> {
    source: &'a S,
    rotator: &'a CredentialRotator,
    mode: RetryMode,
}

impl<'a, S> RetryingFetcher<'a, S>
where
    S: SeriesSource + ?Sized,
{
    pub fn new(source: &'a S, rotator: &'a CredentialRotator, mode: RetryMode) -> Self {
        Self {
            source,
            rotator,
            mode,
        }
    }

    pub async fn fetch_with_retry(
        &self,
        instrument: &InstrumentDescriptor,
        seed: usize,
    ) -> Result<Fetched, RetryFailure> {
        let mut attempts = 0;
        let mut last_error = None;

        for credential in self.rotator.rotation(seed) {
            attempts += 1;
            match self.source.fetch_series(instrument, credential).await {
                Ok(series) => return Ok(Fetched { series, attempts }),
                Err(error) => {
                    debug!(
                        symbol = %instrument.symbol,
                        credential = credential.position(),
                        code = error.code(),
                        "attempt failed"
                    );
                    if !self.mode.should_rotate(&error) {
                        return Err(RetryFailure {
                            last_error: error,
                            attempts,
                            exhausted: false,
                        });
                    }
                    last_error = Some(error);
                }
            }
        }

        Err(RetryFailure {
            last_error: last_error
                .unwrap_or_else(|| FetchError::rate_limited("no credentials were attempted")),
            attempts,
            exhausted: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mode_rotates_only_on_rate_limits() {
        let mode = RetryMode::default();
        assert!(mode.should_rotate(&FetchError::rate_limited("note")));
        assert!(!mode.should_rotate(&FetchError::schema_missing("missing")));
        assert!(!mode.should_rotate(&FetchError::transport("timeout")));
    }

    #[test]
    fn legacy_mode_rotates_on_everything() {
        let mode = RetryMode::AllFailures;
        assert!(mode.should_rotate(&FetchError::field_not_found("no close")));
        assert!(mode.should_rotate(&FetchError::transport("timeout")));
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!("all-failures".parse::<RetryMode>(), Ok(RetryMode::AllFailures));
        assert_eq!(
            "rate_limited_only".parse::<RetryMode>(),
            Ok(RetryMode::RateLimitedOnly)
        );
        assert!("sometimes".parse::<RetryMode>().is_err());
    }
}
