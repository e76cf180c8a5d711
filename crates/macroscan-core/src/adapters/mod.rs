mod alphavantage;
mod cftc;

pub use alphavantage::{normalize_series, AlphaVantageSource};
pub use cftc::{parse_reports, CftcPositioningSource, CFTC_LEGACY_FUTURES_URL};

use serde_json::Value;

use crate::data_source::FetchError;
use crate::http_client::{HttpError, HttpResponse};
use crate::ProviderId;

/// Maps a raw transport outcome to a JSON payload or a classified failure.
///
/// Status 429 is a rate limit; any other non-2xx status, a transport error,
/// or a non-JSON body is a transport failure.
fn decode_json(
    provider: ProviderId,
    outcome: Result<HttpResponse, HttpError>,
) -> Result<Value, FetchError> {
    let response = outcome
        .map_err(|error| FetchError::transport(format!("{provider} transport error: {error}")))?;

    if response.is_rate_limited() {
        return Err(FetchError::rate_limited(format!(
            "{provider} returned status 429"
        )));
    }
    if !response.is_success() {
        return Err(FetchError::transport(format!(
            "{provider} returned status {}",
            response.status
        )));
    }

    serde_json::from_str(&response.body).map_err(|error| {
        FetchError::transport(format!("{provider} returned a non-JSON body: {error}"))
    })
}
