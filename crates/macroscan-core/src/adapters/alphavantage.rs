use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{Map, Value};
use time::Date;
use tracing::debug;

use super::decode_json;
use crate::data_source::{FetchError, SeriesSource};
use crate::domain::parse_date_prefix;
use crate::http_client::{HttpClient, HttpRequest, DEFAULT_TIMEOUT_MS};
use crate::provider_policy::{EndpointTable, SeriesEndpoint, SeriesShape};
use crate::{Credential, InstrumentDescriptor, PricePoint, PriceSeries, ProviderId};

/// Top-level keys Alpha Vantage uses to return a notice instead of data.
const ADVISORY_KEYS: [&str; 2] = ["Note", "Information"];

/// Provider marker for a missing observation (holidays in Treasury rows).
const MISSING_VALUE: &str = ".";

const ROW_DATE_FIELD: &str = "date";

/// Alpha Vantage daily series adapter.
///
/// One call per [`SeriesSource::fetch_series`]; the endpoint is chosen from
/// the [`EndpointTable`] by asset class.
#[derive(Clone)]
pub struct AlphaVantageSource {
    http_client: Arc<dyn HttpClient>,
    endpoints: EndpointTable,
    timeout_ms: u64,
}

impl AlphaVantageSource {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            endpoints: EndpointTable::alphavantage_default(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_endpoints(mut self, endpoints: EndpointTable) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    async fn fetch(
        &self,
        instrument: &InstrumentDescriptor,
        credential: &Credential,
    ) -> Result<PriceSeries, FetchError> {
        let endpoint = self.endpoints.resolve(instrument.asset_class).ok_or_else(|| {
            FetchError::schema_missing(format!(
                "no endpoint configured for asset class {}",
                instrument.asset_class
            ))
        })?;

        let request = HttpRequest::get(endpoint.url(instrument.symbol.as_str(), credential.token()))
            .with_timeout_ms(self.timeout_ms);
        debug!(
            symbol = %instrument.symbol,
            credential = credential.position(),
            url = %request.redacted_url(),
            "requesting series"
        );

        let payload = decode_json(
            ProviderId::Alphavantage,
            self.http_client.execute(request).await,
        )?;

        normalize_series(&payload, endpoint)
    }
}

impl SeriesSource for AlphaVantageSource {
    fn id(&self) -> ProviderId {
        ProviderId::Alphavantage
    }

    fn fetch_series<'a>(
        &'a self,
        instrument: &'a InstrumentDescriptor,
        credential: &'a Credential,
    ) -> Pin<Box<dyn Future<Output = Result<PriceSeries, FetchError>> + Send + 'a>> {
        Box::pin(self.fetch(instrument, credential))
    }
}

/// Reduces a provider payload to a closing-price series.
///
/// Classification order: advisory notice, missing series key, missing or
/// unparseable close field.
pub fn normalize_series(payload: &Value, endpoint: &SeriesEndpoint) -> Result<PriceSeries, FetchError> {
    let object = payload
        .as_object()
        .ok_or_else(|| FetchError::schema_missing("payload is not a JSON object"))?;

    if let Some(notice) = ADVISORY_KEYS.iter().find_map(|key| object.get(*key)) {
        return Err(FetchError::rate_limited(format!(
            "provider advisory: {}",
            notice.as_str().unwrap_or("<non-text notice>")
        )));
    }

    let series = object.get(&endpoint.series_key).ok_or_else(|| {
        FetchError::schema_missing(format!("expected key '{}' is absent", endpoint.series_key))
    })?;

    let entries = match endpoint.shape {
        SeriesShape::DatedMap => dated_map_entries(series)?,
        SeriesShape::DatedRows => dated_row_entries(series)?,
    };

    let (_, latest_fields) = entries
        .iter()
        .max_by_key(|(date, _)| *date)
        .ok_or_else(|| FetchError::schema_missing("series contains no dated entries"))?;

    let close_field = latest_fields
        .keys()
        .find(|name| name.as_str() != ROW_DATE_FIELD && endpoint.matches_field(name))
        .ok_or_else(|| {
            FetchError::field_not_found(format!(
                "no field containing '{}' in the latest entry",
                endpoint.field_probe
            ))
        })?;

    let mut points = Vec::with_capacity(entries.len());
    for (date, fields) in &entries {
        let raw = fields.get(close_field).ok_or_else(|| {
            FetchError::field_not_found(format!("entry {date} has no '{close_field}' field"))
        })?;
        if let Some(close) = parse_price(raw, *date, close_field)? {
            let point = PricePoint::new(*date, close).map_err(|error| {
                FetchError::field_not_found(format!("entry {date}: {error}"))
            })?;
            points.push(point);
        }
    }

    PriceSeries::from_points(points).map_err(|_| {
        FetchError::field_not_found(format!("every '{close_field}' value is missing"))
    })
}

fn dated_map_entries(series: &Value) -> Result<Vec<(Date, &Map<String, Value>)>, FetchError> {
    let map = series
        .as_object()
        .ok_or_else(|| FetchError::schema_missing("series is not an object keyed by date"))?;

    map.iter()
        .map(|(key, fields)| -> Result<_, FetchError> {
            let date = parse_date_prefix(key)
                .ok_or_else(|| FetchError::schema_missing(format!("unparseable date key '{key}'")))?;
            let fields = fields
                .as_object()
                .ok_or_else(|| FetchError::schema_missing(format!("entry {key} is not an object")))?;
            Ok((date, fields))
        })
        .collect()
}

fn dated_row_entries(series: &Value) -> Result<Vec<(Date, &Map<String, Value>)>, FetchError> {
    let rows = series
        .as_array()
        .ok_or_else(|| FetchError::schema_missing("series is not an array of dated rows"))?;

    rows.iter()
        .map(|row| -> Result<_, FetchError> {
            let fields = row
                .as_object()
                .ok_or_else(|| FetchError::schema_missing("series row is not an object"))?;
            let date = fields
                .get(ROW_DATE_FIELD)
                .and_then(Value::as_str)
                .and_then(parse_date_prefix)
                .ok_or_else(|| FetchError::schema_missing("series row has no parseable date"))?;
            Ok((date, fields))
        })
        .collect()
}

/// `Ok(None)` for the provider's missing-value marker.
fn parse_price(raw: &Value, date: Date, field: &str) -> Result<Option<f64>, FetchError> {
    let parsed = match raw {
        Value::Number(number) => number.as_f64(),
        Value::String(text) if text.trim() == MISSING_VALUE => return Ok(None),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed.map(Some).ok_or_else(|| {
        FetchError::field_not_found(format!("entry {date}: '{field}' is not a decimal"))
    })
}
