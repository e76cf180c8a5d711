use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use super::decode_json;
use crate::data_source::{FetchError, PositioningSource};
use crate::domain::parse_date_prefix;
use crate::http_client::{HttpClient, HttpRequest, DEFAULT_TIMEOUT_MS};
use crate::{OpenInterest, PositioningRecord, ProviderId};

/// Legacy futures-only Commitments of Traders dataset on the CFTC Socrata API.
pub const CFTC_LEGACY_FUTURES_URL: &str = "https://publicreporting.cftc.gov/resource/6dca-aqww.json";

const MARKET_FIELD: &str = "market_and_exchange_names";
const DATE_FIELD: &str = "report_date_as_yyyy_mm_dd";

const GROUP_FIELDS: [(&str, &str); 3] = [
    ("noncomm_positions_long_all", "noncomm_positions_short_all"),
    ("comm_positions_long_all", "comm_positions_short_all"),
    ("nonrept_positions_long_all", "nonrept_positions_short_all"),
];

/// CFTC public-reporting adapter. Needs no credential.
#[derive(Clone)]
pub struct CftcPositioningSource {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    timeout_ms: u64,
}

impl CftcPositioningSource {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            base_url: CFTC_LEGACY_FUTURES_URL.to_owned(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// SoQL query: case-insensitive market substring, newest first.
    pub fn query_url(&self, market_key: &str, limit: usize) -> String {
        let needle = market_key.trim().to_ascii_uppercase().replace('\'', "''");
        let filter = format!("upper({MARKET_FIELD}) like '%{needle}%'");
        format!(
            "{}?$where={}&$order={}&$limit={limit}",
            self.base_url,
            urlencoding::encode(&filter),
            urlencoding::encode(&format!("{DATE_FIELD} DESC")),
        )
    }

    async fn fetch(&self, market_key: &str, limit: usize) -> Result<Vec<PositioningRecord>, FetchError> {
        let url = self.query_url(market_key, limit);
        debug!(market = market_key, limit, "requesting positioning reports");

        let request = HttpRequest::get(url)
            .with_header("accept", "application/json")
            .with_timeout_ms(self.timeout_ms);
        let payload = decode_json(ProviderId::Cftc, self.http_client.execute(request).await)?;
        parse_reports(&payload)
    }
}

impl PositioningSource for CftcPositioningSource {
    fn id(&self) -> ProviderId {
        ProviderId::Cftc
    }

    fn fetch_positioning<'a>(
        &'a self,
        market_key: &'a str,
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PositioningRecord>, FetchError>> + Send + 'a>> {
        Box::pin(self.fetch(market_key, limit))
    }
}

/// Maps Socrata rows to positioning records. An empty array is a valid
/// answer for a market with no reports.
pub fn parse_reports(payload: &Value) -> Result<Vec<PositioningRecord>, FetchError> {
    let rows = payload
        .as_array()
        .ok_or_else(|| FetchError::schema_missing("cftc payload is not an array of reports"))?;

    rows.iter().map(parse_row).collect()
}

fn parse_row(row: &Value) -> Result<PositioningRecord, FetchError> {
    let row = row
        .as_object()
        .ok_or_else(|| FetchError::schema_missing("cftc report row is not an object"))?;

    let market = row
        .get(MARKET_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| FetchError::schema_missing(format!("cftc row is missing '{MARKET_FIELD}'")))?;
    let date = row
        .get(DATE_FIELD)
        .and_then(Value::as_str)
        .and_then(parse_date_prefix)
        .ok_or_else(|| FetchError::schema_missing(format!("cftc row has no valid '{DATE_FIELD}'")))?;

    let [speculative, commercial, non_reportable] = GROUP_FIELDS.map(|(long, short)| {
        Ok::<_, FetchError>(OpenInterest::new(count(row, long)?, count(row, short)?))
    });

    Ok(PositioningRecord {
        market: market.trim().to_owned(),
        date,
        speculative: speculative?,
        commercial: commercial?,
        non_reportable: non_reportable?,
    })
}

fn count(row: &Map<String, Value>, field: &str) -> Result<i64, FetchError> {
    let value = row
        .get(field)
        .ok_or_else(|| FetchError::field_not_found(format!("cftc row is missing '{field}'")))?;

    let parsed = match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| FetchError::field_not_found(format!("cftc field '{field}' is not an integer")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::FetchErrorKind;
    use crate::http_client::{HttpError, HttpResponse};
    use serde_json::json;
    use std::sync::Mutex;
    use time::macros::date;

    struct RecordingHttpClient {
        response: HttpResponse,
        urls: Mutex<Vec<String>>,
    }

    impl HttpClient for RecordingHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.urls
                .lock()
                .expect("url log should not be poisoned")
                .push(request.url);
            let response = self.response.clone();
            Box::pin(async move { Ok(response) })
        }
    }

    fn gold_row(date: &str, noncomm_long: &str) -> Value {
        json!({
            "market_and_exchange_names": "GOLD - COMMODITY EXCHANGE INC. ",
            "report_date_as_yyyy_mm_dd": date,
            "noncomm_positions_long_all": noncomm_long,
            "noncomm_positions_short_all": "60000",
            "comm_positions_long_all": "50000",
            "comm_positions_short_all": "250000",
            "nonrept_positions_long_all": 30000,
            "nonrept_positions_short_all": "20000"
        })
    }

    #[tokio::test]
    async fn fetches_and_maps_groups() {
        let client = Arc::new(RecordingHttpClient {
            response: HttpResponse::ok_json(
                json!([gold_row("2024-06-25T00:00:00.000", "260000")]).to_string(),
            ),
            urls: Mutex::new(Vec::new()),
        });
        let source = CftcPositioningSource::new(client.clone());

        let records = source
            .fetch_positioning("gold", 10)
            .await
            .expect("reports should parse");

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.market, "GOLD - COMMODITY EXCHANGE INC.");
        assert_eq!(record.date, date!(2024 - 06 - 25));
        assert_eq!(record.net_speculative(), 200_000);
        assert_eq!(record.net_commercial(), -200_000);
        assert_eq!(record.net_non_reportable(), 10_000);

        let urls = client.urls.lock().expect("url log");
        assert!(urls[0].contains("%25GOLD%25"));
        assert!(urls[0].ends_with("&$limit=10"));
    }

    #[test]
    fn query_escapes_quotes_in_market_key() {
        let source = CftcPositioningSource::new(Arc::new(RecordingHttpClient {
            response: HttpResponse::ok_json("[]"),
            urls: Mutex::new(Vec::new()),
        }));
        let url = source.query_url("o'hare", 5);
        assert!(url.contains(&*urlencoding::encode("'%O''HARE%'")));
    }

    #[test]
    fn empty_array_is_not_an_error() {
        assert_eq!(parse_reports(&json!([])), Ok(Vec::new()));
    }

    #[test]
    fn classifies_malformed_payloads() {
        let not_array = parse_reports(&json!({"error": true})).expect_err("object payload");
        assert_eq!(not_array.kind(), FetchErrorKind::SchemaMissing);

        let bad_count = parse_reports(&json!([gold_row("2024-06-25", "lots")]))
            .expect_err("non-integer count");
        assert_eq!(bad_count.kind(), FetchErrorKind::FieldNotFound);

        let bad_date = parse_reports(&json!([gold_row("25/06/2024", "1")])).expect_err("bad date");
        assert_eq!(bad_date.kind(), FetchErrorKind::SchemaMissing);
    }
}
