//! Minimal GET transport shared by the provider adapters.
//!
//! Adapters build an [`HttpRequest`], hand it to an [`HttpClient`], and
//! classify the `{status, body}` they get back. Tests swap in canned clients;
//! production uses [`ReqwestHttpClient`].

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Deadline applied when a caller does not set one.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Query parameters whose values never reach logs.
const SECRET_PARAMS: [&str; 2] = ["apikey", "api_key"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    /// Lowercased header names.
    pub headers: BTreeMap<String, String>,
    pub timeout_ms: u64,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// The URL with credential query values masked, for logging.
    pub fn redacted_url(&self) -> String {
        let Some((base, query)) = self.url.split_once('?') else {
            return self.url.clone();
        };

        let query = query
            .split('&')
            .map(|pair| match pair.split_once('=') {
                Some((name, _)) if SECRET_PARAMS.contains(&name.to_ascii_lowercase().as_str()) => {
                    format!("{name}=***")
                }
                _ => pair.to_owned(),
            })
            .collect::<Vec<_>>()
            .join("&");
        format!("{base}?{query}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok_json(body: impl Into<String>) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    pub const fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

/// Where a transport call broke down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpFailure {
    Timeout,
    Connect,
    Body,
    Request,
}

/// Transport-level failure: no usable response arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    failure: HttpFailure,
    message: String,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::of(HttpFailure::Request, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::of(HttpFailure::Timeout, message)
    }

    pub fn of(failure: HttpFailure, message: impl Into<String>) -> Self {
        Self {
            failure,
            message: message.into(),
        }
    }

    pub const fn failure(&self) -> HttpFailure {
        self.failure
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// `GET url -> {status, body}` or a transport error.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;
}

/// reqwest-backed client; `reqwest::Client` is already reference counted.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Fails when the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("macroscan/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| {
                HttpError::of(
                    HttpFailure::Request,
                    format!("cannot build http client: {}", error.without_url()),
                )
            })?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut builder = self
            .client
            .get(&request.url)
            .timeout(Duration::from_millis(request.timeout_ms));
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|error| {
            HttpError::of(
                HttpFailure::Body,
                format!("unreadable response body: {}", error.without_url()),
            )
        })?;

        Ok(HttpResponse::with_status(status, body))
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(self.get(request))
    }
}

// `without_url` keeps credentials in the query string out of messages.
fn transport_error(error: reqwest::Error) -> HttpError {
    let failure = if error.is_timeout() {
        HttpFailure::Timeout
    } else if error.is_connect() {
        HttpFailure::Connect
    } else {
        HttpFailure::Request
    };
    HttpError::of(failure, error.without_url().to_string())
}
