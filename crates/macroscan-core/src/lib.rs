//! # Macroscan Core
//!
//! Resilient series retrieval and momentum derivation for a macro/market
//! momentum scanner.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Alpha Vantage series and CFTC positioning adapters |
//! | [`config`] | Scan configuration and built-in universe |
//! | [`credentials`] | API key rotation |
//! | [`data_source`] | Source traits and fetch outcome classification |
//! | [`domain`] | Symbols, instruments, price series |
//! | [`envelope`] | Response envelope with metadata |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP client abstraction |
//! | [`macro_indicators`] | Yield-curve, volatility and inflation indicators |
//! | [`momentum`] | Momentum, trend and acceleration state |
//! | [`positioning`] | COT positioning history and z-score statistics |
//! | [`provider_policy`] | Per-asset-class endpoint strategies |
//! | [`report`] | Row flattening and CSV export |
//! | [`retry`] | Credential-rotating retry |
//! | [`scan`] | Full-universe scan aggregation |
//! | [`source`] | Provider identifiers |
//! | [`throttling`] | Inter-request pacing |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ ScanAggregator  │──────────────┐
//! └────────┬────────┘              ▼
//!          │              ┌──────────────────┐
//!          │              │ MacroIndicator   │
//!          ▼              │ Deriver          │
//! ┌─────────────────┐     └──────────────────┘
//! │ RetryingFetcher │────▶ CredentialRotator
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ SeriesSource    │────▶│ HTTP Client      │
//! │ (Alpha Vantage) │     │ (reqwest)        │
//! └────────┬────────┘     └──────────────────┘
//!          ▼
//! ┌─────────────────┐
//! │ MomentumEngine  │
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Only configuration problems fail a scan. Fetch and derivation problems
//! drop the affected instrument and are reported in [`ScanReport::failures`]:
//!
//! ```rust
//! use macroscan_core::{FetchError, FetchErrorKind};
//!
//! fn describe(error: &FetchError) -> &'static str {
//!     match error.kind() {
//!         FetchErrorKind::RateLimited => "try the next credential",
//!         _ => "drop the instrument",
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - API keys are read from environment variables only
//! - Request URLs are logged with `apikey` values masked
//! - All HTTP requests use TLS via rustls

pub mod adapters;
pub mod config;
pub mod credentials;
pub mod data_source;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod http_client;
pub mod macro_indicators;
pub mod momentum;
pub mod positioning;
pub mod provider_policy;
pub mod report;
pub mod retry;
pub mod scan;
pub mod source;
pub mod throttling;

// Adapter implementations
pub use adapters::{AlphaVantageSource, CftcPositioningSource};

// Configuration
pub use config::{default_universe, ScanConfig};

// Credentials
pub use credentials::{Credential, CredentialRotator, API_KEYS_ENV};

// Source traits and outcomes
pub use data_source::{FetchError, FetchErrorKind, PositioningSource, SeriesSource};

// Domain models
pub use domain::{validate_universe, AssetClass, InstrumentDescriptor, PricePoint, PriceSeries, Symbol};

// Envelope types
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta};

// Error types
pub use error::{CoreError, ValidationError};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpFailure, HttpRequest, HttpResponse, ReqwestHttpClient,
};

// Derivation engines
pub use macro_indicators::{
    CurveShape, InflationTrend, MacroDesignations, MacroIndicatorDeriver, MacroIndicatorSet,
    VolatilityRegime,
};
pub use momentum::{
    moving_average, Lookbacks, MomentumEngine, MomentumError, MomentumResult, MomentumState, Trend,
};
pub use positioning::{
    stats as positioning_stats, Bands, NetPoint, OpenInterest, ParticipantGroup,
    PositioningError, PositioningHistory, PositioningRecord, PositioningStats,
};

// Endpoint strategies
pub use provider_policy::{EndpointTable, SeriesEndpoint, SeriesShape};

// Reports
pub use report::{csv_field, default_export_name, write_csv, ReportRow};
pub use scan::{InstrumentFailure, ScanAggregator, ScanReport};

// Retry logic
pub use retry::{Fetched, RetryFailure, RetryMode, RetryingFetcher};

// Provider identifiers
pub use source::ProviderId;

// Throttling
pub use throttling::Pacer;
