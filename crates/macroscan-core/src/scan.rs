//! Full-universe scan: fetch, derive, rank, and summarise.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::data_source::SeriesSource;
use crate::retry::{Fetched, RetryFailure, RetryMode, RetryingFetcher};
use crate::{
    validate_universe, AssetClass, CredentialRotator, InstrumentDescriptor, Lookbacks,
    MacroDesignations, MacroIndicatorDeriver, MacroIndicatorSet, MomentumEngine, MomentumError,
    MomentumResult, Pacer, Symbol, ValidationError,
};

/// One instrument dropped from a scan, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentFailure {
    pub symbol: Symbol,
    pub name: String,
    pub code: String,
    pub message: String,
    /// Credentials consumed before giving up.
    pub attempts: usize,
}

impl InstrumentFailure {
    fn from_fetch(instrument: &InstrumentDescriptor, failure: RetryFailure) -> Self {
        Self {
            symbol: instrument.symbol.clone(),
            name: instrument.display_name.clone(),
            code: failure.last_error.code().to_owned(),
            message: failure.to_string(),
            attempts: failure.attempts,
        }
    }

    fn from_momentum(instrument: &InstrumentDescriptor, error: MomentumError, attempts: usize) -> Self {
        Self {
            symbol: instrument.symbol.clone(),
            name: instrument.display_name.clone(),
            code: error.code().to_owned(),
            message: error.to_string(),
            attempts,
        }
    }
}

/// Ranked scan output. Every result is complete; dropped instruments are
/// listed in `failures` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    pub long_lookback: usize,
    pub short_lookback: usize,
    /// Sorted by `momentum_long`, strongest first.
    pub results: Vec<MomentumResult>,
    #[serde(rename = "macro")]
    pub macro_indicators: MacroIndicatorSet,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<InstrumentFailure>,
}

impl ScanReport {
    /// Keeps only results in `asset_classes`; an empty filter keeps all.
    /// Ranking and macro indicators are unaffected.
    pub fn filtered(mut self, asset_classes: &[AssetClass]) -> Self {
        if !asset_classes.is_empty() {
            self.results
                .retain(|result| asset_classes.contains(&result.asset_class));
        }
        self
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn result(&self, symbol: &Symbol) -> Option<&MomentumResult> {
        self.results.iter().find(|result| &result.symbol == symbol)
    }
}

/// Drives a sequential scan over an instrument universe.
pub struct ScanAggregator {
    source: Arc<dyn SeriesSource>,
    rotator: CredentialRotator,
    pacer: Pacer,
    retry_mode: RetryMode,
    engine: MomentumEngine,
    macro_deriver: MacroIndicatorDeriver,
}

impl ScanAggregator {
    pub fn new(source: Arc<dyn SeriesSource>, rotator: CredentialRotator) -> Self {
        Self {
            source,
            rotator,
            pacer: Pacer::disabled(),
            retry_mode: RetryMode::default(),
            engine: MomentumEngine::default(),
            macro_deriver: MacroIndicatorDeriver::default(),
        }
    }

    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_retry_mode(mut self, retry_mode: RetryMode) -> Self {
        self.retry_mode = retry_mode;
        self
    }

    pub fn with_lookbacks(mut self, lookbacks: Lookbacks) -> Self {
        self.engine = MomentumEngine::new(lookbacks);
        self
    }

    pub fn with_designations(mut self, designations: MacroDesignations) -> Self {
        self.macro_deriver = MacroIndicatorDeriver::new(designations);
        self
    }

    pub fn lookbacks(&self) -> Lookbacks {
        self.engine.lookbacks()
    }

    /// Fetches one instrument with credential rotation seeded at `seed`.
    pub async fn fetch_series(
        &self,
        instrument: &InstrumentDescriptor,
        seed: usize,
    ) -> Result<Fetched, RetryFailure> {
        RetryingFetcher::new(self.source.as_ref(), &self.rotator, self.retry_mode)
            .fetch_with_retry(instrument, seed)
            .await
    }

    /// Scans `instruments` in order. Only an invalid universe fails the scan;
    /// per-instrument problems are recorded in [`ScanReport::failures`].
    pub async fn run_scan(
        &self,
        instruments: &[InstrumentDescriptor],
    ) -> Result<ScanReport, ValidationError> {
        validate_universe(instruments)?;
        let lookbacks = self.engine.lookbacks();

        let mut results = Vec::with_capacity(instruments.len());
        let mut failures = Vec::new();

        for (index, instrument) in instruments.iter().enumerate() {
            self.pacer.wait().await;

            match self.scan_one(instrument, index % self.rotator.len()).await {
                Ok(result) => {
                    info!(
                        symbol = %result.symbol,
                        momentum = result.momentum_long,
                        trend = %result.trend,
                        state = %result.state,
                        "instrument scanned"
                    );
                    results.push(result);
                }
                Err(failure) => {
                    warn!(
                        symbol = %failure.symbol,
                        code = %failure.code,
                        attempts = failure.attempts,
                        "instrument dropped: {}",
                        failure.message
                    );
                    failures.push(failure);
                }
            }
        }

        results.sort_by(|left, right| right.momentum_long.total_cmp(&left.momentum_long));
        let macro_indicators = self.macro_deriver.derive(&results);

        Ok(ScanReport {
            generated_at: OffsetDateTime::now_utc(),
            long_lookback: lookbacks.long(),
            short_lookback: lookbacks.short(),
            results,
            macro_indicators,
            failures,
        })
    }

    async fn scan_one(
        &self,
        instrument: &InstrumentDescriptor,
        seed: usize,
    ) -> Result<MomentumResult, InstrumentFailure> {
        let Fetched { series, attempts } = self
            .fetch_series(instrument, seed)
            .await
            .map_err(|failure| InstrumentFailure::from_fetch(instrument, failure))?;

        let required = self.engine.lookbacks().min_history();
        if series.len() < required {
            return Err(InstrumentFailure::from_momentum(
                instrument,
                MomentumError::InsufficientHistory {
                    required,
                    available: series.len(),
                },
                attempts,
            ));
        }

        self.engine
            .derive(instrument, &series)
            .map_err(|error| InstrumentFailure::from_momentum(instrument, error, attempts))
    }
}
