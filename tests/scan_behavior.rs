//! Behavior-driven tests for a full momentum scan.
//!
//! These tests drive `ScanAggregator::run_scan` against a scripted source and
//! check what ends up in the report: ranking, dropped instruments, and the
//! macro summary.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use macroscan_core::{
    AssetClass, Credential, CredentialRotator, CurveShape, FetchError, InstrumentDescriptor,
    Lookbacks, MacroDesignations, MomentumState, Pacer, PricePoint, PriceSeries, ProviderId, ScanAggregator,
    SeriesSource, Symbol, Trend, ValidationError, VolatilityRegime,
};
use time::macros::date;
use time::Duration;

type Outcome = Result<PriceSeries, FetchError>;

/// Per-symbol outcome queues; records `(symbol, credential position)` per call.
#[derive(Default)]
struct ScriptedSource {
    outcomes: Mutex<HashMap<String, VecDeque<Outcome>>>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl ScriptedSource {
    fn script(self, symbol: &str, outcomes: Vec<Outcome>) -> Self {
        self.outcomes
            .lock()
            .expect("not poisoned")
            .insert(symbol.to_owned(), outcomes.into());
        self
    }

    fn calls_for(&self, symbol: &str) -> Vec<usize> {
        self.calls
            .lock()
            .expect("not poisoned")
            .iter()
            .filter(|(called, _)| called == symbol)
            .map(|(_, position)| *position)
            .collect()
    }
}

impl SeriesSource for ScriptedSource {
    fn id(&self) -> ProviderId {
        ProviderId::Fixture
    }

    fn fetch_series<'a>(
        &'a self,
        instrument: &'a InstrumentDescriptor,
        credential: &'a Credential,
    ) -> Pin<Box<dyn Future<Output = Outcome> + Send + 'a>> {
        let symbol = instrument.symbol.to_string();
        self.calls
            .lock()
            .expect("not poisoned")
            .push((symbol.clone(), credential.position()));
        let outcome = self
            .outcomes
            .lock()
            .expect("not poisoned")
            .get_mut(&symbol)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(FetchError::transport("no scripted outcome")));
        Box::pin(async move { outcome })
    }
}

/// `len` daily closes: `now` on the latest day, `past` on every earlier day.
fn series(now: f64, past: f64, len: usize) -> PriceSeries {
    let latest = date!(2024 - 06 - 28);
    let points = (0..len)
        .map(|offset| {
            let close = if offset == 0 { now } else { past };
            PricePoint::new(latest - Duration::days(offset as i64), close).expect("finite")
        })
        .collect();
    PriceSeries::from_points(points).expect("non-empty")
}

fn instrument(symbol: &str, name: &str, asset_class: AssetClass) -> InstrumentDescriptor {
    InstrumentDescriptor::parse(symbol, name, asset_class).expect("valid instrument")
}

fn aggregator(source: Arc<ScriptedSource>, credentials: usize) -> ScanAggregator {
    let rotator = CredentialRotator::new((0..credentials).map(|index| format!("key-{index}")))
        .expect("non-empty");
    ScanAggregator::new(source, rotator).with_pacer(Pacer::disabled())
}

fn symbol(raw: &str) -> Symbol {
    Symbol::parse(raw).expect("valid symbol")
}

// =============================================================================
// Ranking and partial failure
// =============================================================================

#[tokio::test]
async fn when_one_instrument_exhausts_every_credential_it_is_dropped_and_the_rest_rank() {
    // Given: A recovers on its second credential, B is always rate-limited,
    // and C succeeds on its first credential
    let source = Arc::new(
        ScriptedSource::default()
            .script(
                "AAA",
                vec![Err(FetchError::rate_limited("Note")), Ok(series(110.0, 100.0, 30))],
            )
            .script(
                "BBB",
                (0..3).map(|_| Err(FetchError::rate_limited("Note"))).collect(),
            )
            .script("CCC", vec![Ok(series(105.0, 100.0, 30))]),
    );
    let universe = vec![
        instrument("CCC", "Gamma", AssetClass::Commodity),
        instrument("BBB", "Beta", AssetClass::Fx),
        instrument("AAA", "Alpha", AssetClass::EquityIndex),
    ];

    // When: The universe is scanned with three credentials
    let report = aggregator(Arc::clone(&source), 3)
        .run_scan(&universe)
        .await
        .expect("scan completes");

    // Then: Only A and C are reported, strongest momentum first
    let ranked = report
        .results
        .iter()
        .map(|result| result.symbol.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ranked, vec!["AAA", "CCC"]);
    assert!((report.results[0].momentum_long - 10.0).abs() < 1e-9);
    assert!((report.results[1].momentum_long - 5.0).abs() < 1e-9);
    assert_eq!(report.results[0].trend, Trend::Bullish);

    // Then: B is listed as dropped after trying every credential once
    assert!(!report.is_complete());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].symbol, symbol("BBB"));
    assert_eq!(report.failures[0].code, "fetch.rate_limited");
    assert_eq!(report.failures[0].attempts, 3);

    // Then: Each instrument's rotation started at its universe position
    assert_eq!(source.calls_for("CCC"), vec![0]);
    assert_eq!(source.calls_for("BBB"), vec![1, 2, 0]);
    assert_eq!(source.calls_for("AAA"), vec![2, 0]);
}

#[tokio::test]
async fn when_a_series_is_too_short_the_instrument_is_dropped_with_a_momentum_code() {
    // Given: A ten-day series under default lookbacks (20 and 5)
    let source = Arc::new(
        ScriptedSource::default()
            .script("GLD", vec![Ok(series(190.0, 180.0, 10))])
            .script("SLV", vec![Ok(series(22.0, 20.0, 30))]),
    );
    let universe = vec![
        instrument("GLD", "Gold", AssetClass::Commodity),
        instrument("SLV", "Silver", AssetClass::Commodity),
    ];

    // When: The universe is scanned
    let report = aggregator(source, 2)
        .run_scan(&universe)
        .await
        .expect("scan completes");

    // Then: The short series is a failure, not a partial result
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.failures[0].code, "momentum.insufficient_history");
    assert_eq!(report.failures[0].attempts, 1);
}

#[tokio::test]
async fn when_lookbacks_are_overridden_the_report_records_them() {
    // Given: Long and short lookbacks of 10 and 3
    let source = Arc::new(
        ScriptedSource::default().script("QQQ", vec![Ok(series(120.0, 100.0, 13))]),
    );
    let lookbacks = Lookbacks::new(10, 3).expect("valid lookbacks");

    // When: A single instrument is scanned
    let report = aggregator(source, 1)
        .with_lookbacks(lookbacks)
        .run_scan(&[instrument("QQQ", "Nasdaq 100", AssetClass::EquityIndex)])
        .await
        .expect("scan completes");

    // Then: Thirteen points are enough and both windows see the same change
    assert_eq!((report.long_lookback, report.short_lookback), (10, 3));
    let result = &report.results[0];
    assert!((result.momentum_long - 20.0).abs() < 1e-9);
    assert_eq!(result.state, MomentumState::Decelerating);
}

// =============================================================================
// Macro summary
// =============================================================================

#[tokio::test]
async fn when_the_five_year_yield_is_missing_the_spread_is_absent_but_volatility_is_classified() {
    // Given: A ×10-quoted ten-year yield and an elevated volatility index
    let source = Arc::new(
        ScriptedSource::default()
            .script("10year", vec![Ok(series(42.5, 40.0, 30))])
            .script("^MOVE", vec![Ok(series(125.0, 100.0, 30))]),
    );
    let universe = vec![
        instrument("10year", "US 10-Year Yield", AssetClass::BondYield),
        instrument("^MOVE", "Bond Volatility", AssetClass::EquityIndex),
    ];

    // When: The universe is scanned with the volatility index designated
    let report = aggregator(source, 2)
        .with_designations(MacroDesignations {
            volatility_index: Some(symbol("^MOVE")),
            ..MacroDesignations::default()
        })
        .run_scan(&universe)
        .await
        .expect("scan completes");

    // Then: The yield is reported in percent
    let ten_year = report.result(&symbol("10year")).expect("10-year present");
    assert!((ten_year.price_now - 4.25).abs() < 1e-9);
    assert!((ten_year.momentum_long - 6.25).abs() < 1e-9);

    // Then: Only the indicators with inputs are present
    let indicators = &report.macro_indicators;
    assert_eq!(indicators.yield_spread, None);
    assert_eq!(indicators.curve_shape, None);
    assert_eq!(indicators.volatility_level, Some(125.0));
    assert_eq!(indicators.volatility_regime, Some(VolatilityRegime::Danger));
    assert_eq!(indicators.inflation_trend, None);
}

#[tokio::test]
async fn when_results_are_filtered_by_class_the_macro_summary_is_kept() {
    // Given: Both yields and an equity index
    let source = Arc::new(
        ScriptedSource::default()
            .script("10year", vec![Ok(series(4.20, 4.00, 30))])
            .script("5year", vec![Ok(series(4.30, 4.10, 30))])
            .script("SPY", vec![Ok(series(550.0, 500.0, 30))]),
    );
    let universe = vec![
        instrument("10year", "US 10-Year Yield", AssetClass::BondYield),
        instrument("5year", "US 5-Year Yield", AssetClass::BondYield),
        instrument("SPY", "S&P 500", AssetClass::EquityIndex),
    ];

    // When: The report is narrowed to equity indices
    let report = aggregator(source, 3)
        .run_scan(&universe)
        .await
        .expect("scan completes")
        .filtered(&[AssetClass::EquityIndex]);

    // Then: The yields are hidden but still drive the curve reading
    assert_eq!(report.results.len(), 1);
    let spread = report.macro_indicators.yield_spread.expect("spread");
    assert!((spread + 0.10).abs() < 1e-9);
    assert_eq!(report.macro_indicators.curve_shape, Some(CurveShape::Inverted));
}

// =============================================================================
// Universe validation
// =============================================================================

#[tokio::test]
async fn when_the_universe_repeats_a_symbol_the_scan_is_rejected_before_fetching() {
    // Given: A universe listing SPY twice
    let source = Arc::new(ScriptedSource::default());
    let universe = vec![
        instrument("SPY", "S&P 500", AssetClass::EquityIndex),
        instrument("DIA", "Dow Jones", AssetClass::EquityIndex),
        instrument("SPY", "S&P 500 again", AssetClass::EquityIndex),
    ];

    // When: The scan starts
    let error = aggregator(Arc::clone(&source), 1)
        .run_scan(&universe)
        .await
        .expect_err("duplicate symbol");

    // Then: Nothing was fetched
    assert_eq!(
        error,
        ValidationError::DuplicateInstrument {
            symbol: String::from("SPY")
        }
    );
    assert!(source.calls.lock().expect("not poisoned").is_empty());
}
