//! Point-in-time momentum, trend, and acceleration state.
//!
//! All momenta are percentages. Offsets index the most-recent-first series,
//! so `series[lookback]` is the close `lookback` observations before the latest.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::Date;

use crate::{AssetClass, InstrumentDescriptor, PriceSeries, Symbol, ValidationError};

pub const DEFAULT_LONG_LOOKBACK: usize = 20;
pub const DEFAULT_SHORT_LOOKBACK: usize = 5;
pub const MIN_LONG_LOOKBACK: usize = 6;

/// Yield feeds above this level are quoted ×10 and are scaled back down.
pub const YIELD_SCALE_THRESHOLD: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    Bullish,
    Bearish,
}

impl Trend {
    /// Zero momentum counts as bearish.
    pub fn from_momentum(momentum_long: f64) -> Self {
        if momentum_long > 0.0 {
            Self::Bullish
        } else {
            Self::Bearish
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bullish => "BULLISH",
            Self::Bearish => "BEARISH",
        }
    }
}

impl Display for Trend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MomentumState {
    Accelerating,
    Decelerating,
}

impl MomentumState {
    /// Compares absolute magnitudes of the two horizons as observed; equal
    /// magnitudes are decelerating.
    pub fn classify(momentum_long: f64, momentum_short: f64) -> Self {
        if momentum_long.abs() > momentum_short.abs() {
            Self::Accelerating
        } else {
            Self::Decelerating
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accelerating => "ACCELERATING",
            Self::Decelerating => "DECELERATING",
        }
    }
}

impl Display for MomentumState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MomentumError {
    #[error("insufficient history: need more than {required} points, have {available}")]
    InsufficientHistory { required: usize, available: usize },
    #[error("cannot derive {field}: reference price is zero or result is not finite")]
    Derivation { field: &'static str },
}

impl MomentumError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InsufficientHistory { .. } => "momentum.insufficient_history",
            Self::Derivation { .. } => "momentum.derivation_error",
        }
    }
}

/// Validated long/short lookback pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lookbacks {
    long: usize,
    short: usize,
}

impl Lookbacks {
    pub fn new(long: usize, short: usize) -> Result<Self, ValidationError> {
        if long < MIN_LONG_LOOKBACK {
            return Err(ValidationError::LongLookbackTooShort {
                value: long,
                min: MIN_LONG_LOOKBACK,
            });
        }
        if short == 0 {
            return Err(ValidationError::ZeroShortLookback);
        }
        if long <= short {
            return Err(ValidationError::LookbackOrder { long, short });
        }
        Ok(Self { long, short })
    }

    pub const fn long(self) -> usize {
        self.long
    }

    pub const fn short(self) -> usize {
        self.short
    }

    /// History a scan requires before deriving: 25 points for the 20/5 default.
    pub const fn min_history(self) -> usize {
        self.long + self.short
    }
}

impl Default for Lookbacks {
    fn default() -> Self {
        Self {
            long: DEFAULT_LONG_LOOKBACK,
            short: DEFAULT_SHORT_LOOKBACK,
        }
    }
}

/// Per-instrument momentum snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumResult {
    pub asset: String,
    pub symbol: Symbol,
    pub asset_class: AssetClass,
    #[serde(with = "crate::domain::iso_date")]
    pub as_of: Date,
    pub price_now: f64,
    pub momentum_long: f64,
    pub momentum_short: f64,
    pub trend: Trend,
    pub state: MomentumState,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MomentumEngine {
    lookbacks: Lookbacks,
}

impl MomentumEngine {
    pub fn new(lookbacks: Lookbacks) -> Self {
        Self { lookbacks }
    }

    pub fn lookbacks(&self) -> Lookbacks {
        self.lookbacks
    }

    pub fn derive(
        &self,
        instrument: &InstrumentDescriptor,
        series: &PriceSeries,
    ) -> Result<MomentumResult, MomentumError> {
        let long = self.lookbacks.long();
        let (Some(latest), Some(past_long), Some(past_short)) = (
            series.get(0),
            series.get(long),
            series.get(self.lookbacks.short()),
        ) else {
            return Err(MomentumError::InsufficientHistory {
                required: long,
                available: series.len(),
            });
        };

        let normalize = |raw: f64| normalize_price(instrument.asset_class, raw);
        let price_now = normalize(latest.close);
        let momentum_long = percent_change(price_now, normalize(past_long.close), "momentum_long")?;
        let momentum_short =
            percent_change(price_now, normalize(past_short.close), "momentum_short")?;

        Ok(MomentumResult {
            asset: instrument.display_name.clone(),
            symbol: instrument.symbol.clone(),
            asset_class: instrument.asset_class,
            as_of: latest.date,
            price_now,
            momentum_long,
            momentum_short,
            trend: Trend::from_momentum(momentum_long),
            state: MomentumState::classify(momentum_long, momentum_short),
        })
    }
}

/// Scales ×10-quoted bond yields back to percent; other classes pass through.
pub fn normalize_price(asset_class: AssetClass, raw: f64) -> f64 {
    if asset_class == AssetClass::BondYield && raw > YIELD_SCALE_THRESHOLD {
        raw / 10.0
    } else {
        raw
    }
}

pub fn percent_change(now: f64, past: f64, field: &'static str) -> Result<f64, MomentumError> {
    if past == 0.0 {
        return Err(MomentumError::Derivation { field });
    }
    let change = (now - past) / past * 100.0;
    if change.is_finite() {
        Ok(change)
    } else {
        Err(MomentumError::Derivation { field })
    }
}

/// Trailing simple moving average over the series in chronological order.
///
/// Entry `i` averages points `i + 1 - window ..= i`; earlier entries are `None`.
pub fn moving_average(series: &PriceSeries, window: usize) -> Result<Vec<Option<f64>>, ValidationError> {
    if window == 0 {
        return Err(ValidationError::ZeroWindow);
    }

    let closes = series.chronological().map(|point| point.close).collect::<Vec<_>>();
    let mut averages = Vec::with_capacity(closes.len());
    let mut running = 0.0;
    for (index, close) in closes.iter().enumerate() {
        running += close;
        if index >= window {
            running -= closes[index - window];
        }
        averages.push((index + 1 >= window).then(|| running / window as f64));
    }
    Ok(averages)
}
