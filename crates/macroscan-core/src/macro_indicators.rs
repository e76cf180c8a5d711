//! Cross-instrument "macro health" indicators.
//!
//! Each indicator names the instrument it reads through [`MacroDesignations`].
//! A designated instrument missing from the scan omits that indicator only.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{MomentumResult, Symbol};

pub const VOLATILITY_DANGER: f64 = 120.0;
pub const VOLATILITY_CAUTION: f64 = 100.0;
pub const INFLATION_RISING: f64 = 2.0;
pub const CURVE_FLATTENING: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CurveShape {
    Inverted,
    Flattening,
    Normal,
}

impl CurveShape {
    pub fn classify(spread: f64) -> Self {
        if spread < 0.0 {
            Self::Inverted
        } else if spread < CURVE_FLATTENING {
            Self::Flattening
        } else {
            Self::Normal
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inverted => "INVERTED",
            Self::Flattening => "FLATTENING",
            Self::Normal => "NORMAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolatilityRegime {
    Danger,
    Caution,
    Stable,
}

impl VolatilityRegime {
    pub fn classify(level: f64) -> Self {
        if level > VOLATILITY_DANGER {
            Self::Danger
        } else if level > VOLATILITY_CAUTION {
            Self::Caution
        } else {
            Self::Stable
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Danger => "DANGER",
            Self::Caution => "CAUTION",
            Self::Stable => "STABLE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InflationTrend {
    Rising,
    Stable,
}

impl InflationTrend {
    pub fn classify(momentum_long: f64) -> Self {
        if momentum_long > INFLATION_RISING {
            Self::Rising
        } else {
            Self::Stable
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rising => "RISING",
            Self::Stable => "STABLE",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),+) => {
        $(impl Display for $ty {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        })+
    };
}

display_as_str!(CurveShape, VolatilityRegime, InflationTrend);

/// Symbols of the instruments each indicator reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroDesignations {
    pub yield_10y: Symbol,
    pub yield_5y: Symbol,
    /// Unset by default: the default provider does not serve a bond
    /// volatility index, so the regime is only derived when one is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volatility_index: Option<Symbol>,
    pub inflation_proxy: Symbol,
}

impl MacroDesignations {
    /// Every designated symbol, in indicator order.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> + '_ {
        [Some(&self.yield_10y), Some(&self.yield_5y)]
            .into_iter()
            .chain([self.volatility_index.as_ref(), Some(&self.inflation_proxy)])
            .flatten()
    }
}

impl Default for MacroDesignations {
    fn default() -> Self {
        Self {
            yield_10y: Symbol::from_static("10year"),
            yield_5y: Symbol::from_static("5year"),
            volatility_index: None,
            inflation_proxy: Symbol::from_static("RINF"),
        }
    }
}

/// Derived indicators; `None` marks an indicator whose source was missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroIndicatorSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yield_spread: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curve_shape: Option<CurveShape>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volatility_level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volatility_regime: Option<VolatilityRegime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inflation_momentum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inflation_trend: Option<InflationTrend>,
}

#[derive(Debug, Clone, Default)]
pub struct MacroIndicatorDeriver {
    designations: MacroDesignations,
}

impl MacroIndicatorDeriver {
    pub fn new(designations: MacroDesignations) -> Self {
        Self { designations }
    }

    pub fn designations(&self) -> &MacroDesignations {
        &self.designations
    }

    /// Yields are compared on their normalized `price_now`.
    pub fn derive(&self, results: &[MomentumResult]) -> MacroIndicatorSet {
        let find = |symbol: &Symbol| results.iter().find(|result| &result.symbol == symbol);

        let yield_spread = find(&self.designations.yield_10y)
            .zip(find(&self.designations.yield_5y))
            .map(|(ten, five)| ten.price_now - five.price_now);
        let volatility_level = self
            .designations
            .volatility_index
            .as_ref()
            .and_then(find)
            .map(|r| r.price_now);
        let inflation_momentum = find(&self.designations.inflation_proxy).map(|r| r.momentum_long);

        MacroIndicatorSet {
            yield_spread,
            curve_shape: yield_spread.map(CurveShape::classify),
            volatility_level,
            volatility_regime: volatility_level.map(VolatilityRegime::classify),
            inflation_momentum,
            inflation_trend: inflation_momentum.map(InflationTrend::classify),
        }
    }
}
