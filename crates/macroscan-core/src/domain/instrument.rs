use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Symbol, ValidationError};

/// Instrument class; selects the provider endpoint and the yield normalization rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetClass {
    Fx,
    Crypto,
    Commodity,
    EquityIndex,
    BondYield,
    MacroEtf,
}

impl AssetClass {
    pub const ALL: [Self; 6] = [
        Self::Fx,
        Self::Crypto,
        Self::Commodity,
        Self::EquityIndex,
        Self::BondYield,
        Self::MacroEtf,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fx => "FX",
            Self::Crypto => "CRYPTO",
            Self::Commodity => "COMMODITY",
            Self::EquityIndex => "EQUITY_INDEX",
            Self::BondYield => "BOND_YIELD",
            Self::MacroEtf => "MACRO_ETF",
        }
    }
}

impl Display for AssetClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fx" => Ok(Self::Fx),
            "crypto" => Ok(Self::Crypto),
            "commodity" => Ok(Self::Commodity),
            "equity_index" | "index" => Ok(Self::EquityIndex),
            "bond_yield" | "yield" => Ok(Self::BondYield),
            "macro_etf" | "etf" => Ok(Self::MacroEtf),
            other => Err(ValidationError::InvalidAssetClass {
                value: other.to_owned(),
            }),
        }
    }
}

/// Immutable description of one scanned instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentDescriptor {
    pub symbol: Symbol,
    #[serde(rename = "name")]
    pub display_name: String,
    pub asset_class: AssetClass,
}

impl InstrumentDescriptor {
    pub fn new(symbol: Symbol, display_name: impl Into<String>, asset_class: AssetClass) -> Self {
        Self {
            symbol,
            display_name: display_name.into(),
            asset_class,
        }
    }

    /// Convenience constructor for static tables.
    pub fn parse(
        symbol: &str,
        display_name: impl Into<String>,
        asset_class: AssetClass,
    ) -> Result<Self, ValidationError> {
        Ok(Self::new(Symbol::parse(symbol)?, display_name, asset_class))
    }
}

/// Validates that a universe is non-empty and free of duplicate symbols.
pub fn validate_universe(universe: &[InstrumentDescriptor]) -> Result<(), ValidationError> {
    if universe.is_empty() {
        return Err(ValidationError::EmptyUniverse);
    }

    for (index, instrument) in universe.iter().enumerate() {
        if universe[..index]
            .iter()
            .any(|other| other.symbol == instrument.symbol)
        {
            return Err(ValidationError::DuplicateInstrument {
                symbol: instrument.symbol.to_string(),
            });
        }
    }

    Ok(())
}
