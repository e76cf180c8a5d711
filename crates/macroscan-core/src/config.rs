//! Scan configuration: optional JSON file plus built-in defaults.
//!
//! Credentials are never stored in the file; it only names the environment
//! variable that carries them.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::credentials::API_KEYS_ENV;
use crate::http_client::DEFAULT_TIMEOUT_MS;
use crate::momentum::{DEFAULT_LONG_LOOKBACK, DEFAULT_SHORT_LOOKBACK};
use crate::{
    validate_universe, AssetClass, CoreError, CredentialRotator, EndpointTable,
    InstrumentDescriptor, Lookbacks, MacroDesignations, Pacer, RetryMode, SeriesEndpoint, Symbol,
    ValidationError,
};

pub const DEFAULT_PACING_MS: u64 = 1_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    pub credentials_env: String,
    pub universe: Vec<InstrumentDescriptor>,
    pub long_lookback: usize,
    pub short_lookback: usize,
    pub pacing_ms: u64,
    pub timeout_ms: u64,
    pub retry_mode: RetryMode,
    pub designations: MacroDesignations,
    /// Per-class replacements for the built-in endpoint strategies.
    pub endpoints: BTreeMap<AssetClass, SeriesEndpoint>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            credentials_env: API_KEYS_ENV.to_owned(),
            universe: default_universe(),
            long_lookback: DEFAULT_LONG_LOOKBACK,
            short_lookback: DEFAULT_SHORT_LOOKBACK,
            pacing_ms: DEFAULT_PACING_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry_mode: RetryMode::default(),
            designations: MacroDesignations::default(),
            endpoints: BTreeMap::new(),
        }
    }
}

impl ScanConfig {
    /// Reads a JSON config file; omitted fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = fs::read_to_string(path)?;
        let config = serde_json::from_str::<Self>(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_universe(&self.universe)?;
        self.lookbacks()?;
        self.endpoint_table()?;
        Ok(())
    }

    pub fn lookbacks(&self) -> Result<Lookbacks, ValidationError> {
        Lookbacks::new(self.long_lookback, self.short_lookback)
    }

    pub fn endpoint_table(&self) -> Result<EndpointTable, ValidationError> {
        EndpointTable::alphavantage_default().with_overrides(self.endpoints.clone())
    }

    pub fn pacer(&self) -> Pacer {
        Pacer::from_millis(self.pacing_ms)
    }

    /// Loads the rotation set from the configured environment variable.
    pub fn credentials(&self) -> Result<CredentialRotator, ValidationError> {
        CredentialRotator::from_env_var(&self.credentials_env)
    }

    /// Case-insensitive lookup; also returns the universe position, which
    /// seeds credential rotation exactly as a full scan would.
    pub fn find_instrument(&self, symbol: &str) -> Option<(usize, &InstrumentDescriptor)> {
        self.universe
            .iter()
            .enumerate()
            .find(|(_, instrument)| instrument.symbol.matches(symbol))
    }
}

/// Built-in universe: FX majors, Bitcoin, commodity and index ETFs, Treasury
/// yields, and an inflation proxy.
///
/// Every entry is served by the default Alpha Vantage endpoints. The MOVE
/// bond volatility index is not, so it is left out along with its
/// designation; configure both to enable the volatility regime.
pub fn default_universe() -> Vec<InstrumentDescriptor> {
    const TABLE: [(&str, &str, AssetClass); 21] = [
        ("10year", "US 10-Year Yield", AssetClass::BondYield),
        ("5year", "US 5-Year Yield", AssetClass::BondYield),
        ("RINF", "Inflation Expectations (ETF)", AssetClass::MacroEtf),
        ("EUR", "Euro (EUR/USD)", AssetClass::Fx),
        ("GBP", "British Pound (GBP/USD)", AssetClass::Fx),
        ("JPY", "Japanese Yen (JPY/USD)", AssetClass::Fx),
        ("CHF", "Swiss Franc (CHF/USD)", AssetClass::Fx),
        ("AUD", "Aust Dollar (AUD/USD)", AssetClass::Fx),
        ("NZD", "NZ Dollar (NZD/USD)", AssetClass::Fx),
        ("BTC", "Bitcoin", AssetClass::Crypto),
        ("GLD", "Gold (Proxy)", AssetClass::Commodity),
        ("SLV", "Silver", AssetClass::Commodity),
        ("CPER", "Copper", AssetClass::Commodity),
        ("USO", "Oil", AssetClass::Commodity),
        ("UUP", "Dollar Index", AssetClass::MacroEtf),
        ("SPY", "S&P 500", AssetClass::EquityIndex),
        ("DIA", "Dow Jones", AssetClass::EquityIndex),
        ("QQQ", "Nasdaq 100", AssetClass::EquityIndex),
        ("EWG", "Germany 40", AssetClass::EquityIndex),
        ("EWJ", "Japan 225", AssetClass::EquityIndex),
        ("FXI", "China Large-Cap", AssetClass::EquityIndex),
    ];

    TABLE
        .into_iter()
        .map(|(symbol, name, asset_class)| {
            InstrumentDescriptor::new(Symbol::from_static(symbol), name, asset_class)
        })
        .collect()
}
