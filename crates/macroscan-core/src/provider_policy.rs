//! Per-asset-class endpoint strategies.
//!
//! Each asset class maps to one [`SeriesEndpoint`]: a URL template, the
//! top-level key the series lives under, the payload shape, and the substring
//! probe used to locate the close-price field. Adding an asset class or a
//! provider family is a table change.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{AssetClass, ValidationError};

const ALPHAVANTAGE_BASE: &str = "https://www.alphavantage.co/query";

/// How dated entries are laid out under the series key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesShape {
    /// `{"2024-01-02": {"4. close": "1.09"}, ...}`
    DatedMap,
    /// `[{"date": "2024-01-02", "value": "4.25"}, ...]`
    DatedRows,
}

/// Declarative fetch strategy for one asset class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesEndpoint {
    /// URL with `{symbol}` and `{apikey}` placeholders.
    pub url_template: String,
    pub series_key: String,
    pub shape: SeriesShape,
    /// Case-insensitive substring identifying the price field.
    #[serde(default = "default_field_probe")]
    pub field_probe: String,
}

fn default_field_probe() -> String {
    String::from("close")
}

impl SeriesEndpoint {
    pub fn dated_map(url_template: impl Into<String>, series_key: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
            series_key: series_key.into(),
            shape: SeriesShape::DatedMap,
            field_probe: default_field_probe(),
        }
    }

    pub fn dated_rows(
        url_template: impl Into<String>,
        series_key: impl Into<String>,
        field_probe: impl Into<String>,
    ) -> Self {
        Self {
            url_template: url_template.into(),
            series_key: series_key.into(),
            shape: SeriesShape::DatedRows,
            field_probe: field_probe.into(),
        }
    }

    /// Expands the template; both substitutions are URL-encoded.
    pub fn url(&self, symbol: &str, api_key: &str) -> String {
        self.url_template
            .replace("{symbol}", &urlencoding::encode(symbol))
            .replace("{apikey}", &urlencoding::encode(api_key))
    }

    pub fn matches_field(&self, field_name: &str) -> bool {
        field_name
            .to_ascii_lowercase()
            .contains(&self.field_probe.to_ascii_lowercase())
    }

    fn validate(&self, asset_class: AssetClass) -> Result<(), ValidationError> {
        if !self.url_template.contains("{apikey}") {
            return Err(ValidationError::TemplateMissingKey {
                asset_class: asset_class.to_string(),
            });
        }
        Ok(())
    }
}

/// Lookup table from asset class to endpoint strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointTable {
    endpoints: BTreeMap<AssetClass, SeriesEndpoint>,
}

impl EndpointTable {
    pub fn alphavantage_default() -> Self {
        let daily = SeriesEndpoint::dated_map(
            format!(
                "{ALPHAVANTAGE_BASE}?function=TIME_SERIES_DAILY&symbol={{symbol}}&outputsize=compact&apikey={{apikey}}"
            ),
            "Time Series (Daily)",
        );

        let endpoints = BTreeMap::from([
            (
                AssetClass::Fx,
                SeriesEndpoint::dated_map(
                    format!(
                        "{ALPHAVANTAGE_BASE}?function=FX_DAILY&from_symbol={{symbol}}&to_symbol=USD&outputsize=compact&apikey={{apikey}}"
                    ),
                    "Time Series FX (Daily)",
                ),
            ),
            (
                AssetClass::Crypto,
                SeriesEndpoint::dated_map(
                    format!(
                        "{ALPHAVANTAGE_BASE}?function=DIGITAL_CURRENCY_DAILY&symbol={{symbol}}&market=USD&apikey={{apikey}}"
                    ),
                    "Time Series (Digital Currency Daily)",
                ),
            ),
            (
                AssetClass::BondYield,
                SeriesEndpoint::dated_rows(
                    format!(
                        "{ALPHAVANTAGE_BASE}?function=TREASURY_YIELD&interval=daily&maturity={{symbol}}&apikey={{apikey}}"
                    ),
                    "data",
                    "value",
                ),
            ),
            (AssetClass::Commodity, daily.clone()),
            (AssetClass::EquityIndex, daily.clone()),
            (AssetClass::MacroEtf, daily),
        ]);

        Self { endpoints }
    }

    /// Replaces the strategies named in `overrides`, keeping the rest.
    pub fn with_overrides(
        mut self,
        overrides: BTreeMap<AssetClass, SeriesEndpoint>,
    ) -> Result<Self, ValidationError> {
        for (asset_class, endpoint) in overrides {
            endpoint.validate(asset_class)?;
            self.endpoints.insert(asset_class, endpoint);
        }
        Ok(self)
    }

    pub fn resolve(&self, asset_class: AssetClass) -> Option<&SeriesEndpoint> {
        self.endpoints.get(&asset_class)
    }
}

impl Default for EndpointTable {
    fn default() -> Self {
        Self::alphavantage_default()
    }
}
