//! Commitment-of-Traders positioning records and z-score statistics.

use std::collections::{BTreeMap, HashSet};
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Date, Duration};

use crate::{CoreError, ValidationError};

/// Default lookback for positioning statistics, in weeks.
pub const DEFAULT_LOOKBACK_WEEKS: i64 = 52;

/// Upper bound for the lookback; a century of weekly reports.
pub const MAX_LOOKBACK_WEEKS: i64 = 5_200;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PositioningError {
    #[error("market key '{key}' matches several markets: {}", .candidates.join("; "))]
    AmbiguousMarket { key: String, candidates: Vec<String> },
}

impl PositioningError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::AmbiguousMarket { .. } => "positioning.ambiguous_market",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantGroup {
    /// Non-commercial traders ("smart money").
    #[default]
    Speculative,
    /// Producers and merchants ("hedgers").
    Commercial,
    /// Positions below reporting thresholds ("retail").
    NonReportable,
}

impl ParticipantGroup {
    pub const ALL: [Self; 3] = [Self::Speculative, Self::Commercial, Self::NonReportable];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Speculative => "speculative",
            Self::Commercial => "commercial",
            Self::NonReportable => "non_reportable",
        }
    }
}

impl Display for ParticipantGroup {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipantGroup {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "speculative" | "smart_money" | "non_commercial" => Ok(Self::Speculative),
            "commercial" | "hedgers" => Ok(Self::Commercial),
            "non_reportable" | "retail" => Ok(Self::NonReportable),
            other => Err(ValidationError::InvalidParticipantGroup {
                value: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpenInterest {
    pub long: i64,
    pub short: i64,
}

impl OpenInterest {
    pub const fn new(long: i64, short: i64) -> Self {
        Self { long, short }
    }

    pub const fn net(self) -> i64 {
        self.long - self.short
    }
}

/// One weekly report for one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositioningRecord {
    pub market: String,
    #[serde(with = "crate::domain::iso_date")]
    pub date: Date,
    pub speculative: OpenInterest,
    pub commercial: OpenInterest,
    pub non_reportable: OpenInterest,
}

impl PositioningRecord {
    pub fn group(&self, group: ParticipantGroup) -> OpenInterest {
        match group {
            ParticipantGroup::Speculative => self.speculative,
            ParticipantGroup::Commercial => self.commercial,
            ParticipantGroup::NonReportable => self.non_reportable,
        }
    }

    pub fn net(&self, group: ParticipantGroup) -> i64 {
        self.group(group).net()
    }

    pub fn net_speculative(&self) -> i64 {
        self.speculative.net()
    }

    pub fn net_commercial(&self) -> i64 {
        self.commercial.net()
    }

    pub fn net_non_reportable(&self) -> i64 {
        self.non_reportable.net()
    }

    fn matches_market(&self, market_key: &str) -> bool {
        self.market
            .to_ascii_lowercase()
            .contains(&market_key.to_ascii_lowercase())
    }
}

/// Append-only positioning store, deduplicated by `(market, date)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositioningHistory {
    records: Vec<PositioningRecord>,
}

impl PositioningHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends records not already present and returns how many were new.
    pub fn extend<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = PositioningRecord>,
    {
        let mut seen = self
            .records
            .iter()
            .map(|record| (record.market.clone(), record.date))
            .collect::<HashSet<_>>();

        let before = self.records.len();
        for record in records {
            if seen.insert((record.market.clone(), record.date)) {
                self.records.push(record);
            }
        }
        self.records.len() - before
    }

    pub fn records(&self) -> &[PositioningRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Loads a JSON history file; a missing file is an empty history.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Self::new()),
            Err(error) => return Err(error.into()),
        };

        let records = serde_json::from_str::<Vec<PositioningRecord>>(&raw)?;
        let mut history = Self::new();
        history.extend(records);
        Ok(history)
    }

    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let encoded = serde_json::to_string_pretty(&self.records)?;
        fs::write(path, encoded)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetPoint {
    #[serde(with = "crate::domain::iso_date")]
    pub date: Date,
    pub net: i64,
}

/// Constant ±1σ and ±2σ levels around the window mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bands {
    pub lower_2: f64,
    pub lower_1: f64,
    pub mean: f64,
    pub upper_1: f64,
    pub upper_2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositioningStats {
    /// Report name of the selected market.
    pub market: String,
    pub group: ParticipantGroup,
    pub mean: f64,
    /// Sample standard deviation (N−1); zero for a single observation.
    pub std_dev: f64,
    pub latest_net: i64,
    /// Undefined when the window has no dispersion.
    pub z_score: Option<f64>,
    /// Window observations, oldest first.
    pub points: Vec<NetPoint>,
}

impl PositioningStats {
    pub fn bands(&self) -> Bands {
        Bands {
            lower_2: self.mean - 2.0 * self.std_dev,
            lower_1: self.mean - self.std_dev,
            mean: self.mean,
            upper_1: self.mean + self.std_dev,
            upper_2: self.mean + 2.0 * self.std_dev,
        }
    }
}

/// Window statistics for `group` on the single market selected by
/// `market_key` among records dated within `lookback` of `today`.
///
/// A market whose name equals the key (ignoring case) is selected outright;
/// otherwise the key must be a substring of exactly one market name.
/// Returns `Ok(None)` when no record falls inside the window.
pub fn stats(
    history: &[PositioningRecord],
    market_key: &str,
    lookback: Duration,
    group: ParticipantGroup,
    today: Date,
) -> Result<Option<PositioningStats>, PositioningError> {
    let cutoff = today.checked_sub(lookback).unwrap_or(Date::MIN);
    let in_window = history
        .iter()
        .filter(|record| record.date >= cutoff && record.matches_market(market_key))
        .collect::<Vec<_>>();

    let Some(market) = select_market(&in_window, market_key)? else {
        return Ok(None);
    };

    let mut points = in_window
        .iter()
        .filter(|record| record.market.trim().eq_ignore_ascii_case(&market))
        .map(|record| NetPoint {
            date: record.date,
            net: record.net(group),
        })
        .collect::<Vec<_>>();
    points.sort_by_key(|point| point.date);

    let Some(latest_net) = points.last().map(|point| point.net) else {
        return Ok(None);
    };
    let count = points.len() as f64;
    let mean = points.iter().map(|point| point.net as f64).sum::<f64>() / count;
    let std_dev = if points.len() > 1 {
        let squares = points
            .iter()
            .map(|point| (point.net as f64 - mean).powi(2))
            .sum::<f64>();
        (squares / (count - 1.0)).sqrt()
    } else {
        0.0
    };

    let z_score = (std_dev > 0.0).then(|| (latest_net as f64 - mean) / std_dev);

    Ok(Some(PositioningStats {
        market,
        group,
        mean,
        std_dev,
        latest_net,
        z_score,
        points,
    }))
}

fn select_market(
    records: &[&PositioningRecord],
    market_key: &str,
) -> Result<Option<String>, PositioningError> {
    // keyed by upper-cased name so case variants of one market collapse
    let mut candidates = BTreeMap::new();
    for record in records {
        let name = record.market.trim();
        candidates
            .entry(name.to_ascii_uppercase())
            .or_insert_with(|| name.to_owned());
    }

    let key = market_key.trim();
    if let Some(exact) = candidates.get(&key.to_ascii_uppercase()) {
        return Ok(Some(exact.clone()));
    }

    match candidates.len() {
        0 | 1 => Ok(candidates.into_values().next()),
        _ => Err(PositioningError::AmbiguousMarket {
            key: key.to_owned(),
            candidates: candidates.into_values().collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn record(market: &str, date: Date, spec_net: i64) -> PositioningRecord {
        PositioningRecord {
            market: market.to_owned(),
            date,
            speculative: OpenInterest::new(100 + spec_net, 100),
            commercial: OpenInterest::new(50, 80),
            non_reportable: OpenInterest::new(10, 5),
        }
    }

    #[test]
    fn derives_net_per_group() {
        let row = record("GOLD - COMMODITY EXCHANGE INC.", date!(2024 - 06 - 25), 40);
        assert_eq!(row.net_speculative(), 40);
        assert_eq!(row.net_commercial(), -30);
        assert_eq!(row.net_non_reportable(), 5);
        assert_eq!(row.net(ParticipantGroup::Commercial), -30);
    }

    #[test]
    fn history_dedupes_by_market_and_date() {
        let mut history = PositioningHistory::new();
        let first = history.extend([
            record("GOLD", date!(2024 - 06 - 18), 1),
            record("GOLD", date!(2024 - 06 - 25), 2),
        ]);
        let second = history.extend([
            record("GOLD", date!(2024 - 06 - 25), 99),
            record("SILVER", date!(2024 - 06 - 25), 3),
        ]);

        assert_eq!((first, second), (2, 1));
        assert_eq!(history.len(), 3);
        assert_eq!(history.records()[1].net_speculative(), 2);
    }

    #[test]
    fn window_excludes_old_records_and_other_markets() {
        let today = date!(2024 - 07 - 01);
        let history = vec![
            record("GOLD", date!(2023 - 01 - 03), 500),
            record("SILVER", date!(2024 - 06 - 25), 500),
            record("GOLD", date!(2024 - 06 - 11), 10),
            record("gold", date!(2024 - 06 - 18), 20),
            record("GOLD", date!(2024 - 06 - 25), 30),
        ];

        let stats = stats(&history, "Gold", Duration::weeks(52), ParticipantGroup::Speculative, today)
            .expect("case variants are one market")
            .expect("three records in window");

        assert_eq!(stats.market, "GOLD");
        assert_eq!(stats.points.len(), 3);
        assert!((stats.mean - 20.0).abs() < 1e-9);
        assert!((stats.std_dev - 10.0).abs() < 1e-9);
        assert!((stats.z_score.expect("defined") - 1.0).abs() < 1e-9);
        assert_eq!(stats.latest_net, 30);

        let bands = stats.bands();
        assert!((bands.upper_2 - 40.0).abs() < 1e-9);
        assert!((bands.lower_1 - 10.0).abs() < 1e-9);
    }

    #[test]
    fn single_observation_has_zero_spread_and_no_z_score() {
        let history = vec![record("GOLD", date!(2024 - 06 - 25), 30)];
        let stats = stats(
            &history,
            "GOLD",
            Duration::weeks(4),
            ParticipantGroup::Speculative,
            date!(2024 - 07 - 01),
        )
        .expect("single market")
        .expect("one record");
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.z_score, None);
    }

    #[test]
    fn empty_window_yields_nothing() {
        assert!(stats(
            &[],
            "GOLD",
            Duration::weeks(4),
            ParticipantGroup::Commercial,
            date!(2024 - 07 - 01)
        )
        .expect("nothing to disambiguate")
        .is_none());
    }

    #[test]
    fn substring_matching_two_markets_is_ambiguous() {
        let today = date!(2024 - 07 - 01);
        let history = vec![
            record("GOLD - COMMODITY EXCHANGE INC.", date!(2024 - 06 - 11), 200_000),
            record("MICRO GOLD - COMMODITY EXCHANGE INC.", date!(2024 - 06 - 11), 5_000),
            record("GOLD - COMMODITY EXCHANGE INC.", date!(2024 - 06 - 18), 210_000),
            record("MICRO GOLD - COMMODITY EXCHANGE INC.", date!(2024 - 06 - 18), 5_500),
            record("GOLD - COMMODITY EXCHANGE INC.", date!(2024 - 06 - 25), 220_000),
            record("MICRO GOLD - COMMODITY EXCHANGE INC.", date!(2024 - 06 - 25), 6_000),
        ];
        let window = Duration::weeks(52);

        let error = stats(&history, "gold", window, ParticipantGroup::Speculative, today)
            .expect_err("two gold markets");
        assert_eq!(error.code(), "positioning.ambiguous_market");
        assert_eq!(
            error,
            PositioningError::AmbiguousMarket {
                key: String::from("gold"),
                candidates: vec![
                    String::from("GOLD - COMMODITY EXCHANGE INC."),
                    String::from("MICRO GOLD - COMMODITY EXCHANGE INC."),
                ],
            }
        );

        let gold = stats(
            &history,
            "gold - commodity exchange inc.",
            window,
            ParticipantGroup::Speculative,
            today,
        )
        .expect("exact name wins")
        .expect("gold in window");
        assert_eq!(gold.points.len(), 3);
        assert_eq!(gold.latest_net, 220_000);
        assert!((gold.z_score.expect("dispersion") - 1.0).abs() < 1e-9);

        let micro = stats(&history, "micro", window, ParticipantGroup::Speculative, today)
            .expect("one micro market")
            .expect("micro in window");
        assert_eq!(micro.market, "MICRO GOLD - COMMODITY EXCHANGE INC.");
        assert_eq!(micro.latest_net, 6_000);
    }

    #[test]
    fn parses_group_aliases() {
        assert_eq!("retail".parse::<ParticipantGroup>(), Ok(ParticipantGroup::NonReportable));
        assert_eq!("non-reportable".parse::<ParticipantGroup>(), Ok(ParticipantGroup::NonReportable));
        assert_eq!("smart-money".parse::<ParticipantGroup>(), Ok(ParticipantGroup::Speculative));
        assert!("whales".parse::<ParticipantGroup>().is_err());
    }

    #[test]
    fn history_round_trips_through_a_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cot.json");

        assert!(PositioningHistory::load(&path).expect("missing is empty").is_empty());

        let mut history = PositioningHistory::new();
        history.extend([record("GOLD", date!(2024 - 06 - 25), 30)]);
        history.save(&path).expect("saved");

        assert_eq!(PositioningHistory::load(&path).expect("loaded"), history);
    }
}
