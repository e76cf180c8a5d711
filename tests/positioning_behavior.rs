//! Behavior-driven tests for weekly positioning history and statistics.
//!
//! Covers the path from provider rows to a persisted history and on to the
//! z-score and band readings for a participant group.

use macroscan_core::adapters::parse_reports;
use macroscan_core::{
    positioning_stats, EnvelopeError, OpenInterest, ParticipantGroup, PositioningError,
    PositioningHistory, PositioningRecord,
};
use serde_json::json;
use time::macros::date;
use time::{Date, Duration};

const GOLD: &str = "GOLD - COMMODITY EXCHANGE INC.";

fn record(market: &str, date: Date, speculative_net: i64) -> PositioningRecord {
    PositioningRecord {
        market: market.to_owned(),
        date,
        speculative: OpenInterest::new(speculative_net, 0),
        commercial: OpenInterest::new(0, speculative_net),
        non_reportable: OpenInterest::default(),
    }
}

// =============================================================================
// Statistics
// =============================================================================

#[test]
fn when_nets_are_10_20_30_the_latest_sits_one_deviation_above_the_mean() {
    // Given: Three weekly reports with speculative nets 10, 20, 30
    let history = [
        record(GOLD, date!(2024 - 06 - 11), 10),
        record(GOLD, date!(2024 - 06 - 18), 20),
        record(GOLD, date!(2024 - 06 - 25), 30),
    ];

    // When: Statistics are computed over a 52-week window
    let stats = positioning_stats(
        &history,
        "gold",
        Duration::weeks(52),
        ParticipantGroup::Speculative,
        date!(2024 - 07 - 01),
    )
    .expect("single market")
    .expect("window has data");

    // Then: Sample deviation gives a z-score of exactly one
    assert!((stats.mean - 20.0).abs() < 1e-12);
    assert!((stats.std_dev - 10.0).abs() < 1e-12);
    assert_eq!(stats.latest_net, 30);
    assert!((stats.z_score.expect("dispersion") - 1.0).abs() < 1e-12);

    let bands = stats.bands();
    assert!((bands.upper_2 - 40.0).abs() < 1e-12);
    assert!((bands.lower_1 - 10.0).abs() < 1e-12);
}

#[test]
fn when_every_net_is_identical_the_z_score_is_undefined() {
    // Given: Four identical readings
    let history = (0..4)
        .map(|week| record(GOLD, date!(2024 - 06 - 04) + Duration::weeks(week), 500))
        .collect::<Vec<_>>();

    // When: Statistics are computed
    let stats = positioning_stats(
        &history,
        "GOLD",
        Duration::weeks(52),
        ParticipantGroup::Speculative,
        date!(2024 - 07 - 01),
    )
    .expect("single market")
    .expect("window has data");

    // Then: No dispersion means no z-score rather than a division by zero
    assert_eq!(stats.std_dev, 0.0);
    assert_eq!(stats.z_score, None);
}

#[test]
fn when_reports_fall_outside_the_window_or_market_they_are_ignored() {
    // Given: An old gold report, a recent silver report, and one recent gold report
    let history = [
        record(GOLD, date!(2023 - 01 - 03), -9_999),
        record("SILVER - COMMODITY EXCHANGE INC.", date!(2024 - 06 - 25), 7),
        record(GOLD, date!(2024 - 06 - 25), 42),
    ];

    // When: Gold statistics are computed over four weeks
    let stats = positioning_stats(
        &history,
        "gold",
        Duration::weeks(4),
        ParticipantGroup::Speculative,
        date!(2024 - 07 - 01),
    )
    .expect("single market")
    .expect("one report in window");

    // Then: Only the recent gold report counts
    assert_eq!(stats.points.len(), 1);
    assert_eq!(stats.latest_net, 42);
    assert_eq!(stats.z_score, None);

    // Then: Commercials are the mirror image in this fixture
    let commercial = positioning_stats(
        &history,
        "gold",
        Duration::weeks(4),
        ParticipantGroup::Commercial,
        date!(2024 - 07 - 01),
    )
    .expect("single market")
    .expect("one report in window");
    assert_eq!(commercial.latest_net, -42);

    // Then: A market with no reports yields nothing
    assert!(positioning_stats(
        &history,
        "crude",
        Duration::weeks(4),
        ParticipantGroup::Speculative,
        date!(2024 - 07 - 01),
    )
    .expect("nothing to disambiguate")
    .is_none());
}

#[test]
fn when_the_key_matches_a_market_and_its_micro_contract_they_are_not_blended() {
    // Given: Three weeks of GOLD and three weeks of MICRO GOLD reports
    const MICRO_GOLD: &str = "MICRO GOLD - COMMODITY EXCHANGE INC.";
    let history = [
        record(GOLD, date!(2024 - 06 - 11), 200_000),
        record(MICRO_GOLD, date!(2024 - 06 - 11), 5_000),
        record(GOLD, date!(2024 - 06 - 18), 210_000),
        record(MICRO_GOLD, date!(2024 - 06 - 18), 5_500),
        record(GOLD, date!(2024 - 06 - 25), 220_000),
        record(MICRO_GOLD, date!(2024 - 06 - 25), 6_000),
    ];
    let today = date!(2024 - 07 - 01);

    // When: Statistics are requested with the bare key "gold"
    let error = positioning_stats(
        &history,
        "gold",
        Duration::weeks(52),
        ParticipantGroup::Speculative,
        today,
    )
    .expect_err("key matches two markets");

    // Then: The ambiguity is reported with both candidate names
    let PositioningError::AmbiguousMarket { candidates, .. } = &error;
    assert_eq!(candidates, &vec![GOLD.to_owned(), MICRO_GOLD.to_owned()]);
    let reported = EnvelopeError::from_positioning(&error).expect("valid envelope error");
    assert_eq!(reported.code, "positioning.ambiguous_market");

    // Then: The full market name selects GOLD alone, one deviation above its mean
    let stats = positioning_stats(
        &history,
        GOLD,
        Duration::weeks(52),
        ParticipantGroup::Speculative,
        today,
    )
    .expect("exact name is unambiguous")
    .expect("window has data");
    assert_eq!(stats.market, GOLD);
    assert_eq!(stats.points.len(), 3);
    assert!((stats.mean - 210_000.0).abs() < 1e-9);
    assert_eq!(stats.latest_net, 220_000);
    assert!((stats.z_score.expect("dispersion") - 1.0).abs() < 1e-9);
}

// =============================================================================
// History persistence
// =============================================================================

#[test]
fn when_reports_are_fetched_twice_the_history_keeps_one_row_per_week() {
    // Given: A provider payload with two weeks of gold reports
    let payload = json!([
        {
            "market_and_exchange_names": GOLD,
            "report_date_as_yyyy_mm_dd": "2024-06-25T00:00:00.000",
            "noncomm_positions_long_all": "260000",
            "noncomm_positions_short_all": "60000",
            "comm_positions_long_all": "50000",
            "comm_positions_short_all": "250000",
            "nonrept_positions_long_all": "30000",
            "nonrept_positions_short_all": "30000"
        },
        {
            "market_and_exchange_names": GOLD,
            "report_date_as_yyyy_mm_dd": "2024-06-18T00:00:00.000",
            "noncomm_positions_long_all": "250000",
            "noncomm_positions_short_all": "70000",
            "comm_positions_long_all": "60000",
            "comm_positions_short_all": "240000",
            "nonrept_positions_long_all": "30000",
            "nonrept_positions_short_all": "30000"
        }
    ]);
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("positioning.json");

    // When: The same payload is merged and saved on two separate runs
    for expected_new in [2, 0] {
        let mut history = PositioningHistory::load(&path).expect("load history");
        let added = history.extend(parse_reports(&payload).expect("payload parses"));
        assert_eq!(added, expected_new);
        history.save(&path).expect("save history");
    }

    // Then: The file holds each week once and feeds the statistics
    let history = PositioningHistory::load(&path).expect("reload history");
    assert_eq!(history.len(), 2);

    let stats = positioning_stats(
        history.records(),
        "gold",
        Duration::weeks(52),
        ParticipantGroup::Speculative,
        date!(2024 - 07 - 01),
    )
    .expect("single market")
    .expect("window has data");
    assert_eq!(stats.latest_net, 200_000);
    assert_eq!(stats.points[0].date, date!(2024 - 06 - 18));
    assert_eq!(stats.points[0].net, 180_000);
}

#[test]
fn when_the_history_file_does_not_exist_it_starts_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let history = PositioningHistory::load(&dir.path().join("missing.json")).expect("load");
    assert!(history.is_empty());
}
