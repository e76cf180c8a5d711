use macroscan_core::positioning::MAX_LOOKBACK_WEEKS;
use macroscan_core::{
    positioning_stats, CftcPositioningSource, EnvelopeError, FetchError, PositioningHistory,
    PositioningSource, PositioningStats, ProviderId, ScanConfig,
};
use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tracing::info;

use crate::cli::PositioningArgs;
use crate::error::CliError;

use super::{http_client, CommandResult, TextTable};

#[derive(Debug, Serialize)]
struct PositioningData<'a> {
    market: &'a str,
    weeks: i64,
    records_in_history: usize,
    new_records: usize,
    stats: Option<PositioningStats>,
}

pub async fn run(args: &PositioningArgs, config: &ScanConfig) -> Result<CommandResult, CliError> {
    if !(1..=MAX_LOOKBACK_WEEKS).contains(&args.weeks) {
        return Err(CliError::Command(format!(
            "--weeks must be between 1 and {MAX_LOOKBACK_WEEKS}"
        )));
    }
    if !args.fetch && args.history.is_none() {
        return Err(CliError::Command(String::from(
            "positioning needs --fetch, --history FILE, or both",
        )));
    }

    let mut history = match &args.history {
        Some(path) => PositioningHistory::load(path)?,
        None => PositioningHistory::new(),
    };

    let mut errors = Vec::new();
    let mut new_records = 0;
    if args.fetch {
        let source = CftcPositioningSource::new(http_client()?).with_timeout_ms(config.timeout_ms);
        match fetch_into(&source, &mut history, &args.market, args.limit).await {
            Ok(added) => new_records = added,
            Err(error) => errors.push(EnvelopeError::from_fetch(&error, source.id())?),
        }
        if let Some(path) = &args.history {
            history.save(path)?;
        }
    }

    let today = OffsetDateTime::now_utc().date();
    let mut result = CommandResult::ok(serde_json::Value::Null, vec![ProviderId::Cftc]);
    let stats = match positioning_stats(
        history.records(),
        &args.market,
        Duration::weeks(args.weeks),
        args.group,
        today,
    ) {
        Ok(Some(stats)) => Some(stats),
        Ok(None) => {
            result = result.with_warning(format!(
                "no '{}' reports in the last {} weeks",
                args.market, args.weeks
            ));
            None
        }
        Err(error) => {
            errors.push(EnvelopeError::from_positioning(&error)?);
            None
        }
    };

    let table = render_table(stats.as_ref());
    result.data = serde_json::to_value(PositioningData {
        market: &args.market,
        weeks: args.weeks,
        records_in_history: history.len(),
        new_records,
        stats,
    })?;

    Ok(result.with_errors(errors).with_table(table))
}

async fn fetch_into(
    source: &dyn PositioningSource,
    history: &mut PositioningHistory,
    market: &str,
    limit: usize,
) -> Result<usize, FetchError> {
    let records = source.fetch_positioning(market, limit).await?;
    let fetched = records.len();
    let added = history.extend(records);
    info!(market, fetched, added, "positioning reports merged");
    Ok(added)
}

fn render_table(stats: Option<&PositioningStats>) -> TextTable {
    let mut table = TextTable::new(["Date", "Net"]);
    let Some(stats) = stats else {
        table.push_footer("Positioning: Data Missing");
        return table;
    };

    for point in &stats.points {
        table.push_row(vec![point.date.to_string(), point.net.to_string()]);
    }

    let bands = stats.bands();
    table.push_footer(format!(
        "{} {} mean {:.0} | std {:.0} | latest {}",
        stats.market, stats.group, stats.mean, stats.std_dev, stats.latest_net
    ));
    table.push_footer(match stats.z_score {
        Some(z_score) => format!("z-score {z_score:.2}"),
        None => String::from("z-score undefined (no dispersion)"),
    });
    table.push_footer(format!(
        "bands -2σ {:.0} | -1σ {:.0} | +1σ {:.0} | +2σ {:.0}",
        bands.lower_2, bands.lower_1, bands.upper_1, bands.upper_2
    ));
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use macroscan_core::{OpenInterest, ParticipantGroup, PositioningRecord};
    use std::path::PathBuf;
    use std::future::Future;
    use std::pin::Pin;
    use time::macros::date;

    struct ScriptedSource {
        outcome: Result<Vec<PositioningRecord>, FetchError>,
    }

    impl PositioningSource for ScriptedSource {
        fn id(&self) -> ProviderId {
            ProviderId::Fixture
        }

        fn fetch_positioning<'a>(
            &'a self,
            _market_key: &'a str,
            _limit: usize,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<PositioningRecord>, FetchError>> + Send + 'a>>
        {
            let outcome = self.outcome.clone();
            Box::pin(async move { outcome })
        }
    }

    fn record(date: time::Date, net: i64) -> PositioningRecord {
        PositioningRecord {
            market: String::from("GOLD - COMMODITY EXCHANGE INC."),
            date,
            speculative: OpenInterest::new(net, 0),
            commercial: OpenInterest::new(0, net),
            non_reportable: OpenInterest::default(),
        }
    }

    #[tokio::test]
    async fn fetched_records_merge_into_history() {
        let source = ScriptedSource {
            outcome: Ok(vec![
                record(date!(2024 - 06 - 18), 10),
                record(date!(2024 - 06 - 25), 20),
            ]),
        };
        let mut history = PositioningHistory::new();
        history.extend([record(date!(2024 - 06 - 18), 10)]);

        let added = fetch_into(&source, &mut history, "gold", 10)
            .await
            .expect("fetch succeeds");
        assert_eq!(added, 1);
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn fetch_failures_leave_history_untouched() {
        let source = ScriptedSource {
            outcome: Err(FetchError::transport("cftc returned status 503")),
        };
        let mut history = PositioningHistory::new();
        let error = fetch_into(&source, &mut history, "gold", 10)
            .await
            .expect_err("transport failure");
        assert_eq!(error.code(), "fetch.transport_error");
        assert!(history.is_empty());
    }

    #[test]
    fn table_reports_undefined_z_score() {
        let history = [record(date!(2024 - 06 - 25), 20)];
        let stats = positioning_stats(
            &history,
            "gold",
            Duration::weeks(4),
            ParticipantGroup::Speculative,
            date!(2024 - 07 - 01),
        )
        .expect("single market");
        let table = render_table(stats.as_ref());
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.footer[1], "z-score undefined (no dispersion)");

        assert_eq!(render_table(None).footer, vec![String::from("Positioning: Data Missing")]);
    }

    fn offline_args(market: &str, weeks: i64, history: PathBuf) -> PositioningArgs {
        PositioningArgs {
            market: market.to_owned(),
            weeks,
            group: ParticipantGroup::Speculative,
            history: Some(history),
            fetch: false,
            limit: 10,
        }
    }

    #[tokio::test]
    async fn overlapping_market_names_are_reported_not_blended() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cot.json");
        let latest = OffsetDateTime::now_utc().date() - Duration::days(3);

        let mut history = PositioningHistory::new();
        for (week, (gold, micro)) in [(220_000, 6_000), (210_000, 5_500), (200_000, 5_000)]
            .into_iter()
            .enumerate()
        {
            let date = latest - Duration::weeks(week as i64);
            let mut full = record(date, gold);
            full.market = String::from("GOLD - COMMODITY EXCHANGE INC.");
            let mut small = record(date, micro);
            small.market = String::from("MICRO GOLD - COMMODITY EXCHANGE INC.");
            history.extend([full, small]);
        }
        history.save(&path).expect("save history");

        let blended = run(&offline_args("gold", 52, path.clone()), &ScanConfig::default())
            .await
            .expect("ambiguity is an envelope error");
        assert_eq!(blended.errors.len(), 1);
        assert_eq!(blended.errors[0].code, "positioning.ambiguous_market");
        assert!(blended.errors[0].message.contains("MICRO GOLD"));
        assert!(blended.data["stats"].is_null());
        assert!(blended.warnings.is_empty());

        let exact = run(
            &offline_args("GOLD - COMMODITY EXCHANGE INC.", 52, path),
            &ScanConfig::default(),
        )
        .await
        .expect("exact name");
        assert!(exact.errors.is_empty());
        assert_eq!(exact.data["stats"]["latest_net"], 220_000);
        assert_eq!(exact.data["stats"]["points"].as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn out_of_range_weeks_are_rejected_before_any_work() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cot.json");

        for weeks in [0, MAX_LOOKBACK_WEEKS + 1, i64::MAX] {
            let error = run(&offline_args("gold", weeks, path.clone()), &ScanConfig::default())
                .await
                .expect_err("weeks out of range");
            assert_eq!(error.exit_code(), 2);
        }
    }
}
