use macroscan_core::momentum::normalize_price;
use macroscan_core::{
    moving_average, EnvelopeError, InstrumentDescriptor, PricePoint, PriceSeries, ProviderId,
    ScanAggregator, ScanConfig, ValidationError,
};
use serde::Serialize;
use time::Date;

use crate::cli::HistoryArgs;
use crate::error::CliError;

use super::{series_source, CommandResult, TextTable};

#[derive(Debug, Serialize)]
struct HistoryPoint {
    #[serde(with = "macroscan_core::domain::iso_date")]
    date: Date,
    close: f64,
    moving_average: Option<f64>,
}

#[derive(Debug, Serialize)]
struct HistoryData<'a> {
    instrument: &'a InstrumentDescriptor,
    ma_window: usize,
    attempts: usize,
    /// Oldest first.
    points: Vec<HistoryPoint>,
}

pub async fn run(args: &HistoryArgs, config: &ScanConfig) -> Result<CommandResult, CliError> {
    if args.ma_window == 0 {
        return Err(ValidationError::ZeroWindow.into());
    }

    let (seed, instrument) = config.find_instrument(&args.symbol).ok_or_else(|| {
        CliError::Command(format!(
            "'{}' is not in the configured universe; see `macroscan universe`",
            args.symbol
        ))
    })?;

    let rotator = config.credentials()?;
    let aggregator = ScanAggregator::new(series_source(config)?, rotator)
        .with_retry_mode(config.retry_mode);

    let source_chain = vec![ProviderId::Alphavantage];
    let (points, attempts, errors) = match aggregator.fetch_series(instrument, seed).await {
        Ok(fetched) => (
            history_points(instrument, &fetched.series, args.ma_window)?,
            fetched.attempts,
            Vec::new(),
        ),
        Err(failure) => {
            let error = EnvelopeError::from_fetch(&failure.last_error, ProviderId::Alphavantage)?
                .with_symbol(instrument.symbol.as_str());
            (Vec::new(), failure.attempts, vec![error])
        }
    };

    let table = render_table(&points);
    let data = serde_json::to_value(HistoryData {
        instrument,
        ma_window: args.ma_window,
        attempts,
        points,
    })?;

    Ok(CommandResult::ok(data, source_chain)
        .with_errors(errors)
        .with_table(table))
}

/// Normalized closes, oldest first, with the trailing average alongside.
fn history_points(
    instrument: &InstrumentDescriptor,
    series: &PriceSeries,
    window: usize,
) -> Result<Vec<HistoryPoint>, ValidationError> {
    let normalized = series
        .points()
        .iter()
        .map(|point| PricePoint::new(point.date, normalize_price(instrument.asset_class, point.close)))
        .collect::<Result<Vec<_>, _>>()?;
    let normalized = PriceSeries::from_points(normalized)?;
    let averages = moving_average(&normalized, window)?;

    Ok(normalized
        .chronological()
        .zip(averages)
        .map(|(point, moving_average)| HistoryPoint {
            date: point.date,
            close: point.close,
            moving_average,
        })
        .collect())
}

fn render_table(points: &[HistoryPoint]) -> TextTable {
    let mut table = TextTable::new(["Date", "Close", "MA"]);
    for point in points {
        table.push_row(vec![
            point.date.to_string(),
            format!("{:.4}", point.close),
            point
                .moving_average
                .map(|average| format!("{average:.4}"))
                .unwrap_or_default(),
        ]);
    }
    table
}
