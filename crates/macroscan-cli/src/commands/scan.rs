use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use macroscan_core::{
    default_export_name, write_csv, EnvelopeError, MacroDesignations, MacroIndicatorSet, ProviderId,
    ScanAggregator, ScanConfig, ScanReport,
};
use tracing::info;

use crate::cli::ScanArgs;
use crate::error::CliError;

use super::{series_source, CommandResult, TextTable};

pub async fn run(args: &ScanArgs, mut config: ScanConfig) -> Result<CommandResult, CliError> {
    apply_overrides(args, &mut config);
    config.validate()?;

    let rotator = config.credentials()?;
    let aggregator = ScanAggregator::new(series_source(&config)?, rotator)
        .with_pacer(config.pacer())
        .with_retry_mode(config.retry_mode)
        .with_lookbacks(config.lookbacks()?)
        .with_designations(config.designations.clone());

    let report = aggregator
        .run_scan(&config.universe)
        .await?
        .filtered(&args.asset_classes);

    let mut warnings = macro_warnings(&report.macro_indicators, &config.designations);
    if let Some(path) = export_path(args, &report) {
        export(&report, &path)?;
        if report.results.is_empty() {
            warnings.push(format!("{} contains no rows", path.display()));
        }
    }

    let errors = report
        .failures
        .iter()
        .map(|failure| EnvelopeError::from_failure(failure, ProviderId::Alphavantage))
        .collect::<Result<Vec<_>, _>>()?;
    let table = render_table(&report);
    let data = serde_json::to_value(&report)?;

    Ok(CommandResult::ok(data, vec![ProviderId::Alphavantage])
        .with_errors(errors)
        .with_warnings(warnings)
        .with_table(table))
}

fn apply_overrides(args: &ScanArgs, config: &mut ScanConfig) {
    if let Some(lookback) = args.lookback {
        config.long_lookback = lookback;
    }
    if let Some(short_lookback) = args.short_lookback {
        config.short_lookback = short_lookback;
    }
    if let Some(pacing_ms) = args.pacing_ms {
        config.pacing_ms = pacing_ms;
    }
    if let Some(retry_mode) = args.retry_mode {
        config.retry_mode = retry_mode;
    }
}

fn export_path(args: &ScanArgs, report: &ScanReport) -> Option<PathBuf> {
    if let Some(path) = &args.export {
        return Some(path.clone());
    }
    args.export_default
        .then(|| PathBuf::from(default_export_name(report.generated_at.date())))
}

fn export(report: &ScanReport, path: &Path) -> Result<(), CliError> {
    let rows = report.rows();
    let mut writer = BufWriter::new(File::create(path)?);
    write_csv(&mut writer, &rows)?;
    info!(path = %path.display(), rows = rows.len(), "exported scan");
    Ok(())
}

/// An undesignated volatility index is a configuration choice, not a gap.
fn macro_warnings(indicators: &MacroIndicatorSet, designations: &MacroDesignations) -> Vec<String> {
    let mut warnings = Vec::new();
    if indicators.yield_spread.is_none() {
        warnings.push(String::from("yield spread unavailable: a designated yield is missing"));
    }
    if designations.volatility_index.is_some() && indicators.volatility_regime.is_none() {
        warnings.push(String::from(
            "volatility regime unavailable: the volatility index is missing",
        ));
    }
    if indicators.inflation_trend.is_none() {
        warnings.push(String::from(
            "inflation trend unavailable: the inflation proxy is missing",
        ));
    }
    warnings
}

fn render_table(report: &ScanReport) -> TextTable {
    let mut table = TextTable::new(["Asset", "Price", "Momentum%", "Trend", "State"]);
    for row in report.rows() {
        table.push_row(vec![
            row.asset.clone(),
            row.price_label(),
            row.momentum_label(),
            row.trend.to_string(),
            row.state.to_string(),
        ]);
    }

    let indicators = &report.macro_indicators;
    table.push_footer(match (indicators.yield_spread, indicators.curve_shape) {
        (Some(spread), Some(shape)) => format!("Yield Curve (10Y - 5Y): {spread:.2}% [{shape}]"),
        _ => String::from("Yield Curve: Data Missing"),
    });
    table.push_footer(
        match (indicators.volatility_level, indicators.volatility_regime) {
            (Some(level), Some(regime)) => format!("Bond Volatility: {level:.0} [{regime}]"),
            _ => String::from("Bond Volatility: Data Missing"),
        },
    );
    table.push_footer(
        match (indicators.inflation_momentum, indicators.inflation_trend) {
            (Some(momentum), Some(trend)) => format!("Inflation Trend: {momentum:.2}% [{trend}]"),
            _ => String::from("Inflation Trend: Data Missing"),
        },
    );
    if !report.failures.is_empty() {
        table.push_footer(format!("Dropped: {} instrument(s)", report.failures.len()));
    }
    table
}
