//! Flat row-per-instrument view of a scan and its CSV rendering.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{AssetClass, MomentumResult, MomentumState, ScanReport, Trend};

pub const CSV_HEADER: [&str; 5] = ["Asset", "Price", "Momentum%", "Trend", "State"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    #[serde(rename = "Asset")]
    pub asset: String,
    #[serde(rename = "Price")]
    pub price: f64,
    #[serde(rename = "Momentum%")]
    pub momentum_pct: f64,
    #[serde(rename = "Trend")]
    pub trend: Trend,
    #[serde(rename = "State")]
    pub state: MomentumState,
    #[serde(skip)]
    asset_class: Option<AssetClass>,
}

impl ReportRow {
    /// Yields render as percentages, everything else as a plain price.
    pub fn price_label(&self) -> String {
        match self.asset_class {
            Some(AssetClass::BondYield) => format!("{:.2}%", self.price),
            _ => format!("{:.4}", self.price),
        }
    }

    pub fn momentum_label(&self) -> String {
        format!("{:.2}%", self.momentum_pct)
    }
}

impl From<&MomentumResult> for ReportRow {
    fn from(result: &MomentumResult) -> Self {
        Self {
            asset: result.asset.clone(),
            price: result.price_now,
            momentum_pct: result.momentum_long,
            trend: result.trend,
            state: result.state,
            asset_class: Some(result.asset_class),
        }
    }
}

impl ScanReport {
    pub fn rows(&self) -> Vec<ReportRow> {
        self.results.iter().map(ReportRow::from).collect()
    }
}

/// `Macro_Scanner_<YYYYMMDD>.csv` for the given generation date.
pub fn default_export_name(date: Date) -> String {
    format!(
        "Macro_Scanner_{:04}{:02}{:02}.csv",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

pub fn write_csv<W: Write>(writer: &mut W, rows: &[ReportRow]) -> io::Result<()> {
    writeln!(writer, "{}", CSV_HEADER.join(","))?;
    for row in rows {
        writeln!(
            writer,
            "{},{:.4},{:.2},{},{}",
            csv_field(&row.asset),
            row.price,
            row.momentum_pct,
            row.trend,
            row.state
        )?;
    }
    writer.flush()
}

/// Quotes a CSV cell when it holds a comma, a quote, or a newline.
pub fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}
