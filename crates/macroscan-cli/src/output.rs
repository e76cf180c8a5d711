use std::io::{self, Write};

use macroscan_core::csv_field;

use crate::cli::OutputFormat;
use crate::commands::{Outcome, TextTable};
use crate::error::CliError;

pub fn render(outcome: &Outcome, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    render_to(&mut writer, outcome, format, pretty)?;
    writer.flush()?;
    Ok(())
}

fn render_to<W: Write>(
    writer: &mut W,
    outcome: &Outcome,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(&outcome.envelope)?
            } else {
                serde_json::to_string(&outcome.envelope)?
            };
            writeln!(writer, "{payload}")?;
        }
        OutputFormat::Table => render_table(writer, outcome)?,
        OutputFormat::Csv => {
            let table = outcome.table.as_ref().ok_or_else(|| {
                CliError::Command(String::from("csv output is not available for this command"))
            })?;
            write_csv(writer, table)?;
        }
    }

    Ok(())
}

fn render_table<W: Write>(writer: &mut W, outcome: &Outcome) -> Result<(), CliError> {
    let envelope = &outcome.envelope;
    writeln!(writer, "request_id  : {}", envelope.meta.request_id)?;
    writeln!(writer, "schema      : {}", envelope.meta.schema_version)?;
    writeln!(writer, "generated_at: {}", envelope.meta.generated_at)?;
    writeln!(
        writer,
        "sources     : {}",
        envelope
            .meta
            .source_chain
            .iter()
            .map(|source| source.as_str())
            .collect::<Vec<_>>()
            .join(",")
    )?;
    writeln!(writer, "latency_ms  : {}", envelope.meta.latency_ms)?;

    if !envelope.meta.warnings.is_empty() {
        writeln!(writer, "warnings:")?;
        for warning in &envelope.meta.warnings {
            writeln!(writer, "  - {warning}")?;
        }
    }

    match &outcome.table {
        Some(table) => {
            writeln!(writer)?;
            write_aligned(writer, table)?;
        }
        None => {
            writeln!(writer, "data:")?;
            let pretty_data = serde_json::to_string_pretty(&envelope.data)?;
            for line in pretty_data.lines() {
                writeln!(writer, "  {line}")?;
            }
        }
    }

    if !envelope.errors.is_empty() {
        writeln!(writer, "errors:")?;
        for error in &envelope.errors {
            match &error.symbol {
                Some(symbol) => writeln!(writer, "  - {symbol} {}: {}", error.code, error.message)?,
                None => writeln!(writer, "  - {}: {}", error.code, error.message)?,
            }
        }
    }

    Ok(())
}

fn write_aligned<W: Write>(writer: &mut W, table: &TextTable) -> io::Result<()> {
    let mut widths = table
        .headers
        .iter()
        .map(|header| header.chars().count())
        .collect::<Vec<_>>();
    for row in &table.rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_owned()
    };

    writeln!(writer, "{}", line(&table.headers))?;
    writeln!(
        writer,
        "{}",
        widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("  ")
    )?;
    for row in &table.rows {
        writeln!(writer, "{}", line(row))?;
    }

    if !table.footer.is_empty() {
        writeln!(writer)?;
        for footer in &table.footer {
            writeln!(writer, "{footer}")?;
        }
    }
    Ok(())
}

fn write_csv<W: Write>(writer: &mut W, table: &TextTable) -> io::Result<()> {
    writeln!(writer, "{}", csv_line(&table.headers))?;
    for row in &table.rows {
        writeln!(writer, "{}", csv_line(row))?;
    }
    Ok(())
}

fn csv_line(cells: &[String]) -> String {
    cells
        .iter()
        .map(|cell| csv_field(cell))
        .collect::<Vec<_>>()
        .join(",")
}
