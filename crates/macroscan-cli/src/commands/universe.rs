use macroscan_core::{InstrumentDescriptor, MacroDesignations, ProviderId, ScanConfig};
use serde::Serialize;

use crate::error::CliError;

use super::{CommandResult, TextTable};

#[derive(Debug, Serialize)]
struct UniverseData<'a> {
    instruments: &'a [InstrumentDescriptor],
    designations: &'a MacroDesignations,
}

pub fn run(config: &ScanConfig) -> Result<CommandResult, CliError> {
    config.validate()?;

    let mut table = TextTable::new(["Symbol", "Name", "Class"]);
    for instrument in &config.universe {
        table.push_row(vec![
            instrument.symbol.to_string(),
            instrument.display_name.clone(),
            instrument.asset_class.to_string(),
        ]);
    }

    let mut result = CommandResult::ok(
        serde_json::to_value(UniverseData {
            instruments: &config.universe,
            designations: &config.designations,
        })?,
        vec![ProviderId::Alphavantage],
    );
    for designated in missing_designations(config) {
        result = result.with_warning(format!(
            "designated instrument '{designated}' is not in the universe"
        ));
    }
    if config.designations.volatility_index.is_none() {
        result = result.with_warning(
            "no volatility index designated: the volatility regime is not derived",
        );
    }

    Ok(result.with_table(table))
}

fn missing_designations(config: &ScanConfig) -> Vec<String> {
    config
        .designations
        .symbols()
        .filter(|symbol| {
            !config
                .universe
                .iter()
                .any(|instrument| &instrument.symbol == *symbol)
        })
        .map(ToString::to_string)
        .collect()
}
