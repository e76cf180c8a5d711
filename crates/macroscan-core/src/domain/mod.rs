//! # Domain Models
//!
//! Canonical, validated domain types shared by every macroscan component.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Provider-specific ticker |
//! | [`AssetClass`] | Instrument class driving endpoint selection |
//! | [`InstrumentDescriptor`] | Immutable instrument definition |
//! | [`PricePoint`] | One dated closing price |
//! | [`PriceSeries`] | Deduplicated closing prices, most recent first |

mod instrument;
mod series;
mod symbol;

pub use instrument::{validate_universe, AssetClass, InstrumentDescriptor};
pub use series::{PricePoint, PriceSeries};
pub use symbol::Symbol;

use time::Date;

time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");

/// Parses the leading `YYYY-MM-DD` portion of a provider date key.
///
/// Accepts plain dates as well as date-times such as `2024-01-02 16:00:00`
/// or `2024-01-02T00:00:00.000`.
pub fn parse_date_prefix(input: &str) -> Option<Date> {
    let prefix = input.trim().get(..10)?;
    Date::parse(prefix, time::macros::format_description!("[year]-[month]-[day]")).ok()
}
