use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_SYMBOL_LEN: usize = 20;

/// Punctuation found in provider tickers: `^MOVE`, `BRK.B`, `EURUSD=X`.
const SYMBOL_PUNCTUATION: [char; 5] = ['.', '-', '^', '=', '_'];

/// Provider-specific ticker, stored exactly as the provider expects it.
///
/// Case is preserved because some endpoints (Treasury maturities such as
/// `10year`) are case-sensitive. Lookups typed by a user go through
/// [`Symbol::matches`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let symbol = input.trim();
        if symbol.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        let len = symbol.chars().count();
        if len > MAX_SYMBOL_LEN {
            return Err(ValidationError::SymbolTooLong {
                len,
                max: MAX_SYMBOL_LEN,
            });
        }

        if let Some((index, ch)) = symbol
            .chars()
            .enumerate()
            .find(|(_, ch)| !ch.is_ascii_alphanumeric() && !SYMBOL_PUNCTUATION.contains(ch))
        {
            return Err(ValidationError::SymbolInvalidChar { ch, index });
        }

        Ok(Self(symbol.to_owned()))
    }

    /// Built-in tables only; the literal must already be a valid symbol.
    pub(crate) fn from_static(symbol: &'static str) -> Self {
        debug_assert!(Self::parse(symbol).is_ok(), "invalid built-in symbol {symbol}");
        Self(symbol.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against user input.
    pub fn matches(&self, input: &str) -> bool {
        self.0.eq_ignore_ascii_case(input.trim())
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}
