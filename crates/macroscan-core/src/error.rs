use thiserror::Error;

/// Validation and configuration errors exposed by `macroscan-core`.
///
/// Every variant is raised before a scan starts; none of them is recoverable
/// by dropping a single instrument.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid asset class '{value}', expected one of fx, crypto, commodity, equity_index, bond_yield, macro_etf")]
    InvalidAssetClass { value: String },
    #[error("invalid participant group '{value}', expected one of speculative, commercial, non_reportable")]
    InvalidParticipantGroup { value: String },
    #[error("invalid retry mode '{value}', expected one of rate_limited_only, all_failures")]
    InvalidRetryMode { value: String },

    #[error("credential set must contain at least one credential")]
    EmptyCredentials,
    #[error("credential at position {position} is blank")]
    BlankCredential { position: usize },
    #[error("instrument universe must contain at least one instrument")]
    EmptyUniverse,
    #[error("instrument '{symbol}' appears more than once in the universe")]
    DuplicateInstrument { symbol: String },

    #[error("long lookback must be at least {min}, got {value}")]
    LongLookbackTooShort { value: usize, min: usize },
    #[error("short lookback must be greater than zero")]
    ZeroShortLookback,
    #[error("long lookback ({long}) must exceed short lookback ({short})")]
    LookbackOrder { long: usize, short: usize },
    #[error("moving average window must be greater than zero")]
    ZeroWindow,

    #[error("price series must contain at least one point")]
    EmptySeries,
    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },

    #[error("endpoint template for {asset_class} must contain the '{{apikey}}' placeholder")]
    TemplateMissingKey { asset_class: String },

    #[error("request_id must be at least 8 characters")]
    InvalidRequestId,
    #[error("source_chain must contain at least one source")]
    EmptySourceChain,
    #[error("error code cannot be empty")]
    EmptyErrorCode,
    #[error("error message cannot be empty")]
    EmptyErrorMessage,
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
