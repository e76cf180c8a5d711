use macroscan_core::{CoreError, ValidationError};
use thiserror::Error;

/// Exit statuses:
///
/// | Code | Meaning                                        |
/// |------|------------------------------------------------|
/// | 2    | invalid configuration, flags, or universe      |
/// | 3    | output written, but some instruments failed    |
/// | 4    | output could not be serialized                 |
/// | 5    | `--strict` and the output has warnings/errors  |
/// | 10   | file or terminal I/O failed                    |
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Command(String),

    #[error("{error_count} error(s) reported; see the `errors` section of the output")]
    PartialResult { error_count: usize },

    #[error("--strict: {warning_count} warning(s) and {error_count} error(s) in output")]
    StrictModeViolation {
        warning_count: usize,
        error_count: usize,
    },

    #[error("cannot encode output: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Command(_) => 2,
            Self::PartialResult { .. } => 3,
            Self::Serialization(_) => 4,
            Self::StrictModeViolation { .. } => 5,
            Self::Io(_) => 10,
        }
    }
}

impl From<CoreError> for CliError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::Validation(error) => error.into(),
            CoreError::Serialization(error) => error.into(),
            CoreError::Io(error) => error.into(),
        }
    }
}
