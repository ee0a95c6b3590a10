//! Domain error types.
//!
//! Only loading and configuration can fail. Indicator and rule evaluation
//! resolve every edge case to a sentinel value instead of an error.

/// Top-level error type for nmltrader.
#[derive(Debug, thiserror::Error)]
pub enum TraderError {
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("records out of chronological order at position {position}")]
    UnorderedRecords { position: usize },

    #[error("invalid bar: {reason}")]
    InvalidBar { reason: String },

    #[error("bar at position {position} does not end after its predecessor")]
    NonMonotonicSeries { position: usize },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("csv error: {reason}")]
    Csv { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TraderError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        TraderError::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }
}

impl From<&TraderError> for std::process::ExitCode {
    fn from(err: &TraderError) -> Self {
        let code: u8 = match err {
            TraderError::Io(_) | TraderError::Csv { .. } => 1,
            TraderError::ConfigParse { .. }
            | TraderError::ConfigMissing { .. }
            | TraderError::ConfigInvalid { .. } => 2,
            TraderError::MalformedRecord { .. }
            | TraderError::UnorderedRecords { .. }
            | TraderError::InvalidBar { .. }
            | TraderError::NonMonotonicSeries { .. } => 3,
        };
        std::process::ExitCode::from(code)
    }
}
