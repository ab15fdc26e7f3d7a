//! Domain error types.

/// A rule definition that could not be compiled.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("rule {rule_id} ({rule_name}): {message}")]
pub struct ParseError {
    pub rule_id: i64,
    pub rule_name: String,
    pub message: String,
}

impl ParseError {
    pub fn new(rule_id: i64, rule_name: &str, message: impl Into<String>) -> Self {
        Self {
            rule_id,
            rule_name: rule_name.to_string(),
            message: message.into(),
        }
    }
}

/// Top-level error type for signalwatch.
#[derive(Debug, thiserror::Error)]
pub enum SignalwatchError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

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

    #[error(transparent)]
    RuleParse(#[from] ParseError),

    #[error("invalid rule: {reason}")]
    RuleInvalid { reason: String },

    #[error("price provider unavailable for {instrument}: {reason}")]
    ProviderUnavailable { instrument: String, reason: String },

    #[error("no price data for {instrument}")]
    NoData { instrument: String },

    #[error("recompute of {instrument} timed out after {seconds}s")]
    Timeout { instrument: String, seconds: u64 },

    #[error("worker for {instrument} failed: {reason}")]
    Worker { instrument: String, reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&SignalwatchError> for std::process::ExitCode {
    fn from(err: &SignalwatchError) -> Self {
        let code: u8 = match err {
            SignalwatchError::Io(_) => 1,
            SignalwatchError::ConfigParse { .. }
            | SignalwatchError::ConfigMissing { .. }
            | SignalwatchError::ConfigInvalid { .. } => 2,
            SignalwatchError::Database { .. } | SignalwatchError::DatabaseQuery { .. } => 3,
            SignalwatchError::RuleParse(_)
            | SignalwatchError::RuleInvalid { .. }
            | SignalwatchError::Json(_) => 4,
            SignalwatchError::ProviderUnavailable { .. }
            | SignalwatchError::NoData { .. }
            | SignalwatchError::Timeout { .. }
            | SignalwatchError::Worker { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
