use thiserror::Error;

/// Failures the request-handling core can report.
///
/// Every variant is recoverable within a single request: callers log it and
/// degrade to a localized message instead of aborting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid rate format: {0:?}")]
    InvalidRateFormat(String),

    #[error("unknown currency: {0}")]
    UnknownCurrency(String),

    #[error("missing translation {section}.{key} for language '{language}'")]
    MissingTranslation {
        language: String,
        section: &'static str,
        key: &'static str,
    },

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),

    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
