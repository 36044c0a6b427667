//! Per-event translation errors
//!
//! None of these abort a batch: the offending event is logged and skipped.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranslateError {
    #[error("invalid identifier in {field}: {value:?} is not a UUID")]
    InvalidIdentifierFormat { field: &'static str, value: String },

    #[error("failed to parse bulletin timestamp {value:?}: {reason}")]
    TimestampParse { value: String, reason: String },
}

pub type TranslateResult<T> = Result<T, TranslateError>;
