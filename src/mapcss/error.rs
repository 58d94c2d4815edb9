use thiserror::Error;

use super::op::Op;

/// Reasons a condition is rejected when a style is loaded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConditionError {
    #[error("operator '{op}' on key '{key}' expects a numeric value, got '{literal}'")]
    NonNumericLiteral { key: String, op: Op, literal: String },

    #[error("expected key 'role' or 'index' in link context, got '{key}'")]
    UnsupportedLinkKey { key: String },

    #[error("truthy test '{key}?' is not supported in link context")]
    TruthyTestInLink { key: String },

    #[error("invalid regular expression '{pattern}' for key '{key}': {message}")]
    InvalidRegex {
        key: String,
        pattern: String,
        message: String,
    },

    #[error("invalid expression '{source_text}': {message}")]
    InvalidExpression { source_text: String, message: String },
}

pub type Result<T> = std::result::Result<T, ConditionError>;
