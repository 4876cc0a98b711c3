//! Error types shared by the action model, the naming codec and services.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error produced by a service method when its operation is rejected.
///
/// This is the Error-like payload carried by failed lifecycle actions. The
/// same error reaches the store (inside the failed action) and the caller
/// awaiting the dispatch.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{message}")]
pub struct ServiceError {
    /// Human-readable error message
    pub message: String,

    /// Optional structured details (status codes, validation errors, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ServiceError {
    /// Create an error with just a message
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    /// Attach structured details to the error
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Errors returned by [`crate::codec::parse`] for type strings that do not
/// follow the `VERB_SERVICE_METHOD..._SUFFIX` convention.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Fewer than three `_`-separated segments (verb, service, suffix)
    #[error("action type `{0}` needs at least a verb, a service and a suffix segment")]
    TooFewSegments(String),

    /// Two delimiters in a row, or a leading/trailing delimiter
    #[error("action type `{0}` contains an empty segment")]
    EmptySegment(String),
}

/// Errors returned when building [`crate::suffix::Suffixes`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SuffixError {
    /// The suffix does not start with the segment delimiter
    #[error("suffix `{0}` must start with `_`")]
    MissingDelimiter(String),

    /// The suffix is nothing but the delimiter
    #[error("suffix `{0}` has no name after the delimiter")]
    Empty(String),

    /// Two phases were configured with the same suffix
    #[error("suffix `{0}` is used for more than one phase")]
    Duplicate(String),

    /// One suffix ends with another, so its actions would match both phases
    #[error("suffix `{suffix}` ends with suffix `{shadowed}`")]
    Overlapping {
        /// The longer suffix
        suffix: String,
        /// The suffix it ends with
        shadowed: String,
    },
}
