//! Error types for qail-cql.

use std::fmt;
use thiserror::Error;

/// The main error type for codec and paging operations.
#[derive(Debug, Error)]
pub enum CqlError {
    /// A value violates the invariants of its target type (e.g. NULL inside a set).
    #[error("Illegal value for {wire_type}: {value} ({reason})")]
    IllegalValue {
        wire_type: String,
        value: String,
        reason: String,
    },

    /// Bytes cannot be decoded as the declared type.
    #[error("Decode error for {wire_type}: {reason}")]
    Decode { wire_type: String, reason: String },

    /// Byte length is structurally impossible for the declared type.
    #[error("Invalid length for {wire_type}: expected {expected} bytes, got {actual}")]
    InvalidLength {
        wire_type: String,
        expected: String,
        actual: usize,
    },

    /// Absent value where the codec has no NULL representation.
    #[error("Unexpected NULL for non-optional {wire_type}")]
    UnexpectedNull { wire_type: String },

    /// A textual literal could not be parsed.
    #[error("Invalid {wire_type} literal '{input}': {reason}")]
    IllegalArgument {
        wire_type: String,
        input: String,
        reason: String,
    },

    /// An enum wire value outside the closed set of variants.
    #[error("No variant of {enum_name} matches {value}")]
    NoSuchVariant {
        enum_name: &'static str,
        value: String,
    },

    /// A UDT codec cannot be built against the live schema.
    #[error("Schema mismatch for {type_name}: {reason}")]
    SchemaMismatch { type_name: String, reason: String },

    /// No registered codec accepts the requested type and value.
    #[error("No codec registered for {wire_type} ({value_type})")]
    CodecNotFound {
        wire_type: String,
        value_type: String,
    },

    /// Serialized paging state failed its integrity check or is malformed.
    #[error("Corrupted paging state: {0}")]
    CorruptedState(String),

    /// Paging state belongs to another statement.
    #[error("Paging state does not belong to this statement: {0}")]
    StatementMismatch(FingerprintMismatch),

    /// The result stream has no further pages.
    #[error("Paging is exhausted; restart the query to page again")]
    PagingExhausted,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The component of a query fingerprint that did not match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FingerprintMismatch {
    QueryText { expected: String, actual: String },
    ParameterCount { expected: usize, actual: usize },
    Parameter { index: usize },
}

impl fmt::Display for FingerprintMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FingerprintMismatch::QueryText { expected, actual } => {
                write!(f, "query text differs (cursor: '{}', statement: '{}')", expected, actual)
            }
            FingerprintMismatch::ParameterCount { expected, actual } => write!(
                f,
                "parameter count differs (cursor: {}, statement: {})",
                expected, actual
            ),
            FingerprintMismatch::Parameter { index } => {
                write!(f, "bound parameter {} differs", index)
            }
        }
    }
}

impl CqlError {
    pub fn illegal_value(
        wire_type: impl fmt::Display,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::IllegalValue {
            wire_type: wire_type.to_string(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn decode(wire_type: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::Decode {
            wire_type: wire_type.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_length(
        wire_type: impl fmt::Display,
        expected: impl fmt::Display,
        actual: usize,
    ) -> Self {
        Self::InvalidLength {
            wire_type: wire_type.to_string(),
            expected: expected.to_string(),
            actual,
        }
    }

    pub fn unexpected_null(wire_type: impl fmt::Display) -> Self {
        Self::UnexpectedNull {
            wire_type: wire_type.to_string(),
        }
    }

    pub fn illegal_argument(
        wire_type: impl fmt::Display,
        input: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::IllegalArgument {
            wire_type: wire_type.to_string(),
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn schema_mismatch(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// True for the cursor failures a caller recovers from by restarting the query:
    /// a corrupted or foreign token, and a pager that has already run out.
    pub fn is_restartable(&self) -> bool {
        matches!(
            self,
            CqlError::CorruptedState(_) | CqlError::StatementMismatch(_) | CqlError::PagingExhausted
        )
    }
}

/// Result type alias for qail-cql operations.
pub type CqlResult<T> = Result<T, CqlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CqlError::invalid_length("int", 4, 3);
        assert_eq!(
            err.to_string(),
            "Invalid length for int: expected 4 bytes, got 3"
        );
    }

    #[test]
    fn test_statement_mismatch_names_component() {
        let err = CqlError::StatementMismatch(FingerprintMismatch::Parameter { index: 1 });
        assert!(err.to_string().contains("bound parameter 1 differs"));
        assert!(err.is_restartable());
        assert!(CqlError::CorruptedState("bad tag".to_string()).is_restartable());
        assert!(CqlError::PagingExhausted.is_restartable());
    }

    #[test]
    fn test_illegal_argument_keeps_input_verbatim() {
        let err = CqlError::illegal_argument("set<int>", "{1,2", "unbalanced braces");
        assert!(err.to_string().contains("'{1,2'"));
        assert!(!err.is_restartable());
    }
}
