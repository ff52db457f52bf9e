//! Error handling for the compliance engine
//!
//! This module provides idiomatic error types using thiserror. The taxonomy
//! distinguishes expected data-quality findings (which are domain values, not
//! errors) from programming-contract violations (which fail fast):
//!
//! - Unresolvable floor/use text is returned as `None`, never raised.
//! - A rule that compares incompatible types becomes a failed condition
//!   inside the engine; `RuleError::InvalidComparison` never escapes it.
//! - A malformed rule definition (missing citation, bad operator) is a
//!   configuration defect and is raised at catalog-load time.

use thiserror::Error;

/// Main error type for the compliance engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Project error: {0}")]
    Project(#[from] ProjectError),

    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Rule catalog deserialization error: {0}")]
    CatalogFormat(#[from] serde_yaml::Error),
}

/// Project boundary validation errors
#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("Project record is not a JSON object")]
    NotAnObject,

    #[error("Field '{field}' has unexpected type: expected {expected}")]
    FieldType { field: String, expected: String },
}

/// Rule definition and evaluation errors
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Rule '{rule_id}': violation action '{message}' has no normative citation")]
    MissingCitation { rule_id: String, message: String },

    #[error("Unknown rule operator '{operator}'")]
    UnknownOperator { operator: String },

    #[error("Rule '{rule_id}' is malformed: {reason}")]
    MalformedRule { rule_id: String, reason: String },

    #[error("Cannot compare '{left}' with '{right}' using {operator}")]
    InvalidComparison {
        left: String,
        right: String,
        operator: String,
    },
}

/// Session lifecycle errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session '{session_id}' not found")]
    NotFound { session_id: String },

    #[error("Session '{session_id}' cannot accept a message in state '{state}'")]
    InvalidState { session_id: String, state: String },
}

/// Result type aliases for convenience
pub type EngineResult<T> = Result<T, EngineError>;
pub type ProjectResult<T> = Result<T, ProjectError>;
pub type RuleResult<T> = Result<T, RuleError>;
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let rule_err = RuleError::MissingCitation {
            rule_id: "ACC-001".to_string(),
            message: "test".to_string(),
        };

        let engine_err = EngineError::Rule(rule_err);
        assert!(matches!(engine_err, EngineError::Rule(_)));
    }

    #[test]
    fn test_session_not_found_display() {
        let err = SessionError::NotFound {
            session_id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Session 'abc' not found");
    }

    #[test]
    fn test_invalid_comparison_display() {
        let err = RuleError::InvalidComparison {
            left: "\"alto\"".to_string(),
            right: "30".to_string(),
            operator: "greater_than".to_string(),
        };
        assert!(err.to_string().contains("greater_than"));
    }
}
