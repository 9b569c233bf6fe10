//! Domain-specific error types following panic-free policy.

use thiserror::Error;

/// Errors that can occur in domain operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid field value
    #[error("Invalid {field}: {value} (expected {expected})")]
    InvalidFieldValue {
        field: String,
        value: String,
        expected: String,
    },

    /// Parse error for incoming data
    #[error("Failed to parse {field}: {reason}")]
    ParseError { field: String, reason: String },

    /// No hook registered under the given key
    #[error("Hook not found: {key}")]
    HookNotFound { key: String },

    /// Return-patch rule rejected for the method's return type
    #[error("Invalid return patch: {0}")]
    InvalidPatchRule(String),
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
