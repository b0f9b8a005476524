//! Error types for towcheck

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single offending field in a reading set or declared specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub reason: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Every violation found in one validation pass, reported together
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violations(pub Vec<FieldViolation>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.0.push(FieldViolation::new(field, reason));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn extend(&mut self, other: Violations) {
        self.0.extend(other.0);
    }

    /// Names of every offending field, in the order they were found
    pub fn fields(&self) -> Vec<&str> {
        self.0.iter().map(|v| v.field.as_str()).collect()
    }

    pub fn mentions(&self, field: &str) -> bool {
        self.0.iter().any(|v| v.field == field)
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Errors raised by weight derivation, spec validation, evaluation and the provenance gate
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ComplianceError {
    #[error("invalid reading: {0}")]
    InvalidReading(Violations),

    #[error("invalid specification: {0}")]
    InvalidSpec(Violations),

    #[error("missing required input: {0}")]
    MissingRequiredInput(String),

    #[error("already pending review: {identity} (existing record {existing_id})")]
    DuplicatePendingSubmission { identity: String, existing_id: String },

    #[error("provenance cannot change from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("registry only accepts verified specifications, got {0}")]
    UnverifiedRegistryWrite(String),
}

impl ComplianceError {
    /// Recoverable conditions let the caller continue with existing data
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ComplianceError::DuplicatePendingSubmission { .. })
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration not found")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
}

/// Persistence-related errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record already exists and cannot be overwritten: {0}")]
    AlreadyExists(String),

    #[error("Stored record failed integrity check: {0}")]
    Corrupted(String),

    #[error("Store lock poisoned: {0}")]
    Poisoned(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Compliance(#[from] ComplianceError),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Weigh check failed: {0}")]
    CheckFailed(String),
}

impl Error {
    /// Domain error carried by this error, if any
    pub fn as_compliance(&self) -> Option<&ComplianceError> {
        match self {
            Error::Compliance(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violations_join_every_field() {
        let mut v = Violations::new();
        v.push("gvm", "must be greater than 0");
        v.push("gcm", "must be >= gvm");
        let err = ComplianceError::InvalidSpec(v);
        let msg = err.to_string();
        assert!(msg.contains("gvm: must be greater than 0"));
        assert!(msg.contains("gcm: must be >= gvm"));
    }

    #[test]
    fn test_duplicate_is_recoverable() {
        let err = ComplianceError::DuplicatePendingSubmission {
            identity: "plate:ABC123|NSW".to_string(),
            existing_id: "x".to_string(),
        };
        assert!(err.is_recoverable());
        assert!(!ComplianceError::MissingRequiredInput("weights".into()).is_recoverable());
    }
}
