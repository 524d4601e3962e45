//! Error types shared across the tax computation system.

use thiserror::Error;

/// Severity of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single validation rule finding.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ValidationIssue {
    /// Stable rule identifier, e.g. `filing_status_required`.
    pub rule_id: String,
    /// Path into the tax return, e.g. `income.w2_forms[0].wages`.
    pub path: String,
    pub message: String,
    pub severity: Severity,
}

impl ValidationIssue {
    pub fn error(
        rule_id: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            path: path.into(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(
        rule_id: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            path: path.into(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

/// Main error type for tax computation operations.
#[derive(Error, Debug)]
pub enum TaxError {
    /// Structurally invalid input (missing filing status, negative wages,
    /// impossible hours). Carries a path into the offending field.
    #[error("Invalid input at {path}: {message}")]
    InvalidInput { path: String, message: String },

    /// Validation rules fired with error severity in strict mode.
    #[error("Validation failed with {} error(s)", .issues.iter().filter(|i| i.severity == Severity::Error).count())]
    ValidationFailed { issues: Vec<ValidationIssue> },

    /// Unexpected numeric condition inside a form computation. Not retried.
    #[error("Computation error: {0}")]
    Computation(String),

    /// Requested version/report/tenant combination does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness violation on a version insert. The caller may re-read the
    /// latest version and retry with version_number + 1.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Chain verifier found a hash mismatch, version-number gap, or broken
    /// previous-version linkage.
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    /// An external call failed in a retryable way (timeout, 5xx, reset).
    #[error("External service unavailable: {0}")]
    ExternalUnavailable(String),

    /// A named circuit is open; `time_remaining_secs` until half-open.
    #[error("Circuit '{circuit}' is open ({time_remaining_secs:.1}s remaining)")]
    CircuitOpen {
        circuit: String,
        time_remaining_secs: f64,
    },

    /// Retry gave up after exhausting its attempts.
    #[error("Retry exhausted after {attempts} attempt(s): {last_error}")]
    RetryExhausted {
        attempts: u32,
        last_error: Box<TaxError>,
    },

    /// Cooperative cancellation fired before completion.
    #[error("Operation cancelled")]
    Cancelled,

    /// Serialization failure while projecting a model to JSON.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TaxError {
    /// Create an invalid-input error with a field path.
    pub fn invalid_input(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a computation error.
    pub fn computation(msg: impl Into<String>) -> Self {
        Self::Computation(msg.into())
    }

    /// Create a not-found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an already-exists error.
    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    /// Create an integrity-violation error.
    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::IntegrityViolation(msg.into())
    }

    /// Create an external-unavailable error.
    pub fn external(msg: impl Into<String>) -> Self {
        Self::ExternalUnavailable(msg.into())
    }

    /// Whether the retry layer may re-attempt the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ExternalUnavailable(_))
    }

    /// Whether the error represents a routine validation outcome rather
    /// than a fault.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidInput { .. } | Self::ValidationFailed { .. })
    }
}

/// Result type alias for tax computation operations.
pub type TaxResult<T> = Result<T, TaxError>;
