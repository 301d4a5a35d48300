//! Error taxonomy for reconciliation.
//!
//! Every failure a lifecycle operation can produce is one of these kinds.
//! Errors are categorized so hosts can render them as `(summary, detail)`
//! diagnostics and decide what, if anything, to retry.

use crate::types::{Diagnostic, Operation};
use std::fmt;

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of reconciliation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Provider configuration is unusable.
    InvalidProvider,
    /// Local schema violation, never reached the API.
    Validation,
    /// Network or GraphQL layer failure; the mutation may or may not have applied.
    Transport,
    /// The remote reports the entity does not exist.
    NotFound,
    /// The remote accepted the request but objected to its content.
    Problem,
    /// Import identifier does not match the expected key schema.
    ImportId,
    /// Deliberately unsupported operation.
    Refusal,
    /// The host cancelled the operation.
    Cancelled,
    /// A framework invariant was broken.
    Internal,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidProvider => "Invalid provider configuration",
            Self::Validation => "Invalid configuration",
            Self::Transport => "API request failed",
            Self::NotFound => "Resource not found",
            Self::Problem => "Rejected by the API",
            Self::ImportId => "Invalid import ID",
            Self::Refusal => "Operation not supported",
            Self::Cancelled => "Operation cancelled",
            Self::Internal => "Internal error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::InvalidProvider => "Check the endpoint and API key in the provider configuration",
            Self::Validation => "Fix the attribute named in the error and plan again",
            Self::Transport => "Check connectivity and plan again; the change may have been applied",
            Self::NotFound => "Verify the identifier, or remove the resource from state",
            Self::Problem => "Adjust the configuration according to the API message",
            Self::ImportId => "Use the import ID format named in the error",
            Self::Refusal => "Follow the remediation named in the error",
            Self::Cancelled => "Run the operation again",
            Self::Internal => "Report this as a bug",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during reconciliation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Provider configuration is unusable.
    #[error("invalid provider configuration: {0}")]
    InvalidProvider(String),

    /// One or more attributes failed validation.
    #[error("{}", join_diagnostics(.0))]
    Validation(Vec<Diagnostic>),

    /// Transport-level failure.
    #[error("{0}")]
    Transport(String),

    /// The remote entity does not exist.
    #[error("{what} not found")]
    NotFound {
        /// What was looked up.
        what: String,
    },

    /// The remote returned a domain-level objection.
    #[error("{kind}: {message}")]
    Problem {
        /// Problem type name reported by the API.
        kind: String,
        /// Problem message.
        message: String,
    },

    /// Import identifier has the wrong shape.
    #[error("Import ID must be in the format: {expected}")]
    ImportId {
        /// Expected components joined by `:`.
        expected: String,
    },

    /// Operation deliberately not supported; the message names the remediation.
    #[error("{0}")]
    Refusal(String),

    /// Cancelled by the host.
    #[error("operation cancelled")]
    Cancelled,

    /// A framework invariant was broken.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

fn join_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Create a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a validation error for a single attribute.
    pub fn invalid(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Validation(vec![Diagnostic::error("Invalid attribute value", detail).at(path)])
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidProvider(_) => ErrorCategory::InvalidProvider,
            Error::Validation(_) => ErrorCategory::Validation,
            Error::Transport(_) => ErrorCategory::Transport,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Problem { .. } => ErrorCategory::Problem,
            Error::ImportId { .. } => ErrorCategory::ImportId,
            Error::Refusal(_) => ErrorCategory::Refusal,
            Error::Cancelled => ErrorCategory::Cancelled,
            Error::InvalidState(_) => ErrorCategory::Internal,
        }
    }

    /// Whether the remote reported the entity missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Render the error as host diagnostics.
    ///
    /// Validation errors keep their per-attribute diagnostics; everything else
    /// becomes a single diagnostic whose summary names the category.
    pub fn to_diagnostics(&self, operation: Operation) -> Vec<Diagnostic> {
        if let Error::Validation(diagnostics) = self {
            return diagnostics.clone();
        }
        let summary = match self {
            Error::InvalidProvider(_) => "Invalid provider",
            Error::NotFound { .. } => "Not found",
            Error::ImportId { .. } => "Invalid import ID",
            Error::Problem { .. } => "Problem",
            _ => match operation {
                Operation::Create => "Create error",
                Operation::Delete => "Delete error",
                _ => "Client error",
            },
        };
        vec![Diagnostic::error(summary, self.to_string())]
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidState(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::Transport.is_retryable());
        assert!(!ErrorCategory::NotFound.is_retryable());
        assert!(!ErrorCategory::Problem.is_retryable());
        assert!(!ErrorCategory::Refusal.is_retryable());
    }

    #[test]
    fn test_error_category_description_and_advice() {
        for category in [
            ErrorCategory::InvalidProvider,
            ErrorCategory::Validation,
            ErrorCategory::Transport,
            ErrorCategory::NotFound,
            ErrorCategory::Problem,
            ErrorCategory::ImportId,
            ErrorCategory::Refusal,
            ErrorCategory::Cancelled,
            ErrorCategory::Internal,
        ] {
            assert!(!category.description().is_empty());
            assert!(!category.advice().is_empty());
        }
    }

    #[test]
    fn test_import_id_message() {
        let err = Error::ImportId {
            expected: "group_uuid:account_key".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Import ID must be in the format: group_uuid:account_key"
        );
        assert_eq!(err.category(), ErrorCategory::ImportId);
    }

    #[test]
    fn test_summary_depends_on_operation() {
        let err = Error::Transport("connection reset".to_string());
        assert_eq!(err.to_diagnostics(Operation::Create)[0].summary, "Create error");
        assert_eq!(err.to_diagnostics(Operation::Delete)[0].summary, "Delete error");
        assert_eq!(err.to_diagnostics(Operation::Read)[0].summary, "Client error");
    }

    #[test]
    fn test_fixed_summaries() {
        let problem = Error::Problem {
            kind: "InvalidInput".to_string(),
            message: "bad".to_string(),
        };
        assert_eq!(problem.to_diagnostics(Operation::Update)[0].summary, "Problem");
        assert_eq!(
            Error::not_found("account").to_diagnostics(Operation::Update)[0].summary,
            "Not found"
        );
    }

    #[test]
    fn test_validation_keeps_paths() {
        let err = Error::invalid("group_uuid", "must be a UUID");
        let diags = err.to_diagnostics(Operation::Plan);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].path.as_deref(), Some("group_uuid"));
        assert!(err.to_string().contains("must be a UUID"));
    }
}
