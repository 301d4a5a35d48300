//! Error types for GraphQL operations.

/// Result type alias for GraphQL operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to a GraphQL endpoint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// The response carried GraphQL `errors`.
    #[error("GraphQL error: {}", .0.join("; "))]
    GraphQl(Vec<String>),

    /// The requested entity does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A mutation payload carried `problems`.
    #[error("{kind}: {message}")]
    Problem {
        /// `__typename` of the first problem.
        kind: String,
        /// Problem messages.
        message: String,
    },

    /// The response did not have the expected shape.
    #[error("invalid API response: {0}")]
    Decode(String),

    /// Cancelled before the response was used.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// Whether this error is typically transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => status.is_none_or(|s| s >= 500 || s == 429),
            _ => false,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::http(format!("HTTP {code}"), Some(code)),
            other => Self::http(other.to_string(), None),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<declarative::Error> for Error {
    fn from(err: declarative::Error) -> Self {
        match err {
            declarative::Error::Cancelled => Self::Cancelled,
            other => Self::Decode(other.to_string()),
        }
    }
}

impl From<Error> for declarative::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound(what) => Self::NotFound { what },
            Error::Problem { kind, message } => Self::Problem { kind, message },
            Error::Cancelled => Self::Cancelled,
            other => Self::Transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_retryable() {
        assert!(Error::http("reset", None).is_retryable());
        assert!(Error::http("HTTP 503", Some(503)).is_retryable());
        assert!(!Error::http("HTTP 401", Some(401)).is_retryable());
        assert!(!Error::NotFound("account".into()).is_retryable());
    }

    #[test]
    fn test_into_declarative() {
        let err: declarative::Error = Error::NotFound("report group weekly".into()).into();
        assert!(err.is_not_found());

        let err: declarative::Error = Error::Problem {
            kind: "ValidationProblem".into(),
            message: "bad key".into(),
        }
        .into();
        assert_eq!(err.to_string(), "ValidationProblem: bad key");

        let err: declarative::Error = Error::http("HTTP 502", Some(502)).into();
        assert!(matches!(err, declarative::Error::Transport(ref m) if m.contains("502")));

        let err: declarative::Error = Error::Cancelled.into();
        assert!(matches!(err, declarative::Error::Cancelled));
    }

    #[test]
    fn test_graphql_display() {
        let err = Error::GraphQl(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "GraphQL error: a; b");
    }
}
