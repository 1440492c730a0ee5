//! Error taxonomy for remote calls and configuration.
//!
//! Callers branch on [`ApiError::class`] instead of matching error strings.
//!
//! ## Classes
//!
//! | Class      | Meaning                  | Treated as            |
//! |------------|--------------------------|-----------------------|
//! | NotFound   | resource does not exist  | absence, not failure  |
//! | Conflict   | resource already exists  | idempotent success    |
//! | Other      | anything else            | failure (retried)     |

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for remote API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// How a workflow should react to an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    Conflict,
    Other,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Failure of a single remote API call.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The referenced contact, channel or response plan does not exist.
    #[error("{operation}: not found: {message}")]
    NotFound { operation: String, message: String },

    /// The resource being created already exists.
    #[error("{operation}: already exists: {message}")]
    Conflict { operation: String, message: String },

    /// Any other service, transport or credential failure.
    #[error("{operation} failed{}: {message}", code_suffix(.code))]
    Remote {
        operation: String,
        code: Option<String>,
        message: String,
    },

    /// The request could not be built locally (missing required field).
    #[error("{operation}: invalid request: {message}")]
    InvalidRequest { operation: String, message: String },
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(" [{c}]")).unwrap_or_default()
}

impl ApiError {
    pub fn not_found(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn conflict(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn remote(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            operation: operation.into(),
            code: None,
            message: message.into(),
        }
    }

    pub fn invalid_request(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Classify this error for workflow decisions.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::Conflict { .. } => ErrorClass::Conflict,
            Self::Remote { .. } | Self::InvalidRequest { .. } => ErrorClass::Other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.class() == ErrorClass::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.class() == ErrorClass::Conflict
    }
}

/// Problems loading or validating the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Every validation problem found, one message each.
    #[error("invalid configuration:\n  - {}", .0.join("\n  - "))]
    Invalid(Vec<String>),

    #[error("invalid value for {key}: {value}")]
    Env { key: String, value: String },
}
