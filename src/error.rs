//! Error types for the StoRM info provider
//!
//! Provides structured error types for configuration loading, backend
//! access, space aggregation and LDIF export, together with the failure
//! classification used by the backend retry loop.

use thiserror::Error;

/// Unified error type for the info provider
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Configuration error: Missing mandatory {key} variable!")]
    MissingConfigurationKey { key: String },

    #[error("Configuration error: invalid value '{value}' for {key}")]
    InvalidConfigurationValue { key: String, value: String },

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // =========================================================================
    // Data Inconsistency Errors
    // =========================================================================
    #[error("Storage area registered twice: {name}")]
    DuplicateStorageArea { name: String },

    #[error("Unknown quality level index: {index}")]
    UnknownQualityLevel { index: i64 },

    // =========================================================================
    // Backend Errors
    // =========================================================================
    #[error("Backend connection error: {0}")]
    BackendConnection(#[from] reqwest::Error),

    #[error("Backend returned HTTP {status} for {url}")]
    BackendStatus { url: String, status: u16 },

    #[error("Malformed backend response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    #[error("Unable to contact {url} after {attempts} attempts: {reason}")]
    BackendUnavailable {
        url: String,
        attempts: u32,
        reason: String,
    },

    // =========================================================================
    // Export Errors
    // =========================================================================
    #[error("File system error on {path}: {source}")]
    FileSystem {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid backup file pattern: {0}")]
    BackupPattern(#[from] glob::PatternError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Broad category of an error, deciding how far it may propagate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection failures, timeouts and malformed backend answers
    TransientNetwork,
    /// Missing or invalid configuration values
    Configuration,
    /// Inconsistent input data (duplicates, unknown indexes)
    DataInconsistency,
    /// Output files cannot be written or rotated
    FileSystem,
    /// Anything else
    Internal,
}

/// Whether a failed backend call is worth another attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Back off and try again
    Retryable,
    /// Give up immediately
    Fatal,
}

impl Error {
    /// Determine the category of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::BackendConnection(_)
            | Error::BackendStatus { .. }
            | Error::MalformedResponse { .. }
            | Error::BackendUnavailable { .. } => ErrorCategory::TransientNetwork,

            Error::Configuration(_)
            | Error::MissingConfigurationKey { .. }
            | Error::InvalidConfigurationValue { .. }
            | Error::YamlParse(_) => ErrorCategory::Configuration,

            Error::DuplicateStorageArea { .. } | Error::UnknownQualityLevel { .. } => {
                ErrorCategory::DataInconsistency
            }

            Error::FileSystem { .. } | Error::BackupPattern(_) | Error::Io(_) => {
                ErrorCategory::FileSystem
            }

            Error::Json(_) | Error::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        classify_failure(self) == FailureClass::Retryable
    }

    /// Check if this error is absorbed by the space aggregator
    pub fn is_transient(&self) -> bool {
        self.category() == ErrorCategory::TransientNetwork
    }

    /// Wrap an IO error with the path it happened on
    pub fn file_system(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Error::FileSystem {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

/// Classify a failed backend call for the retry loop.
///
/// Transport failures and HTTP error statuses are retried. A response that
/// arrived but cannot be decoded will not get better by asking again.
pub fn classify_failure(err: &Error) -> FailureClass {
    match err {
        Error::BackendConnection(e) if e.is_decode() => FailureClass::Fatal,
        Error::BackendConnection(_) | Error::BackendStatus { .. } => FailureClass::Retryable,
        _ => FailureClass::Fatal,
    }
}

/// Result type alias for the info provider
pub type Result<T> = std::result::Result<T, Error>;
