// src/error.rs
//! Application error types with structured error handling.
//!
//! Error types form the vocabulary for failure modes in the system.
//! Each error variant tells the story of what went wrong and where,
//! enabling composable recovery strategies.

use std::fmt;
use thiserror::Error;

/// Notion API error codes as a typed vocabulary.
///
/// Instead of matching against magic strings like `"rate_limited"`,
/// the domain vocabulary is encoded in the type system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotionErrorCode {
    /// API rate limit exceeded — back off and retry.
    RateLimited,
    /// The requested object does not exist or is inaccessible.
    ObjectNotFound,
    /// API key is invalid or expired.
    Unauthorized,
    /// API key lacks permission for this resource.
    RestrictedResource,
    /// Request body contains invalid JSON.
    InvalidJson,
    /// Request parameters failed Notion's validation.
    ValidationFailed,
    /// Conflict with current state of the resource.
    Conflict,
    /// Notion internal server error.
    InternalError,
    /// Notion is temporarily unavailable.
    ServiceUnavailable,
    /// HTTP status code fallback when the error body is unparseable.
    HttpStatus(u16),
    /// An error code this client doesn't recognize yet.
    Unknown(String),
}

impl NotionErrorCode {
    /// Parse a Notion API error code string into the typed vocabulary.
    pub fn from_api_response(code: &str) -> Self {
        match code {
            "rate_limited" => Self::RateLimited,
            "object_not_found" => Self::ObjectNotFound,
            "unauthorized" => Self::Unauthorized,
            "restricted_resource" => Self::RestrictedResource,
            "invalid_json" => Self::InvalidJson,
            "validation_error" => Self::ValidationFailed,
            "conflict_error" => Self::Conflict,
            "internal_server_error" => Self::InternalError,
            "service_unavailable" => Self::ServiceUnavailable,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Create from an HTTP status code when the error body is unparseable.
    pub fn from_http_status(status: u16) -> Self {
        Self::HttpStatus(status)
    }

    /// Whether this error is transient and worth the caller retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::ServiceUnavailable | Self::InternalError
        )
    }

    /// Whether this error means the resource simply doesn't exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ObjectNotFound)
    }
}

impl fmt::Display for NotionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate_limited"),
            Self::ObjectNotFound => write!(f, "object_not_found"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::RestrictedResource => write!(f, "restricted_resource"),
            Self::InvalidJson => write!(f, "invalid_json"),
            Self::ValidationFailed => write!(f, "validation_error"),
            Self::Conflict => write!(f, "conflict_error"),
            Self::InternalError => write!(f, "internal_server_error"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
            Self::HttpStatus(code) => write!(f, "http_{}", code),
            Self::Unknown(code) => write!(f, "{}", code),
        }
    }
}

/// Main application error type. Discriminators line up with the error
/// taxonomy in spec §7: `TransportError`, `ApiError`, `ParseError`,
/// `FilesystemError`, `ValidationError`, `Cancelled`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Transport error: {0}")]
    TransportError(#[from] reqwest::Error),

    #[error("Notion API returned an error ({code}, status {status}): {message}")]
    ApiError {
        status: u16,
        code: NotionErrorCode,
        message: String,
    },

    #[error("Failed to parse response: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Filesystem error: {0}")]
    FilesystemError(#[from] std::io::Error),

    #[error(transparent)]
    ValidationError(#[from] crate::types::ValidationError),

    #[error("Extraction cancelled")]
    Cancelled,

    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Manifest parse error: {0}")]
    ManifestError(String),
}

impl AppError {
    /// True for errors the orchestrator should treat as fatal during
    /// bootstrap, rather than a per-entity warning (spec §7 propagation
    /// policy).
    pub fn is_fatal_bootstrap_error(&self) -> bool {
        matches!(
            self,
            AppError::FilesystemError(_) | AppError::ManifestError(_) | AppError::Cancelled
        )
    }
}

/// Domain vocabulary for why a database fetch failed. Not an error type
/// itself — a classification used to decide whether a linked-database
/// fallback applies.
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseFetchFailure {
    /// The database is a linked database (Notion API limitation: linked
    /// databases can be queried but not retrieved directly).
    LinkedDatabase,
    PermissionDenied { reason: String },
    NotFound,
    Other { cause: String },
}

impl fmt::Display for DatabaseFetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkedDatabase => write!(
                f,
                "linked database (Notion API does not support retrieving linked databases)"
            ),
            Self::PermissionDenied { reason } => write!(f, "permission denied: {}", reason),
            Self::NotFound => write!(f, "database not found"),
            Self::Other { cause } => write!(f, "{}", cause),
        }
    }
}

/// Classifies a database-fetch error into a domain-specific failure reason,
/// used by the orchestrator's linked-database fallback.
pub fn classify_database_fetch_failure(error: &AppError) -> DatabaseFetchFailure {
    match error {
        AppError::ApiError { code, message, .. } => {
            if message.contains("linked database") {
                DatabaseFetchFailure::LinkedDatabase
            } else if code.is_not_found() {
                DatabaseFetchFailure::NotFound
            } else if matches!(
                code,
                NotionErrorCode::RestrictedResource | NotionErrorCode::Unauthorized
            ) {
                DatabaseFetchFailure::PermissionDenied {
                    reason: message.clone(),
                }
            } else {
                DatabaseFetchFailure::Other {
                    cause: error.to_string(),
                }
            }
        }
        _ => DatabaseFetchFailure::Other {
            cause: error.to_string(),
        },
    }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linked_database_message_is_classified() {
        let err = AppError::ApiError {
            status: 400,
            code: NotionErrorCode::ValidationFailed,
            message: "https://api.notion.com/v1: linked database".to_string(),
        };
        assert_eq!(
            classify_database_fetch_failure(&err),
            DatabaseFetchFailure::LinkedDatabase
        );
    }

    #[test]
    fn not_found_code_is_classified() {
        let err = AppError::ApiError {
            status: 404,
            code: NotionErrorCode::ObjectNotFound,
            message: "not found".to_string(),
        };
        assert_eq!(
            classify_database_fetch_failure(&err),
            DatabaseFetchFailure::NotFound
        );
    }
}
