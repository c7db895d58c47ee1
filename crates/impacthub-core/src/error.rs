//! Error types for ImpactHub operations

use thiserror::Error;

/// Result type alias for ImpactHub operations
pub type ImpactResult<T> = std::result::Result<T, ImpactError>;

/// Errors that can occur in ImpactHub operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImpactError {
    // === Caller Errors ===
    /// Referenced user, proposal or project does not exist
    #[error("{0}")]
    NotFound(String),

    /// Insufficient reputation
    #[error("{0}")]
    Forbidden(String),

    /// Too many actions in the current rate-limit window
    #[error("{0}")]
    RateLimited(String),

    /// Request is well-formed but not acceptable in the current state
    #[error("{0}")]
    BadRequest(String),

    // === Store Errors ===
    /// An atomic batch was rejected and rolled back
    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),

    /// Backend failure
    #[error("Storage error: {0}")]
    Storage(String),

    // === General Errors ===
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ImpactError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest(reason.into())
    }

    /// HTTP status code for API responses
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Forbidden(_) | Self::RateLimited(_) => 403,
            Self::BadRequest(_) => 400,
            Self::TransactionAborted(_) => 409,
            Self::Storage(_) | Self::Config(_) => 500,
        }
    }

    /// Short error name for API responses
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Not Found",
            Self::Forbidden(_) | Self::RateLimited(_) => "Forbidden",
            Self::BadRequest(_) => "Bad Request",
            Self::TransactionAborted(_) => "Conflict",
            Self::Storage(_) | Self::Config(_) => "Internal Server Error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ImpactError::not_found("User not found").status_code(), 404);
        assert_eq!(ImpactError::forbidden("nope").status_code(), 403);
        assert_eq!(ImpactError::bad_request("Voting has ended").status_code(), 400);
        assert_eq!(ImpactError::Storage("disk".into()).status_code(), 500);
    }

    #[test]
    fn test_error_display() {
        let err = ImpactError::bad_request("Voting has ended");
        assert_eq!(err.to_string(), "Voting has ended");

        let err = ImpactError::TransactionAborted("vote already exists".into());
        assert!(err.to_string().contains("Transaction aborted"));
    }

    #[test]
    fn test_rate_limited_renders_as_forbidden() {
        let err = ImpactError::RateLimited("Rate limit exceeded for vote. Maximum 20 per 24 hours.".into());
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.kind(), "Forbidden");
        assert_eq!(err.to_string(), "Rate limit exceeded for vote. Maximum 20 per 24 hours.");
    }
}
