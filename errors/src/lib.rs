//! # Entitlement Engine Errors
//!
//! Structured error taxonomy for the entitlement catalog and activation
//! engine.
//!
//! Follows Microsoft Pragmatic Rust Guidelines:
//! - Uses `thiserror` for structured error definitions
//! - Provides `Display` and `Error` trait implementations
//! - Includes error context for debugging

use thiserror::Error;

/// Errors raised anywhere in the entitlement catalog and activation engine.
///
/// Every fallible operation in `core` and `entitlements` returns
/// `Result<T, CoreError>`. The HTTP layer (out of scope here) maps
/// [`CoreError::kind`] to a status code; see the kind table for the mapping
/// this taxonomy assumes.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not authenticated: {reason}")]
    NotAuthenticated { reason: String },

    #[error("access denied: {reason}")]
    AccessDenied { reason: String },

    #[error("resource not found: {resource}")]
    ResourceNotFound { resource: String },

    #[error("quota exceeded: {reason}")]
    QuotaExceeded { reason: String },

    #[error("resource exhausted: {reason}")]
    ResourceExhausted { reason: String },

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("invalid token: {reason}")]
    InvalidToken { reason: String },

    #[error("already exists: {resource}")]
    AlreadyExists { resource: String },

    #[error("feature not available: {reason}")]
    FeatureNotAvailable { reason: String },

    #[error("conflict retry exhausted after {attempts} attempts on {resource}")]
    ConflictRetryExhausted { resource: String, attempts: u32 },

    #[error("operation did not complete: {reason}")]
    IncompleteOperation { reason: String },

    #[error("token signing failed: {0}")]
    TokenCodec(#[from] jsonwebtoken::errors::Error),

    #[error("invalid justification pattern: {0}")]
    PatternCompile(#[from] regex::Error),
}

/// Coarse classification used by an external layer to pick a status code.
///
/// `NotAuthenticated -> 401`, `AccessDenied -> 403`, `ResourceNotFound -> 404`,
/// `InvalidArgument | InvalidToken -> 400`, `AlreadyExists -> 409`,
/// `QuotaExceeded | ResourceExhausted | ConflictRetryExhausted -> 429`,
/// `FeatureNotAvailable | IncompleteOperation -> 500`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotAuthenticated,
    AccessDenied,
    ResourceNotFound,
    QuotaExceeded,
    ResourceExhausted,
    InvalidArgument,
    InvalidToken,
    AlreadyExists,
    FeatureNotAvailable,
    ConflictRetryExhausted,
    IncompleteOperation,
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAuthenticated { .. } => ErrorKind::NotAuthenticated,
            Self::AccessDenied { .. } => ErrorKind::AccessDenied,
            Self::ResourceNotFound { .. } => ErrorKind::ResourceNotFound,
            Self::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            Self::ResourceExhausted { .. } => ErrorKind::ResourceExhausted,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::InvalidToken { .. } | Self::TokenCodec(_) => ErrorKind::InvalidToken,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::FeatureNotAvailable { .. } => ErrorKind::FeatureNotAvailable,
            Self::ConflictRetryExhausted { .. } => ErrorKind::ConflictRetryExhausted,
            Self::IncompleteOperation { .. } => ErrorKind::IncompleteOperation,
            Self::PatternCompile(_) => ErrorKind::InvalidArgument,
        }
    }

    /// Backoff-eligible kinds, per the taxonomy in the design notes.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::QuotaExceeded | ErrorKind::ResourceExhausted
        )
    }

    pub fn not_authenticated(reason: impl Into<String>) -> Self {
        Self::NotAuthenticated { reason: reason.into() }
    }

    pub fn access_denied(reason: impl Into<String>) -> Self {
        Self::AccessDenied { reason: reason.into() }
    }

    pub fn resource_not_found(resource: impl Into<String>) -> Self {
        Self::ResourceNotFound { resource: resource.into() }
    }

    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument { reason: reason.into() }
    }

    pub fn invalid_token(reason: impl Into<String>) -> Self {
        Self::InvalidToken { reason: reason.into() }
    }

    pub fn already_exists(resource: impl Into<String>) -> Self {
        Self::AlreadyExists { resource: resource.into() }
    }

    pub fn feature_not_available(reason: impl Into<String>) -> Self {
        Self::FeatureNotAvailable { reason: reason.into() }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_maps_retryable_errors() {
        let quota = CoreError::QuotaExceeded { reason: "too many requests".into() };
        assert!(quota.is_retryable());

        let denied = CoreError::access_denied("caller lacks permission");
        assert!(!denied.is_retryable());
    }

    #[test]
    fn display_includes_context() {
        let err = CoreError::already_exists("roles/browser@project-1");
        assert_eq!(err.to_string(), "already exists: roles/browser@project-1");
    }
}
