//! Error model for token and policy operations.

use serde::Serialize;
use thiserror::Error;

/// Result type used across the auth core.
pub type AuthResult<T> = Result<T, AuthError>;

/// Stable, caller-visible error codes.
///
/// The snake_case form is what goes out on the wire as `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidToken,
    SignatureInvalid,
    TokenExpired,
    MissingClaims,
    InvalidRole,
    InvalidExpiresIn,
    ClaimMismatch,
    KeyUnavailable,
    PermissionCheckFailed,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidToken => "invalid_token",
            ErrorKind::SignatureInvalid => "signature_invalid",
            ErrorKind::TokenExpired => "token_expired",
            ErrorKind::MissingClaims => "missing_claims",
            ErrorKind::InvalidRole => "invalid_role",
            ErrorKind::InvalidExpiresIn => "invalid_expires_in",
            ErrorKind::ClaimMismatch => "claim_mismatch",
            ErrorKind::KeyUnavailable => "key_unavailable",
            ErrorKind::PermissionCheckFailed => "permission_check_failed",
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors raised by issuance, verification and evaluation.
///
/// Display strings are safe to show to callers: they never include key
/// material, signatures or raw token contents.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("malformed token: {0}")]
    InvalidToken(String),

    #[error("token signature could not be verified")]
    SignatureInvalid,

    #[error("token expired at {exp}")]
    TokenExpired { exp: i64 },

    #[error("missing required claims: {}", .0.join(", "))]
    MissingClaims(Vec<&'static str>),

    #[error("invalid role '{0}': expected one of Admin, Developer, Viewer")]
    InvalidRole(String),

    #[error("invalid expiresIn '{0}': expected a positive duration such as 30m, 24h or 7d")]
    InvalidExpiresIn(String),

    #[error("token claim '{claim}' does not match the expected value")]
    ClaimMismatch { claim: &'static str },

    #[error("signing key unavailable: {0}")]
    KeyUnavailable(String),

    #[error("permission check failed: {0}")]
    PermissionCheckFailed(String),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidToken(_) => ErrorKind::InvalidToken,
            AuthError::SignatureInvalid => ErrorKind::SignatureInvalid,
            AuthError::TokenExpired { .. } => ErrorKind::TokenExpired,
            AuthError::MissingClaims(_) => ErrorKind::MissingClaims,
            AuthError::InvalidRole(_) => ErrorKind::InvalidRole,
            AuthError::InvalidExpiresIn(_) => ErrorKind::InvalidExpiresIn,
            AuthError::ClaimMismatch { .. } => ErrorKind::ClaimMismatch,
            AuthError::KeyUnavailable(_) => ErrorKind::KeyUnavailable,
            AuthError::PermissionCheckFailed(_) => ErrorKind::PermissionCheckFailed,
        }
    }

    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::InvalidToken(msg.into())
    }

    pub fn key_unavailable(msg: impl Into<String>) -> Self {
        Self::KeyUnavailable(msg.into())
    }
}
