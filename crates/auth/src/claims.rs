use serde::{Deserialize, Serialize};

use crate::{AuthError, AuthResult, Role};

pub const DEFAULT_OID: &str = "default";
pub const DEFAULT_SCOPE: &str = "api:access";
pub const DEFAULT_EXPIRES_IN: &str = "24h";

/// Claims as requested by a caller, before validation.
///
/// Everything is optional here so that absent fields can be reported together
/// as `missing_claims` instead of failing on the first one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimsRequest {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub oid: Option<String>,
    pub permissions: Option<Vec<String>>,
    pub deny_permissions: Option<Vec<String>>,
    pub scope: Option<String>,
    pub client_id: Option<String>,
}

/// Identity claims after validation and defaulting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    pub user_id: String,
    pub email: String,
    pub role: Role,
    pub oid: String,
    pub permissions: Vec<String>,
    pub deny_permissions: Vec<String>,
    pub scope: String,
    pub client_id: Option<String>,
}

/// Issuance options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueOptions {
    /// Lifetime in the `expiresIn` grammar (`"24h"`, `"30m"`, ...).
    pub expires_in: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl Default for IssueOptions {
    fn default() -> Self {
        Self {
            expires_in: DEFAULT_EXPIRES_IN.to_string(),
            issuer: None,
            audience: None,
        }
    }
}

/// Signed token body.
///
/// Immutable once issued; `jti` and `exp` are the only fields that matter for
/// replay/expiry bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPayload {
    pub user_id: String,
    pub email: String,
    pub role: Role,
    pub oid: String,
    pub permissions: Vec<String>,
    pub deny_permissions: Vec<String>,
    pub scope: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

impl TokenPayload {
    /// Reject payloads whose lifetime is empty or inverted.
    pub fn validate_time_window(&self) -> AuthResult<()> {
        if self.exp <= self.iat {
            return Err(AuthError::invalid_token("exp must be after iat"));
        }
        Ok(())
    }
}

/// Validate a claims request and apply defaults.
///
/// Missing fields are reported before the role is checked, so a request with
/// only a (bogus) role still yields `missing_claims`.
pub fn validate_claims(request: ClaimsRequest) -> AuthResult<IdentityClaims> {
    let user_id = non_empty(request.user_id);
    let email = non_empty(request.email);
    let role = non_empty(request.role);

    let mut missing = Vec::new();
    if user_id.is_none() {
        missing.push("userId");
    }
    if email.is_none() {
        missing.push("email");
    }
    if role.is_none() {
        missing.push("role");
    }

    let (Some(user_id), Some(email), Some(role)) = (user_id, email, role) else {
        return Err(AuthError::MissingClaims(missing));
    };

    let role: Role = role.parse()?;

    Ok(IdentityClaims {
        user_id,
        email,
        role,
        oid: non_empty(request.oid).unwrap_or_else(|| DEFAULT_OID.to_string()),
        permissions: request.permissions.unwrap_or_default(),
        deny_permissions: request.deny_permissions.unwrap_or_default(),
        scope: non_empty(request.scope).unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
        client_id: non_empty(request.client_id),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
