use serde::{Deserialize, Serialize};

use diagate_auth::{ClaimsRequest, PermissionCheckResult, Role};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTokenRequest {
    #[serde(flatten)]
    pub claims: ClaimsRequest,
    pub expires_in: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckRequest {
    pub token: String,
    pub method: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResponse {
    pub allowed: bool,
    pub reason: String,
    pub details: CheckDetails,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckDetails {
    pub required_permissions: Vec<String>,
    pub user_permissions: Vec<String>,
    pub current_role: Role,
    pub resource: String,
    pub action: String,
}

impl CheckResponse {
    pub fn new(role: Role, result: PermissionCheckResult) -> Self {
        Self {
            allowed: result.allowed,
            reason: result.reason,
            details: CheckDetails {
                required_permissions: result.required_permissions,
                user_permissions: result.user_permissions,
                current_role: role,
                resource: result.resource,
                action: result.action,
            },
        }
    }
}
