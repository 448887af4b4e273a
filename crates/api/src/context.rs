use diagate_auth::{PermissionCheckResult, TokenPayload};

/// Identity attached to a request that passed the policy gate.
///
/// Immutable; handlers read it through `Extension<VerifiedIdentity>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    payload: TokenPayload,
    decision: PermissionCheckResult,
}

impl VerifiedIdentity {
    pub fn new(payload: TokenPayload, decision: PermissionCheckResult) -> Self {
        Self { payload, decision }
    }

    pub fn payload(&self) -> &TokenPayload {
        &self.payload
    }

    pub fn decision(&self) -> &PermissionCheckResult {
        &self.decision
    }
}
