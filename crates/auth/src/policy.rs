//! Single entry point for request handling: verify the token, then evaluate.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::authorize::{AccessRequest, PermissionCheckResult, PermissionEvaluator};
use crate::token::TokenCodec;
use crate::{AuthError, AuthResult, TokenPayload};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyVerdict {
    /// The token verified and the evaluator produced a decision.
    Evaluated {
        payload: TokenPayload,
        result: PermissionCheckResult,
    },
    /// The token did not verify; the evaluator was never consulted.
    InvalidToken { cause: AuthError },
}

impl PolicyVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PolicyVerdict::Evaluated { result, .. } if result.allowed)
    }
}

pub struct PolicyFacade {
    codec: Arc<TokenCodec>,
    evaluator: PermissionEvaluator,
}

impl PolicyFacade {
    pub fn new(codec: Arc<TokenCodec>, evaluator: PermissionEvaluator) -> Self {
        Self { codec, evaluator }
    }

    /// Check a raw token against `(method, path)` at time `now`.
    ///
    /// Errors only with `permission_check_failed`; token problems come back
    /// as [`PolicyVerdict::InvalidToken`].
    pub fn check(
        &self,
        token: &str,
        method: &str,
        path: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<PolicyVerdict> {
        let payload = match self.codec.verify(token, now) {
            Ok(payload) => payload,
            Err(cause) => return Ok(PolicyVerdict::InvalidToken { cause }),
        };

        let result = self.evaluator.evaluate(&AccessRequest {
            role: payload.role.as_str(),
            method,
            path,
            allow: &payload.permissions,
            deny: &payload.deny_permissions,
        })?;

        Ok(PolicyVerdict::Evaluated { payload, result })
    }
}
