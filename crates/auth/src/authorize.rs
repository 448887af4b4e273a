//! Request-to-policy evaluation.
//!
//! Order of evaluation:
//! 1. explicit deny patterns carried by the token
//! 2. explicit allow patterns carried by the token
//! 3. role-default records from the permission store
//! 4. default deny
//!
//! No IO beyond the store lookup, no panics.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::permissions::{PatternError, PermissionPattern, split_segments};
use crate::{AuthError, AuthResult, PermissionRecord, PermissionStore, Role};

/// How conflicting allow/deny matches are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Any matching deny rule wins over any matching allow rule.
    #[default]
    DenyWins,
}

/// Which stage produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    ExplicitDeny,
    ExplicitAllow,
    RoleDefault,
    DefaultDeny,
}

/// An access request as seen by the evaluator.
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    /// Raw role name; unknown roles simply get no role defaults.
    pub role: &'a str,
    pub method: &'a str,
    pub path: &'a str,
    pub allow: &'a [String],
    pub deny: &'a [String],
}

/// Outcome of a permission check. Always fully populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionCheckResult {
    pub allowed: bool,
    pub reason: String,
    pub required_permissions: Vec<String>,
    pub user_permissions: Vec<String>,
    pub decided_by: DecisionSource,
    /// Uppercased request method.
    pub action: String,
    /// Normalized request path.
    pub resource: String,
}

enum RuleMatch {
    Hit,
    Miss,
    Invalid(PatternError),
}

fn match_rule(
    pattern: Result<PermissionPattern, PatternError>,
    method: &str,
    path: &[&str],
) -> RuleMatch {
    match pattern {
        Ok(p) if p.matches(method, path) => RuleMatch::Hit,
        Ok(_) => RuleMatch::Miss,
        Err(err) => RuleMatch::Invalid(err),
    }
}

pub struct PermissionEvaluator {
    store: Arc<dyn PermissionStore>,
    conflict_policy: ConflictPolicy,
}

impl PermissionEvaluator {
    pub fn new(store: Arc<dyn PermissionStore>) -> Self {
        Self {
            store,
            conflict_policy: ConflictPolicy::default(),
        }
    }

    pub fn conflict_policy(&self) -> ConflictPolicy {
        self.conflict_policy
    }

    /// Decide whether `request` is allowed.
    ///
    /// Only a store failure produces an error (`permission_check_failed`);
    /// every other outcome is a populated result, denial by default.
    pub fn evaluate(&self, request: &AccessRequest<'_>) -> AuthResult<PermissionCheckResult> {
        let result = match self.conflict_policy {
            ConflictPolicy::DenyWins => self.evaluate_deny_wins(request)?,
        };

        tracing::debug!(
            role = request.role,
            action = %result.action,
            resource = %result.resource,
            allowed = result.allowed,
            decided_by = ?result.decided_by,
            "permission evaluated"
        );
        Ok(result)
    }

    fn evaluate_deny_wins(&self, request: &AccessRequest<'_>) -> AuthResult<PermissionCheckResult> {
        let method = request.method.trim().to_ascii_uppercase();
        let path = split_segments(request.path);
        let mut decision = Decision {
            action: method.clone(),
            resource: path.join("/"),
            user_permissions: request.allow.to_vec(),
        };

        for rule in request.deny {
            match match_rule(rule.parse(), &method, &path) {
                RuleMatch::Hit => {
                    return Ok(decision.deny(
                        DecisionSource::ExplicitDeny,
                        format!("denied by explicit rule {rule}"),
                        vec![rule.clone()],
                    ));
                }
                RuleMatch::Miss => {}
                RuleMatch::Invalid(err) => {
                    tracing::warn!(error = %err, "unparseable deny rule; failing closed");
                    return Ok(decision.deny(
                        DecisionSource::ExplicitDeny,
                        format!("denied: deny rule {rule} could not be parsed"),
                        vec![rule.clone()],
                    ));
                }
            }
        }

        for rule in request.allow {
            match match_rule(rule.parse(), &method, &path) {
                RuleMatch::Hit => {
                    return Ok(decision.allow(
                        DecisionSource::ExplicitAllow,
                        format!("allowed by explicit rule {rule}"),
                        vec![rule.clone()],
                    ));
                }
                RuleMatch::Miss => {}
                RuleMatch::Invalid(err) => {
                    tracing::warn!(error = %err, "skipping unparseable allow rule");
                }
            }
        }

        let Ok(role) = request.role.parse::<Role>() else {
            tracing::debug!(role = request.role, "unknown role; no role defaults apply");
            return Ok(decision.default_deny());
        };

        let records = self.store.records_for_role(role).map_err(|err| {
            tracing::error!(error = %err, role = %role, "permission store lookup failed");
            AuthError::PermissionCheckFailed("role permissions unavailable".to_string())
        })?;
        let records: Vec<&PermissionRecord> = records.iter().filter(|r| r.role == role).collect();

        decision.user_permissions.extend(
            records
                .iter()
                .filter(|r| r.access.is_allow())
                .map(|r| r.describe()),
        );

        let mut allowed_by: Option<&PermissionRecord> = None;
        for record in &records {
            match match_rule(record.to_pattern(), &method, &path) {
                RuleMatch::Hit if record.access.is_allow() => {
                    allowed_by.get_or_insert(*record);
                }
                RuleMatch::Hit => {
                    return Ok(decision.deny(
                        DecisionSource::RoleDefault,
                        role_reason("denied", role, record),
                        vec![record.describe()],
                    ));
                }
                RuleMatch::Miss => {}
                RuleMatch::Invalid(err) if record.access.is_allow() => {
                    tracing::warn!(error = %err, role = %role, "skipping unparseable role allow record");
                }
                RuleMatch::Invalid(err) => {
                    tracing::warn!(error = %err, role = %role, "unparseable role deny record; failing closed");
                    return Ok(decision.deny(
                        DecisionSource::RoleDefault,
                        format!("denied: {role} role deny record {} could not be parsed", record.describe()),
                        vec![record.describe()],
                    ));
                }
            }
        }

        match allowed_by {
            Some(record) => Ok(decision.allow(
                DecisionSource::RoleDefault,
                role_reason("allowed", role, record),
                vec![record.describe()],
            )),
            None => Ok(decision.default_deny()),
        }
    }
}

fn role_reason(verb: &str, role: Role, record: &PermissionRecord) -> String {
    match record.access.reason() {
        Some(note) => format!("{verb} by {role} role default {} ({note})", record.describe()),
        None => format!("{verb} by {role} role default {}", record.describe()),
    }
}

struct Decision {
    action: String,
    resource: String,
    user_permissions: Vec<String>,
}

impl Decision {
    fn finish(
        self,
        allowed: bool,
        decided_by: DecisionSource,
        reason: String,
        required_permissions: Vec<String>,
    ) -> PermissionCheckResult {
        PermissionCheckResult {
            allowed,
            reason,
            required_permissions,
            user_permissions: self.user_permissions,
            decided_by,
            action: self.action,
            resource: self.resource,
        }
    }

    fn allow(self, source: DecisionSource, reason: String, required: Vec<String>) -> PermissionCheckResult {
        self.finish(true, source, reason, required)
    }

    fn deny(self, source: DecisionSource, reason: String, required: Vec<String>) -> PermissionCheckResult {
        self.finish(false, source, reason, required)
    }

    fn default_deny(self) -> PermissionCheckResult {
        let required = vec![format!("{}:{}", self.action, self.resource)];
        self.finish(
            false,
            DecisionSource::DefaultDeny,
            "no matching permission; default deny".to_string(),
            required,
        )
    }
}
