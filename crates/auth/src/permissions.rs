//! Permission patterns and persisted permission records.
//!
//! A pattern string has the form `action:path`, e.g. `write:App/*/data`.
//! The bare string `*` grants any action on any path.
//!
//! Actions: `*`, `admin` and `all` match any method; `read` matches GET, HEAD
//! and OPTIONS; `write` matches POST, PUT, PATCH and DELETE; `delete` matches
//! DELETE. Anything else is taken as a literal HTTP method.
//!
//! Paths are `/`-delimited. A `*` segment matches exactly one request segment,
//! except in final position where it (like `**`) matches any remaining
//! segments, including none. Path segments compare case-sensitively.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Role;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid permission pattern '{pattern}': {reason}")]
pub struct PatternError {
    pub pattern: String,
    pub reason: &'static str,
}

/// Which request methods a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodMatcher {
    Any,
    Read,
    Write,
    Delete,
    Exact(String),
}

impl MethodMatcher {
    /// `method` must already be uppercase.
    pub fn matches(&self, method: &str) -> bool {
        match self {
            MethodMatcher::Any => true,
            MethodMatcher::Read => matches!(method, "GET" | "HEAD" | "OPTIONS"),
            MethodMatcher::Write => matches!(method, "POST" | "PUT" | "PATCH" | "DELETE"),
            MethodMatcher::Delete => method == "DELETE",
            MethodMatcher::Exact(expected) => expected == method,
        }
    }
}

impl FromStr for MethodMatcher {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty action");
        }
        if !s.chars().all(|c| c.is_ascii_alphabetic() || c == '*') {
            return Err("action must be alphabetic or '*'");
        }
        Ok(match s.to_ascii_lowercase().as_str() {
            "*" | "admin" | "all" => MethodMatcher::Any,
            "read" => MethodMatcher::Read,
            "write" => MethodMatcher::Write,
            "delete" => MethodMatcher::Delete,
            _ if s.contains('*') => return Err("wildcard actions must be exactly '*'"),
            _ => MethodMatcher::Exact(s.to_ascii_uppercase()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    AnyOne,
    Rest,
}

/// A parsed path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, &'static str> {
        let parts = split_segments(raw);
        if parts.is_empty() {
            return Err("empty path");
        }

        let last = parts.len() - 1;
        let mut segments = Vec::with_capacity(parts.len());
        for (idx, part) in parts.into_iter().enumerate() {
            let segment = match part {
                "**" if idx == last => Segment::Rest,
                "**" => return Err("'**' is only allowed as the final segment"),
                "*" if idx == last => Segment::Rest,
                "*" => Segment::AnyOne,
                literal => Segment::Literal(literal.to_string()),
            };
            segments.push(segment);
        }
        Ok(Self { segments })
    }

    pub fn matches(&self, path: &[&str]) -> bool {
        let mut remaining = path;
        for segment in &self.segments {
            match segment {
                Segment::Rest => return true,
                Segment::AnyOne => match remaining.split_first() {
                    Some((_, rest)) => remaining = rest,
                    None => return false,
                },
                Segment::Literal(expected) => match remaining.split_first() {
                    Some((actual, rest)) if *actual == expected.as_str() => remaining = rest,
                    _ => return false,
                },
            }
        }
        remaining.is_empty()
    }
}

/// One `action:path` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionPattern {
    raw: String,
    method: MethodMatcher,
    path: PathPattern,
}

impl PermissionPattern {
    pub fn new(method: MethodMatcher, path: PathPattern, raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            method,
            path,
        }
    }

    /// The rule as it was written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, method: &str, path: &[&str]) -> bool {
        self.method.matches(method) && self.path.matches(path)
    }
}

impl FromStr for PermissionPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| PatternError {
            pattern: s.to_string(),
            reason,
        };

        if s.trim() == "*" {
            return Ok(Self::new(MethodMatcher::Any, PathPattern::parse("*").map_err(err)?, s));
        }

        let (action, path) = s.split_once(':').ok_or_else(|| err("expected 'action:path'"))?;
        let method = action.parse().map_err(err)?;
        let path = PathPattern::parse(path).map_err(err)?;
        Ok(Self::new(method, path, s))
    }
}

impl core::fmt::Display for PermissionPattern {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Split a request or pattern path into segments.
///
/// Leading/trailing slashes and empty segments are dropped; anything after
/// `?` or `#` is ignored.
pub fn split_segments(path: &str) -> Vec<&str> {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    path[..end].split('/').filter(|s| !s.is_empty()).collect()
}

/// Effect of a persisted permission record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "lowercase")]
pub enum Access {
    Allow {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Deny {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl Access {
    pub fn allow() -> Self {
        Access::Allow { reason: None }
    }

    pub fn deny() -> Self {
        Access::Deny { reason: None }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, Access::Allow { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Access::Allow { reason } | Access::Deny { reason } => reason.as_deref(),
        }
    }
}

/// A role-default rule owned by the permission store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRecord {
    pub role: Role,
    pub path_pattern: String,
    pub method: String,
    pub access: Access,
}

impl PermissionRecord {
    pub fn new(role: Role, method: impl Into<String>, path_pattern: impl Into<String>, access: Access) -> Self {
        Self {
            role,
            path_pattern: path_pattern.into(),
            method: method.into(),
            access,
        }
    }

    /// Record rendered in pattern form, e.g. `GET:App/*`.
    pub fn describe(&self) -> String {
        format!("{}:{}", self.method, self.path_pattern)
    }

    pub fn to_pattern(&self) -> Result<PermissionPattern, PatternError> {
        let err = |reason| PatternError {
            pattern: self.describe(),
            reason,
        };
        let method = self.method.parse().map_err(err)?;
        let path = PathPattern::parse(&self.path_pattern).map_err(err)?;
        Ok(PermissionPattern::new(method, path, self.describe()))
    }
}
