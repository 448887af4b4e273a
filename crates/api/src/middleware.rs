use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use diagate_auth::PolicyVerdict;

use crate::app::AppState;
use crate::app::errors::{auth_error_to_response, json_error};
use crate::context::VerifiedIdentity;

/// Verify the bearer token and evaluate `(method, path)` through the facade.
pub async fn policy_gate(
    State(state): State<AppState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer(req.headers()) else {
        return json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_token",
            "missing bearer token",
        );
    };

    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();

    let verdict = match state.facade.check(token, &method, &path, Utc::now()) {
        Ok(verdict) => verdict,
        Err(e) => return auth_error_to_response(&e),
    };

    match verdict {
        PolicyVerdict::InvalidToken { cause } => auth_error_to_response(&cause),
        PolicyVerdict::Evaluated { result, .. } if !result.allowed => {
            json_error(StatusCode::FORBIDDEN, "forbidden", result.reason)
        }
        PolicyVerdict::Evaluated { payload, result } => {
            req.extensions_mut()
                .insert(VerifiedIdentity::new(payload, result));
            next.run(req).await
        }
    }
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}
