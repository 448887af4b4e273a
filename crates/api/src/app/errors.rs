use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use diagate_auth::{AuthError, ErrorKind};

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::MissingClaims | ErrorKind::InvalidRole | ErrorKind::InvalidExpiresIn => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::InvalidToken
        | ErrorKind::SignatureInvalid
        | ErrorKind::TokenExpired
        | ErrorKind::ClaimMismatch => StatusCode::UNAUTHORIZED,
        ErrorKind::KeyUnavailable | ErrorKind::PermissionCheckFailed => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub fn auth_error_to_response(err: &AuthError) -> axum::response::Response {
    let kind = err.kind();
    if status_for(kind).is_server_error() {
        tracing::error!(error = %kind, "request failed");
    }
    json_error(status_for(kind), kind.code(), err.to_string())
}

pub fn rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
