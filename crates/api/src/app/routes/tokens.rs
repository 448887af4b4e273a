use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;

use diagate_auth::{IssueOptions, PolicyVerdict};

use crate::app::AppState;
use crate::app::dto::{CheckRequest, CheckResponse, IssueTokenRequest, TokenRequest};
use crate::app::errors::{auth_error_to_response, json_error, rejection_to_response};

pub async fn issue(
    Extension(state): Extension<AppState>,
    body: Result<Json<IssueTokenRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_to_response(rejection),
    };

    let options = IssueOptions {
        expires_in: body
            .expires_in
            .unwrap_or_else(|| state.issue_defaults.expires_in.clone()),
        ..state.issue_defaults.clone()
    };

    match state.issuer.issue(body.claims, &options, Utc::now()) {
        Ok(issued) => (StatusCode::OK, Json(issued)).into_response(),
        Err(e) => auth_error_to_response(&e),
    }
}

pub async fn verify(
    Extension(state): Extension<AppState>,
    body: Result<Json<TokenRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_to_response(rejection),
    };

    match state.codec.verify(&body.token, Utc::now()) {
        Ok(payload) => (
            StatusCode::OK,
            Json(json!({ "valid": true, "payload": payload })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "valid": false,
                "error": e.kind().code(),
                "message": e.to_string(),
            })),
        )
            .into_response(),
    }
}

pub async fn check(
    Extension(state): Extension<AppState>,
    body: Result<Json<CheckRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_to_response(rejection),
    };

    match state
        .facade
        .check(&body.token, &body.method, &body.path, Utc::now())
    {
        Ok(PolicyVerdict::Evaluated { payload, result }) => (
            StatusCode::OK,
            Json(CheckResponse::new(payload.role, result)),
        )
            .into_response(),
        Ok(PolicyVerdict::InvalidToken { cause }) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "invalid_token",
                "message": cause.to_string(),
                "cause": cause.kind(),
            })),
        )
            .into_response(),
        Err(e) => auth_error_to_response(&e),
    }
}

/// Structural decode only; the response always says `verified: false`.
pub async fn parse(
    Extension(state): Extension<AppState>,
    body: Result<Json<TokenRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_to_response(rejection),
    };

    match state.codec.parse(&body.token) {
        Some(payload) => (
            StatusCode::OK,
            Json(json!({ "verified": false, "payload": payload })),
        )
            .into_response(),
        None => json_error(
            StatusCode::BAD_REQUEST,
            "invalid_token",
            "token could not be decoded",
        ),
    }
}
