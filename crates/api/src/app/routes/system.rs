use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::context::VerifiedIdentity;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(identity): Extension<VerifiedIdentity>) -> impl IntoResponse {
    let payload = identity.payload();
    Json(json!({
        "userId": payload.user_id,
        "role": payload.role,
        "oid": payload.oid,
        "scope": payload.scope,
        "reason": identity.decision().reason,
    }))
}
