//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: builds the key provider, permission store and core services
//! - `routes/`: HTTP handlers
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    Extension, Router,
    routing::{get, post},
};
use tower::ServiceBuilder;

use diagate_auth::{
    IssueOptions, KeyProvider, PermissionEvaluator, PermissionStore, PolicyFacade, TokenCodec,
    TokenIssuer,
};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Shared handler state. Everything behind it is read-only.
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<TokenIssuer>,
    pub codec: Arc<TokenCodec>,
    pub facade: Arc<PolicyFacade>,
    /// Applied to every issuance; `expiresIn` in the request overrides the lifetime.
    pub issue_defaults: IssueOptions,
}

impl AppState {
    pub fn new(
        keys: Arc<dyn KeyProvider>,
        store: Arc<dyn PermissionStore>,
        issue_defaults: IssueOptions,
    ) -> Self {
        let mut codec = TokenCodec::new(keys.clone());
        if let Some(issuer) = &issue_defaults.issuer {
            codec = codec.with_issuer(issuer.clone());
        }
        if let Some(audience) = &issue_defaults.audience {
            codec = codec.with_audience(audience.clone());
        }
        let codec = Arc::new(codec);

        Self {
            issuer: Arc::new(TokenIssuer::new(keys)),
            facade: Arc::new(PolicyFacade::new(
                codec.clone(),
                PermissionEvaluator::new(store),
            )),
            codec,
            issue_defaults,
        }
    }
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(state: AppState) -> Router {
    // Protected routes: every request passes the policy gate first.
    let protected = Router::new()
        .route("/whoami", get(routes::system::whoami))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::policy_gate,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/auth/token", post(routes::tokens::issue))
        .route("/auth/verify", post(routes::tokens::verify))
        .route("/auth/check", post(routes::tokens::check))
        .route("/auth/parse", post(routes::tokens::parse))
        .merge(protected)
        .layer(Extension(state))
        .layer(ServiceBuilder::new())
}
