use std::sync::Arc;

use diagate_api::app::{AppState, build_app};
use diagate_auth::{
    IssueOptions, PemKeyPair, PermissionRecord, PermissionStore, Role, StoreError,
};
use diagate_infra::{InMemoryPermissionStore, default_role_permissions};
use reqwest::StatusCode;
use serde_json::{Value, json};

const PRIVATE_PEM: &str = include_str!("../../auth/fixtures/private.pem");
const PUBLIC_PEM: &str = include_str!("../../auth/fixtures/public.pem");

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let store = InMemoryPermissionStore::with_records(default_role_permissions());
        Self::spawn_with(Arc::new(store), IssueOptions::default()).await
    }

    async fn spawn_with(store: Arc<dyn PermissionStore>, options: IssueOptions) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let keys = PemKeyPair::from_pem(PRIVATE_PEM.as_bytes(), PUBLIC_PEM.as_bytes())
            .expect("fixture keys")
            .with_kid("black-box");
        let app = build_app(AppState::new(Arc::new(keys), store, options));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct DownStore;

impl PermissionStore for DownStore {
    fn records_for_role(&self, _role: Role) -> Result<Vec<PermissionRecord>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

async fn issue_token(client: &reqwest::Client, srv: &TestServer, body: Value) -> String {
    let res = client
        .post(srv.url("/auth/token"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn issue_returns_token_payload_and_expiry() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/auth/token"))
        .json(&json!({
            "userId": "u1",
            "email": "a@b.com",
            "role": "developer",
            "permissions": ["read:App/*"],
            "expiresIn": "30m",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.unwrap();
    assert!(body.get("error").is_none());
    assert_eq!(body["token"].as_str().unwrap().split('.').count(), 3);
    assert_eq!(body["payload"]["role"], "Developer");
    assert_eq!(body["payload"]["oid"], "default");
    assert_eq!(body["payload"]["scope"], "api:access");
    assert_eq!(body["payload"]["permissions"], json!(["read:App/*"]));
    let iat = body["payload"]["iat"].as_i64().unwrap();
    let exp = body["payload"]["exp"].as_i64().unwrap();
    assert_eq!(exp - iat, 30 * 60);
    assert!(body["expiresAt"].as_str().unwrap().ends_with(".000Z"));
}

#[tokio::test]
async fn issue_rejects_missing_claims_and_bad_role() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/auth/token"))
        .json(&json!({ "role": "Admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "missing_claims");
    assert!(body["message"].as_str().unwrap().contains("userId"));

    let res = client
        .post(srv.url("/auth/token"))
        .json(&json!({ "role": "SuperAdmin", "email": "a@b.com", "userId": "u1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_role");

    let res = client
        .post(srv.url("/auth/token"))
        .json(&json!({ "role": "Admin", "email": "a@b.com", "userId": "u1", "expiresIn": "0s" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_expires_in");
}

#[tokio::test]
async fn malformed_json_is_invalid_request() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/auth/verify"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn verify_reports_valid_and_invalid_tokens() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = issue_token(
        &client,
        &srv,
        json!({ "userId": "u1", "email": "a@b.com", "role": "Viewer" }),
    )
    .await;

    let res = client
        .post(srv.url("/auth/verify"))
        .json(&json!({ "token": token }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["valid"], true);
    assert_eq!(body["payload"]["userId"], "u1");
    assert!(body.get("error").is_none());

    let res = client
        .post(srv.url("/auth/verify"))
        .json(&json!({ "token": "only.two" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["valid"], false);
    assert_eq!(body["error"], "invalid_token");
    assert!(body.get("payload").is_none());
}

#[tokio::test]
async fn verify_detects_tampered_payload() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = issue_token(
        &client,
        &srv,
        json!({ "userId": "u1", "email": "a@b.com", "role": "Viewer" }),
    )
    .await;

    let parts: Vec<&str> = token.split('.').collect();
    let forged_payload = {
        use base64::Engine as _;
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        let mut payload: Value = serde_json::from_slice(&engine.decode(parts[1]).unwrap()).unwrap();
        payload["role"] = json!("Admin");
        engine.encode(serde_json::to_vec(&payload).unwrap())
    };
    let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

    let res = client
        .post(srv.url("/auth/verify"))
        .json(&json!({ "token": forged }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "signature_invalid");
}

#[tokio::test]
async fn check_applies_deny_precedence_and_role_defaults() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = issue_token(
        &client,
        &srv,
        json!({
            "userId": "u1",
            "email": "a@b.com",
            "role": "Developer",
            "permissions": ["GET:App/*"],
            "denyPermissions": ["GET:App/secrets"],
        }),
    )
    .await;

    let check = |method: &'static str, path: &'static str| {
        let client = client.clone();
        let url = srv.url("/auth/check");
        let token = token.clone();
        async move {
            let res = client
                .post(url)
                .json(&json!({ "token": token, "method": method, "path": path }))
                .send()
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
            res.json::<Value>().await.unwrap()
        }
    };

    let body = check("GET", "/App/secrets").await;
    assert_eq!(body["allowed"], false);
    assert!(body["reason"].as_str().unwrap().contains("GET:App/secrets"));
    assert_eq!(body["details"]["currentRole"], "Developer");
    assert_eq!(body["details"]["action"], "GET");
    assert_eq!(body["details"]["resource"], "App/secrets");

    let body = check("GET", "/App/metrics").await;
    assert_eq!(body["allowed"], true);

    // Built-in Developer default denies writes under Users/.
    let body = check("POST", "/Users/42").await;
    assert_eq!(body["allowed"], false);
    assert!(body["details"]["userPermissions"].is_array());
    assert!(body["details"]["requiredPermissions"].is_array());
}

#[tokio::test]
async fn check_rejects_invalid_token_without_evaluating() {
    let srv = TestServer::spawn_with(Arc::new(DownStore), IssueOptions::default()).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/auth/check"))
        .json(&json!({ "token": "garbage", "method": "GET", "path": "/App" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_token");
    assert_eq!(body["cause"], "invalid_token");
}

#[tokio::test]
async fn check_fails_closed_when_store_is_down() {
    let srv = TestServer::spawn_with(Arc::new(DownStore), IssueOptions::default()).await;
    let client = reqwest::Client::new();
    let token = issue_token(
        &client,
        &srv,
        json!({ "userId": "u1", "email": "a@b.com", "role": "Viewer" }),
    )
    .await;

    let res = client
        .post(srv.url("/auth/check"))
        .json(&json!({ "token": token, "method": "GET", "path": "/App" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "permission_check_failed");
}

#[tokio::test]
async fn parse_returns_unverified_payload() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = issue_token(
        &client,
        &srv,
        json!({ "userId": "u7", "email": "a@b.com", "role": "Admin" }),
    )
    .await;

    let res = client
        .post(srv.url("/auth/parse"))
        .json(&json!({ "token": token }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["verified"], false);
    assert_eq!(body["payload"]["userId"], "u7");

    let res = client
        .post(srv.url("/auth/parse"))
        .json(&json!({ "token": "a.b" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn policy_gate_protects_whoami() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let token = issue_token(
        &client,
        &srv,
        json!({ "userId": "u1", "email": "a@b.com", "role": "Viewer" }),
    )
    .await;
    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["userId"], "u1");
    assert_eq!(body["role"], "Viewer");

    let denied = issue_token(
        &client,
        &srv,
        json!({
            "userId": "u2",
            "email": "a@b.com",
            "role": "Admin",
            "denyPermissions": ["read:whoami"],
        }),
    )
    .await;
    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(&denied)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "forbidden");
    assert!(body["message"].as_str().unwrap().contains("read:whoami"));
}

#[tokio::test]
async fn bound_issuer_and_audience_round_trip() {
    let store = InMemoryPermissionStore::with_records(default_role_permissions());
    let options = IssueOptions {
        issuer: Some("diagate".into()),
        audience: Some("diagnostics-api".into()),
        ..IssueOptions::default()
    };
    let srv = TestServer::spawn_with(Arc::new(store), options).await;
    let client = reqwest::Client::new();
    let token = issue_token(
        &client,
        &srv,
        json!({ "userId": "u1", "email": "a@b.com", "role": "Viewer" }),
    )
    .await;

    let res = client
        .post(srv.url("/auth/verify"))
        .json(&json!({ "token": token }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["payload"]["iss"], "diagate");
    assert_eq!(body["payload"]["aud"], "diagnostics-api");
}
