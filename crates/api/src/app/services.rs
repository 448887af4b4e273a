//! Wires configuration into the key provider, permission store and core services.

use std::sync::Arc;

use anyhow::{Context, Result};

use diagate_auth::{IssueOptions, KeyProvider, PermissionStore};
use diagate_infra::{FileKeyProvider, InMemoryPermissionStore, default_role_permissions};

use super::AppState;
use crate::config::ApiConfig;

pub fn build_state(config: &ApiConfig) -> Result<AppState> {
    let keys = FileKeyProvider::load(&config.keys_dir, config.environment, config.key_id.clone())
        .with_context(|| format!("load keys from {}", config.keys_dir.display()))?;
    let keys: Arc<dyn KeyProvider> = Arc::new(keys);

    let store = match &config.permissions_file {
        Some(path) => InMemoryPermissionStore::from_json_file(path)
            .with_context(|| format!("load permissions from {}", path.display()))?,
        None => {
            tracing::info!("no permissions file configured; using built-in role defaults");
            InMemoryPermissionStore::with_records(default_role_permissions())
        }
    };
    let store: Arc<dyn PermissionStore> = Arc::new(store);

    let issue_defaults = IssueOptions {
        expires_in: config.token_ttl.clone(),
        issuer: config.token_issuer.clone(),
        audience: config.token_audience.clone(),
    };

    Ok(AppState::new(keys, store, issue_defaults))
}
