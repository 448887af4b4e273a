use std::path::Path;
use std::sync::RwLock;

use diagate_auth::{PermissionRecord, PermissionStore, Role, StoreError};

/// In-memory permission store for tests/dev and file-seeded deployments.
///
/// A poisoned lock is reported as [`StoreError::Unavailable`] so callers fail
/// closed instead of reading half-written state.
#[derive(Debug, Default)]
pub struct InMemoryPermissionStore {
    inner: RwLock<Vec<PermissionRecord>>,
}

impl InMemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = PermissionRecord>) -> Self {
        Self {
            inner: RwLock::new(records.into_iter().collect()),
        }
    }

    /// Load records from a JSON array file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = std::fs::read(path)
            .map_err(|e| StoreError::Load(format!("{}: {e}", path.display())))?;
        let records: Vec<PermissionRecord> = serde_json::from_slice(&raw)
            .map_err(|e| StoreError::Load(format!("{}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), records = records.len(), "permission records loaded");
        Ok(Self::with_records(records))
    }
}

impl PermissionStore for InMemoryPermissionStore {
    fn records_for_role(&self, role: Role) -> Result<Vec<PermissionRecord>, StoreError> {
        let records = self.inner.read().map_err(|_| poisoned())?;
        Ok(records.iter().filter(|r| r.role == role).cloned().collect())
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("permission store lock poisoned".to_string())
}
