use std::sync::Arc;

use thiserror::Error;

use crate::{PermissionRecord, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("permission store unavailable: {0}")]
    Unavailable(String),

    #[error("failed to load permission records: {0}")]
    Load(String),
}

/// Read access to persisted role-default permission records.
///
/// Records are owned by the administrative layer; the core only reads them.
pub trait PermissionStore: Send + Sync {
    fn records_for_role(&self, role: Role) -> Result<Vec<PermissionRecord>, StoreError>;
}

impl<S> PermissionStore for Arc<S>
where
    S: PermissionStore + ?Sized,
{
    fn records_for_role(&self, role: Role) -> Result<Vec<PermissionRecord>, StoreError> {
        (**self).records_for_role(role)
    }
}

impl PermissionStore for Vec<PermissionRecord> {
    fn records_for_role(&self, role: Role) -> Result<Vec<PermissionRecord>, StoreError> {
        Ok(self.iter().filter(|r| r.role == role).cloned().collect())
    }
}
