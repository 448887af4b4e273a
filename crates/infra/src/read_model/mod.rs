//! Permission record storage.

pub mod defaults;
pub mod permission_store;

pub use defaults::default_role_permissions;
pub use permission_store::InMemoryPermissionStore;
