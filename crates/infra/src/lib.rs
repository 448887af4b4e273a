//! Infrastructure layer: adapters for key material and permission records.

pub mod keys;
pub mod read_model;

pub use keys::{Environment, FileKeyProvider, KeyLoadError};
pub use read_model::{InMemoryPermissionStore, default_role_permissions};
