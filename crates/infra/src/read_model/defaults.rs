use diagate_auth::{Access, PermissionRecord, Role};

/// Built-in role defaults used when no permissions file is configured.
pub fn default_role_permissions() -> Vec<PermissionRecord> {
    vec![
        // Admins may do anything.
        PermissionRecord::new(Role::Admin, "*", "*", Access::allow()),
        // Developers: full access to application diagnostics, read elsewhere.
        PermissionRecord::new(Role::Developer, "*", "App/*", Access::allow()),
        PermissionRecord::new(Role::Developer, "read", "*", Access::allow()),
        PermissionRecord::new(
            Role::Developer,
            "write",
            "Users/*",
            Access::Deny {
                reason: Some("user administration is Admin-only".to_string()),
            },
        ),
        // Viewers are read-only.
        PermissionRecord::new(Role::Viewer, "read", "*", Access::allow()),
    ]
}
