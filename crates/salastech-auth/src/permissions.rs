//! Permission checking for RBAC over the five reservation-system roles.

use salastech_core::Role;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub resource: String,
    pub action: String,
}

impl Permission {
    pub fn new(resource: &str, action: &str) -> Self {
        Self { resource: resource.to_string(), action: action.to_string() }
    }
}

pub struct PermissionChecker;

impl PermissionChecker {
    /// Check if a role has permission for an action on a resource.
    pub fn has_permission(role: Role, resource: &str, action: &str) -> bool {
        match role {
            Role::Admin => true,
            Role::Manager => Self::manager_permissions(resource, action),
            Role::AdvancedUser => Self::advanced_user_permissions(resource, action),
            Role::User => Self::user_permissions(resource, action),
            Role::Guest => Self::guest_permissions(resource, action),
        }
    }

    fn manager_permissions(resource: &str, action: &str) -> bool {
        matches!(
            (resource, action),
            ("reservations", "read" | "write" | "create" | "list" | "approve" | "reject" | "cancel")
                | ("rooms", "read" | "list")
                | ("departments", "read" | "list")
                | ("users", "read" | "list")
                | ("reports", "read")
        )
    }

    fn advanced_user_permissions(resource: &str, action: &str) -> bool {
        matches!(
            (resource, action),
            ("reservations", "read" | "write" | "create" | "list" | "cancel")
                | ("rooms", "read" | "list")
                | ("departments", "read" | "list")
        )
    }

    fn user_permissions(resource: &str, action: &str) -> bool {
        matches!(
            (resource, action),
            ("reservations", "read_own" | "create_own" | "cancel_own" | "list_own")
                | ("rooms", "read" | "list")
        )
    }

    fn guest_permissions(resource: &str, action: &str) -> bool {
        matches!((resource, action), ("reservations", "read_own" | "create_own" | "cancel_own") | ("rooms", "read"))
    }

    /// All permissions for a role, for surfacing in e.g. a `/me` endpoint.
    pub fn get_permissions(role: Role) -> Vec<Permission> {
        match role {
            Role::Admin => vec![Permission::new("*", "*")],
            Role::Manager => vec![
                Permission::new("reservations", "read"),
                Permission::new("reservations", "write"),
                Permission::new("reservations", "create"),
                Permission::new("reservations", "list"),
                Permission::new("reservations", "approve"),
                Permission::new("reservations", "reject"),
                Permission::new("reservations", "cancel"),
                Permission::new("rooms", "read"),
                Permission::new("rooms", "list"),
                Permission::new("reports", "read"),
            ],
            Role::AdvancedUser => vec![
                Permission::new("reservations", "read"),
                Permission::new("reservations", "write"),
                Permission::new("reservations", "create"),
                Permission::new("reservations", "list"),
                Permission::new("reservations", "cancel"),
                Permission::new("rooms", "read"),
                Permission::new("rooms", "list"),
            ],
            Role::User => vec![
                Permission::new("reservations", "read_own"),
                Permission::new("reservations", "create_own"),
                Permission::new("reservations", "cancel_own"),
                Permission::new("reservations", "list_own"),
                Permission::new("rooms", "read"),
            ],
            Role::Guest => vec![
                Permission::new("reservations", "read_own"),
                Permission::new("reservations", "create_own"),
                Permission::new("reservations", "cancel_own"),
                Permission::new("rooms", "read"),
            ],
        }
    }
}

/// Department-scoped resource access: privileged roles bypass it entirely,
/// `User`/`Guest` must match the resource's department.
pub fn check_department_access(
    requester_role: Role,
    requester_department_id: Option<uuid::Uuid>,
    resource_department_id: uuid::Uuid,
) -> bool {
    if !requester_role.is_department_scoped() {
        return true;
    }
    requester_department_id == Some(resource_department_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_has_every_permission() {
        assert!(PermissionChecker::has_permission(Role::Admin, "anything", "anything"));
    }

    #[test]
    fn manager_can_approve_but_user_cannot() {
        assert!(PermissionChecker::has_permission(Role::Manager, "reservations", "approve"));
        assert!(!PermissionChecker::has_permission(Role::User, "reservations", "approve"));
    }

    #[test]
    fn department_scoped_role_is_denied_cross_department() {
        let dept_a = uuid::Uuid::new_v4();
        let dept_b = uuid::Uuid::new_v4();
        assert!(!check_department_access(Role::User, Some(dept_a), dept_b));
        assert!(check_department_access(Role::Manager, Some(dept_a), dept_b));
    }
}
