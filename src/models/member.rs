//! Member classification
//!
//! Member type is a derived value, never persisted. It is recomputed from the
//! stored role and permission facts every time it is needed so it can never
//! go stale.

use serde::{Deserialize, Serialize};

use super::OrgRole;

/// Derived member classification
///
/// Full members count against the plan's `max_members`; lite members count
/// against `max_members_lite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberType {
    Full,
    Lite,
}

/// Classification of a role/permission change for an existing member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChangeType {
    NoChange,
    LiteToFull,
    FullToLite,
}

/// A permission string is view-only iff its action segment is `view`.
///
/// Permissions are `resource:action` strings; anything without an action
/// segment is treated as non-view.
pub fn is_view_only_permission(permission: &str) -> bool {
    match permission.split_once(':') {
        Some((_, action)) => action == "view",
        None => false,
    }
}

fn is_full_member(role: OrgRole, permissions: &[String]) -> bool {
    match role {
        OrgRole::Admin | OrgRole::Member => true,
        OrgRole::External => permissions
            .iter()
            .any(|p| !is_view_only_permission(p)),
    }
}

/// Classify a member from their organization role and effective permissions.
///
/// ADMIN and MEMBER are always full, regardless of permissions. EXTERNAL
/// users are lite unless at least one of their permissions grants a non-view
/// action.
pub fn classify_member_type(role: OrgRole, permissions: &[String]) -> MemberType {
    if is_full_member(role, permissions) {
        MemberType::Full
    } else {
        MemberType::Lite
    }
}

/// Classify a role change by comparing the member type before and after.
pub fn role_change_type(
    old_role: OrgRole,
    old_permissions: &[String],
    new_role: OrgRole,
    new_permissions: &[String],
) -> RoleChangeType {
    let was_full = is_full_member(old_role, old_permissions);
    let is_full = is_full_member(new_role, new_permissions);
    match (was_full, is_full) {
        (false, true) => RoleChangeType::LiteToFull,
        (true, false) => RoleChangeType::FullToLite,
        _ => RoleChangeType::NoChange,
    }
}
