//! Organization membership repository
//!
//! Builds the shared classification context from which the full and lite
//! member counts are derived. Both counts come out of one pass over the same
//! set of users and live invites, so a member can never be counted twice or
//! dropped.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{
    classify_member_type, InviteStatus, MemberType, OrgRole, TeamAssignment, TeamUser,
};

/// Full and lite member counts taken from one classification context.
///
/// `full + lite` covers every organization user and every live invite
/// exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberCounts {
    pub full: i64,
    pub lite: i64,
}

pub struct MemberRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MemberRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Organization-level role of a user, if they are a member.
    pub async fn org_role(&self, organization_id: Uuid, user_id: Uuid) -> Result<Option<OrgRole>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT role FROM organization_users
            WHERE organization_id = ? AND user_id = ?
            "#,
        )
        .bind(organization_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(self.pool)
        .await
        .context("Failed to get organization role")?;

        Ok(row.and_then(|(role,)| OrgRole::parse(&role)))
    }

    /// Merged custom-role permissions of a user across their teams.
    ///
    /// `exclude_team` leaves one team's assignment out, so a pending
    /// reassignment on that team can be evaluated against the rest.
    pub async fn effective_permissions(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        exclude_team: Option<Uuid>,
    ) -> Result<Vec<String>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT tu.team_id, cr.permissions
            FROM team_users tu
            JOIN teams t ON t.id = tu.team_id
            JOIN custom_roles cr ON cr.id = tu.assigned_role_id
            WHERE t.organization_id = ? AND tu.user_id = ?
            "#,
        )
        .bind(organization_id.to_string())
        .bind(user_id.to_string())
        .fetch_all(self.pool)
        .await
        .context("Failed to get effective permissions")?;

        let excluded = exclude_team.map(|id| id.to_string());
        let mut permissions = Vec::new();
        for (team_id, raw) in rows {
            if excluded.as_deref() == Some(team_id.as_str()) {
                continue;
            }
            let perms: Vec<String> =
                serde_json::from_str(&raw).context("Invalid stored permissions JSON")?;
            permissions.extend(perms);
        }
        Ok(permissions)
    }

    /// Permissions of a single custom role.
    pub async fn custom_role_permissions(&self, role_id: Uuid) -> Result<Option<Vec<String>>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT permissions FROM custom_roles WHERE id = ?")
                .bind(role_id.to_string())
                .fetch_optional(self.pool)
                .await
                .context("Failed to get custom role")?;

        match row {
            None => Ok(None),
            Some((raw,)) => {
                let perms: Vec<String> =
                    serde_json::from_str(&raw).context("Invalid stored permissions JSON")?;
                Ok(Some(perms))
            }
        }
    }

    /// Classify a (role, team assignments) pair the way the invitee would be
    /// classified once they accept: ADMIN/MEMBER are full, EXTERNAL falls
    /// back to the permissions of the assigned custom roles.
    pub async fn classify_assignments(
        &self,
        role: OrgRole,
        assignments: &[TeamAssignment],
    ) -> Result<MemberType> {
        if role != OrgRole::External {
            return Ok(MemberType::Full);
        }

        let mut permissions = Vec::new();
        for assignment in assignments {
            if let Some(role_id) = assignment.custom_role_id {
                if let Some(perms) = self.custom_role_permissions(role_id).await? {
                    permissions.extend(perms);
                }
            }
        }
        Ok(classify_member_type(role, &permissions))
    }

    /// Compute the full/lite member counts for an organization.
    ///
    /// The context covers existing organization users (with EXTERNAL users'
    /// merged team permissions) and every live PENDING / WAITING_APPROVAL
    /// invite (with the permissions of its team-assignment custom roles).
    pub async fn member_counts(&self, organization_id: Uuid) -> Result<MemberCounts> {
        let users: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT user_id, role FROM organization_users
            WHERE organization_id = ?
            "#,
        )
        .bind(organization_id.to_string())
        .fetch_all(self.pool)
        .await
        .context("Failed to list organization users")?;

        // Merged custom-role permissions, keyed by user. Only EXTERNAL users
        // consult these but loading them in one query keeps this a single
        // round trip.
        let permission_rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT tu.user_id, cr.permissions
            FROM team_users tu
            JOIN teams t ON t.id = tu.team_id
            JOIN custom_roles cr ON cr.id = tu.assigned_role_id
            WHERE t.organization_id = ?
            "#,
        )
        .bind(organization_id.to_string())
        .fetch_all(self.pool)
        .await
        .context("Failed to list team permissions")?;

        let mut permissions_by_user: HashMap<String, Vec<String>> = HashMap::new();
        for (user_id, raw) in permission_rows {
            let perms: Vec<String> =
                serde_json::from_str(&raw).context("Invalid stored permissions JSON")?;
            permissions_by_user.entry(user_id).or_default().extend(perms);
        }

        let mut full = 0i64;
        let mut lite = 0i64;
        let empty: Vec<String> = Vec::new();

        for (user_id, role) in &users {
            let role = OrgRole::parse(role)
                .with_context(|| format!("Unknown organization role: {}", role))?;
            let permissions = permissions_by_user.get(user_id).unwrap_or(&empty);
            match classify_member_type(role, permissions) {
                MemberType::Full => full += 1,
                MemberType::Lite => lite += 1,
            }
        }

        // Live invites reserve a seat of their resolved member type.
        let invites: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT role, team_assignments FROM organization_invites
            WHERE organization_id = ?
              AND status IN (?, ?)
              AND (expiration IS NULL OR datetime(expiration) > datetime(?))
            "#,
        )
        .bind(organization_id.to_string())
        .bind(InviteStatus::Pending.as_str())
        .bind(InviteStatus::WaitingApproval.as_str())
        .bind(Utc::now().to_rfc3339())
        .fetch_all(self.pool)
        .await
        .context("Failed to list live invites")?;

        for (role, raw_assignments) in invites {
            let role =
                OrgRole::parse(&role).with_context(|| format!("Unknown invite role: {}", role))?;
            let assignments: Vec<TeamAssignment> = serde_json::from_str(&raw_assignments)
                .context("Invalid stored team assignments JSON")?;
            match self.classify_assignments(role, &assignments).await? {
                MemberType::Full => full += 1,
                MemberType::Lite => lite += 1,
            }
        }

        Ok(MemberCounts { full, lite })
    }

    /// Change a member's organization-level role. Returns false when the
    /// membership row does not exist.
    pub async fn update_org_role(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        role: OrgRole,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE organization_users SET role = ?
            WHERE organization_id = ? AND user_id = ?
            "#,
        )
        .bind(role.as_str())
        .bind(organization_id.to_string())
        .bind(user_id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to update organization role")?;

        Ok(result.rows_affected() > 0)
    }

    /// Team membership row, if present.
    pub async fn team_user(&self, team_id: Uuid, user_id: Uuid) -> Result<Option<TeamUser>> {
        let row: Option<(String, String, String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT user_id, team_id, role, assigned_role_id
            FROM team_users
            WHERE team_id = ? AND user_id = ?
            "#,
        )
        .bind(team_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(self.pool)
        .await
        .context("Failed to get team user")?;

        Ok(row.map(|(user_id, team_id, role, assigned_role_id)| TeamUser {
            user_id: Uuid::parse_str(&user_id).unwrap_or_else(|_| Uuid::nil()),
            team_id: Uuid::parse_str(&team_id).unwrap_or_else(|_| Uuid::nil()),
            role,
            assigned_role_id: assigned_role_id.and_then(|id| Uuid::parse_str(&id).ok()),
        }))
    }

    /// Verify a team belongs to an organization.
    pub async fn team_in_organization(&self, organization_id: Uuid, team_id: Uuid) -> Result<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM teams WHERE id = ? AND organization_id = ?")
                .bind(team_id.to_string())
                .bind(organization_id.to_string())
                .fetch_optional(self.pool)
                .await
                .context("Failed to check team organization")?;

        Ok(row.is_some())
    }

    /// Change a member's team role and custom-role assignment. Returns false
    /// when the membership row does not exist.
    pub async fn update_team_role(
        &self,
        team_id: Uuid,
        user_id: Uuid,
        role: &str,
        assigned_role_id: Option<Uuid>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE team_users SET role = ?, assigned_role_id = ?
            WHERE team_id = ? AND user_id = ?
            "#,
        )
        .bind(role)
        .bind(assigned_role_id.map(|id| id.to_string()))
        .bind(team_id.to_string())
        .bind(user_id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to update team role")?;

        Ok(result.rows_affected() > 0)
    }
}
