//! Organization invite repository
//!
//! Invites are only ever inserted, transitioned WAITING_APPROVAL -> PENDING
//! by approval, or deleted. Nothing else updates them.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::parse_db_timestamp;
use crate::models::{InviteStatus, OrganizationInvite, OrgRole, TeamAssignment};

#[derive(Debug, sqlx::FromRow)]
struct InviteRow {
    id: String,
    organization_id: String,
    email: String,
    invite_code: String,
    role: String,
    team_assignments: String,
    status: String,
    expiration: Option<String>,
    requested_by: Option<String>,
    created_at: String,
}

const INVITE_COLUMNS: &str = "id, organization_id, email, invite_code, role, team_assignments, \
                              status, expiration, requested_by, created_at";

pub struct InviteRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> InviteRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(
        &self,
        organization_id: Uuid,
        invite_id: Uuid,
    ) -> Result<Option<OrganizationInvite>> {
        let row = sqlx::query_as::<_, InviteRow>(&format!(
            "SELECT {} FROM organization_invites WHERE id = ? AND organization_id = ?",
            INVITE_COLUMNS
        ))
        .bind(invite_id.to_string())
        .bind(organization_id.to_string())
        .fetch_optional(self.pool)
        .await
        .context("Failed to get invite")?;

        row.map(row_to_invite).transpose()
    }

    /// All invites of an organization, newest first.
    pub async fn list(&self, organization_id: Uuid) -> Result<Vec<OrganizationInvite>> {
        let rows = sqlx::query_as::<_, InviteRow>(&format!(
            "SELECT {} FROM organization_invites WHERE organization_id = ? ORDER BY created_at DESC",
            INVITE_COLUMNS
        ))
        .bind(organization_id.to_string())
        .fetch_all(self.pool)
        .await
        .context("Failed to list invites")?;

        rows.into_iter().map(row_to_invite).collect()
    }

    /// Live invites: status PENDING or WAITING_APPROVAL with no expiration
    /// or a future one. These block duplicate emails and reserve member
    /// seats.
    pub async fn live_invites(&self, organization_id: Uuid) -> Result<Vec<OrganizationInvite>> {
        let rows = sqlx::query_as::<_, InviteRow>(&format!(
            r#"
            SELECT {} FROM organization_invites
            WHERE organization_id = ?
              AND status IN (?, ?)
              AND (expiration IS NULL OR datetime(expiration) > datetime(?))
            "#,
            INVITE_COLUMNS
        ))
        .bind(organization_id.to_string())
        .bind(InviteStatus::Pending.as_str())
        .bind(InviteStatus::WaitingApproval.as_str())
        .bind(Utc::now().to_rfc3339())
        .fetch_all(self.pool)
        .await
        .context("Failed to list live invites")?;

        rows.into_iter().map(row_to_invite).collect()
    }

    /// Insert a batch of invites in one transaction. Either every invite in
    /// the group becomes durable or none does.
    pub async fn insert_batch(&self, invites: &[OrganizationInvite]) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        for invite in invites {
            let assignments = serde_json::to_string(&invite.team_assignments)
                .context("Failed to serialize team assignments")?;
            sqlx::query(
                r#"
                INSERT INTO organization_invites (
                    id, organization_id, email, invite_code, role,
                    team_assignments, status, expiration, requested_by, created_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(invite.id.to_string())
            .bind(invite.organization_id.to_string())
            .bind(&invite.email)
            .bind(&invite.invite_code)
            .bind(invite.role.as_str())
            .bind(assignments)
            .bind(invite.status.as_str())
            .bind(invite.expiration.map(|dt| dt.to_rfc3339()))
            .bind(invite.requested_by.map(|id| id.to_string()))
            .bind(invite.created_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .context("Failed to insert invite")?;
        }

        tx.commit().await.context("Failed to commit invite batch")?;
        Ok(())
    }

    /// Row-scoped approval transition. Only flips the row if it is still
    /// WAITING_APPROVAL; returns false when the invite was already approved,
    /// deleted, or never existed.
    pub async fn mark_pending(
        &self,
        organization_id: Uuid,
        invite_id: Uuid,
        expiration: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE organization_invites
            SET status = ?, expiration = ?
            WHERE id = ? AND organization_id = ? AND status = ?
            "#,
        )
        .bind(InviteStatus::Pending.as_str())
        .bind(expiration.to_rfc3339())
        .bind(invite_id.to_string())
        .bind(organization_id.to_string())
        .bind(InviteStatus::WaitingApproval.as_str())
        .execute(self.pool)
        .await
        .context("Failed to approve invite")?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove an invite in either non-terminal status. Used for admin
    /// rejection of a request and general cancellation alike.
    pub async fn delete(&self, organization_id: Uuid, invite_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM organization_invites
            WHERE id = ? AND organization_id = ?
            "#,
        )
        .bind(invite_id.to_string())
        .bind(organization_id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to delete invite")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_invite(row: InviteRow) -> Result<OrganizationInvite> {
    let role = OrgRole::parse(&row.role)
        .with_context(|| format!("Unknown invite role: {}", row.role))?;
    let status = InviteStatus::parse(&row.status)
        .with_context(|| format!("Unknown invite status: {}", row.status))?;
    let team_assignments: Vec<TeamAssignment> = serde_json::from_str(&row.team_assignments)
        .context("Invalid stored team assignments JSON")?;

    Ok(OrganizationInvite {
        id: Uuid::parse_str(&row.id).unwrap_or_else(|_| Uuid::nil()),
        organization_id: Uuid::parse_str(&row.organization_id).unwrap_or_else(|_| Uuid::nil()),
        email: row.email,
        invite_code: row.invite_code,
        role,
        team_assignments,
        status,
        expiration: row.expiration.as_deref().map(parse_db_timestamp),
        requested_by: row.requested_by.and_then(|id| Uuid::parse_str(&id).ok()),
        created_at: parse_db_timestamp(&row.created_at),
    })
}
