//! Organization (tenant) repository

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::parse_db_timestamp;
use crate::models::{Organization, PlanInfo};

#[derive(Debug, sqlx::FromRow)]
struct OrganizationRow {
    id: String,
    name: String,
    slug: String,
    created_at: String,
    updated_at: String,
}

pub struct OrganizationRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OrganizationRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Organization>> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            r#"
            SELECT id, name, slug, created_at, updated_at
            FROM organizations
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(self.pool)
        .await
        .context("Failed to get organization")?;

        Ok(row.map(row_to_org))
    }

    /// Read the organization's stored plan snapshot.
    ///
    /// Returns `Ok(None)` when the organization does not exist, and the free
    /// plan when it exists but has no plan stored. Always reads fresh; plan
    /// state must never be cached across limit checks.
    pub async fn get_plan(&self, id: Uuid) -> Result<Option<PlanInfo>> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT plan FROM organizations WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(self.pool)
                .await
                .context("Failed to get organization plan")?;

        match row {
            None => Ok(None),
            Some((None,)) => Ok(Some(PlanInfo::default())),
            Some((Some(raw),)) => {
                let plan: PlanInfo =
                    serde_json::from_str(&raw).context("Invalid stored plan JSON")?;
                Ok(Some(plan))
            }
        }
    }

    /// Replace the organization's plan snapshot.
    pub async fn set_plan(&self, id: Uuid, plan: &PlanInfo) -> Result<bool> {
        let raw = serde_json::to_string(plan).context("Failed to serialize plan")?;
        let result = sqlx::query("UPDATE organizations SET plan = ? WHERE id = ?")
            .bind(raw)
            .bind(id.to_string())
            .execute(self.pool)
            .await
            .context("Failed to update organization plan")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_org(row: OrganizationRow) -> Organization {
    Organization {
        id: Uuid::parse_str(&row.id).unwrap_or_else(|_| Uuid::nil()),
        name: row.name,
        slug: row.slug,
        created_at: parse_db_timestamp(&row.created_at),
        updated_at: parse_db_timestamp(&row.updated_at),
    }
}
