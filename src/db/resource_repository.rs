//! Resource counting repository
//!
//! One read-only counting operation per counted resource kind. The archive
//! and soft-delete policies here mirror what the rest of the platform shows
//! users: archived workflows do not occupy a plan seat, soft-deleted
//! automations do not either, while prompts and scenarios have no archive
//! concept at all.
//!
//! Project-scoped kinds (agents, experiments, online evaluations, datasets,
//! dashboards, custom graphs, automations) carry no organization column, so
//! the organization's project-id set is resolved first and an empty set
//! short-circuits to zero without touching the resource table.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::member_repository::MemberRepository;

pub struct CountingRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CountingRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    async fn count_org_scoped(&self, table: &str, filter: &str, organization_id: Uuid) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE organization_id = ?{}",
            table, filter
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(organization_id.to_string())
            .fetch_one(self.pool)
            .await
            .with_context(|| format!("Failed to count {}", table))?;
        Ok(count)
    }

    async fn project_ids(&self, organization_id: Uuid) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT id FROM projects WHERE organization_id = ?")
                .bind(organization_id.to_string())
                .fetch_all(self.pool)
                .await
                .context("Failed to list project ids")?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn count_project_scoped(
        &self,
        table: &str,
        filter: &str,
        organization_id: Uuid,
    ) -> Result<i64> {
        let project_ids = self.project_ids(organization_id).await?;
        if project_ids.is_empty() {
            return Ok(0);
        }

        let placeholders = project_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE project_id IN ({}){}",
            table, placeholders, filter
        );

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for id in &project_ids {
            query = query.bind(id);
        }

        let count = query
            .fetch_one(self.pool)
            .await
            .with_context(|| format!("Failed to count {}", table))?;
        Ok(count)
    }

    pub async fn count_workflows(&self, organization_id: Uuid) -> Result<i64> {
        self.count_org_scoped("workflows", " AND archived_at IS NULL", organization_id)
            .await
    }

    pub async fn count_prompts(&self, organization_id: Uuid) -> Result<i64> {
        self.count_org_scoped("prompts", "", organization_id).await
    }

    pub async fn count_evaluators(&self, organization_id: Uuid) -> Result<i64> {
        self.count_org_scoped("evaluators", " AND archived_at IS NULL", organization_id)
            .await
    }

    pub async fn count_scenarios(&self, organization_id: Uuid) -> Result<i64> {
        self.count_org_scoped("scenarios", "", organization_id).await
    }

    pub async fn count_projects(&self, organization_id: Uuid) -> Result<i64> {
        self.count_org_scoped("projects", "", organization_id).await
    }

    pub async fn count_teams(&self, organization_id: Uuid) -> Result<i64> {
        self.count_org_scoped("teams", "", organization_id).await
    }

    pub async fn count_agents(&self, organization_id: Uuid) -> Result<i64> {
        self.count_project_scoped("agents", "", organization_id).await
    }

    pub async fn count_experiments(&self, organization_id: Uuid) -> Result<i64> {
        self.count_project_scoped("experiments", "", organization_id)
            .await
    }

    pub async fn count_online_evaluations(&self, organization_id: Uuid) -> Result<i64> {
        self.count_project_scoped("online_evaluations", "", organization_id)
            .await
    }

    pub async fn count_datasets(&self, organization_id: Uuid) -> Result<i64> {
        self.count_project_scoped("datasets", " AND archived_at IS NULL", organization_id)
            .await
    }

    pub async fn count_dashboards(&self, organization_id: Uuid) -> Result<i64> {
        self.count_project_scoped("dashboards", "", organization_id)
            .await
    }

    pub async fn count_custom_graphs(&self, organization_id: Uuid) -> Result<i64> {
        self.count_project_scoped("custom_graphs", "", organization_id)
            .await
    }

    pub async fn count_automations(&self, organization_id: Uuid) -> Result<i64> {
        self.count_project_scoped("automations", " AND deleted_at IS NULL", organization_id)
            .await
    }

    pub async fn count_members(&self, organization_id: Uuid) -> Result<i64> {
        let counts = MemberRepository::new(self.pool)
            .member_counts(organization_id)
            .await?;
        Ok(counts.full)
    }

    pub async fn count_members_lite(&self, organization_id: Uuid) -> Result<i64> {
        let counts = MemberRepository::new(self.pool)
            .member_counts(organization_id)
            .await?;
        Ok(counts.lite)
    }
}
