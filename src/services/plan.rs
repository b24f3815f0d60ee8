//! Subscription plan resolution
//!
//! Every component that consults plan limits takes a `PlanProvider` handle
//! instead of reading shared process state, and providers resolve fresh on
//! every call so a downgrade is visible to the very next check.

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::{DbPool, OrganizationRepository};
use crate::models::PlanInfo;
use crate::utils::AppError;

#[async_trait]
pub trait PlanProvider: Send + Sync {
    /// Resolve the organization's active plan. The optional user allows
    /// per-user plan resolution later without touching call sites; the
    /// database provider ignores it today.
    async fn active_plan(
        &self,
        organization_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<PlanInfo, AppError>;
}

/// Plan provider backed by the organization row's stored plan snapshot.
pub struct DbPlanProvider {
    db: DbPool,
}

impl DbPlanProvider {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PlanProvider for DbPlanProvider {
    async fn active_plan(
        &self,
        organization_id: Uuid,
        _user_id: Option<Uuid>,
    ) -> Result<PlanInfo, AppError> {
        let repo = OrganizationRepository::new(&self.db);
        repo.get_plan(organization_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))
    }
}

/// Fixed-plan provider for tests and single-tenant deployments.
pub struct StaticPlanProvider {
    plan: PlanInfo,
}

impl StaticPlanProvider {
    pub fn new(plan: PlanInfo) -> Self {
        Self { plan }
    }
}

#[async_trait]
impl PlanProvider for StaticPlanProvider {
    async fn active_plan(
        &self,
        _organization_id: Uuid,
        _user_id: Option<Uuid>,
    ) -> Result<PlanInfo, AppError> {
        Ok(self.plan.clone())
    }
}
