//! Member-type limit guard
//!
//! Gates role and custom-role changes for existing members. Invite flows do
//! not come through here; they carry their own checks.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::db::{DbPool, MemberRepository};
use crate::models::RoleChangeType;
use crate::services::license::LimitType;
use crate::services::plan::PlanProvider;
use crate::utils::{AppError, AppResult};

#[derive(Clone)]
pub struct MemberLimitGuard {
    db: DbPool,
    plans: Arc<dyn PlanProvider>,
}

impl MemberLimitGuard {
    pub fn new(db: DbPool, plans: Arc<dyn PlanProvider>) -> Self {
        Self { db, plans }
    }

    /// Check whether a role change may proceed.
    ///
    /// The counts are taken before the mutation, so the comparison uses
    /// `>=`: a change that would push the target member type past its
    /// maximum is rejected.
    pub async fn check_role_change(
        &self,
        organization_id: Uuid,
        change: RoleChangeType,
        user_id: Option<Uuid>,
    ) -> AppResult<()> {
        if change == RoleChangeType::NoChange {
            return Ok(());
        }

        let plan = self.plans.active_plan(organization_id, user_id).await?;
        if plan.override_adding_limitations {
            return Ok(());
        }

        let counts = MemberRepository::new(&self.db)
            .member_counts(organization_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let (limit_type, current, max) = match change {
            RoleChangeType::LiteToFull => (LimitType::Members, counts.full, plan.max_members),
            RoleChangeType::FullToLite => {
                (LimitType::MembersLite, counts.lite, plan.max_members_lite)
            }
            RoleChangeType::NoChange => unreachable!(),
        };

        if current >= max {
            warn!(
                organization_id = %organization_id,
                limit_type = %limit_type,
                current,
                max,
                "Role change rejected, member limit reached"
            );
            return Err(AppError::LimitExceeded {
                limit_type,
                current,
                max,
            });
        }

        Ok(())
    }
}
