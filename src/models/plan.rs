//! Subscription plan snapshot

use serde::{Deserialize, Serialize};

/// Immutable-per-resolution snapshot of an organization's active plan.
///
/// One maximum per counted resource kind, plus the override flag that
/// disables enforcement entirely. Resolved fresh on every limit check and
/// never cached across checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanInfo {
    #[serde(default = "default_plan_name")]
    pub name: String,
    #[serde(default)]
    pub free: bool,
    /// When true, all adding limitations are bypassed and counting is
    /// skipped entirely.
    #[serde(default)]
    pub override_adding_limitations: bool,
    #[serde(default = "default_max_members")]
    pub max_members: i64,
    #[serde(default = "default_max_members_lite")]
    pub max_members_lite: i64,
    #[serde(default = "default_max_teams")]
    pub max_teams: i64,
    #[serde(default = "default_max_projects")]
    pub max_projects: i64,
    #[serde(default = "default_max_workflows")]
    pub max_workflows: i64,
    #[serde(default = "default_max_prompts")]
    pub max_prompts: i64,
    #[serde(default = "default_max_evaluators")]
    pub max_evaluators: i64,
    #[serde(default = "default_max_scenarios")]
    pub max_scenarios: i64,
    #[serde(default = "default_max_agents")]
    pub max_agents: i64,
    #[serde(default = "default_max_experiments")]
    pub max_experiments: i64,
    #[serde(default = "default_max_online_evaluations")]
    pub max_online_evaluations: i64,
    #[serde(default = "default_max_datasets")]
    pub max_datasets: i64,
    #[serde(default = "default_max_dashboards")]
    pub max_dashboards: i64,
    #[serde(default = "default_max_custom_graphs")]
    pub max_custom_graphs: i64,
    #[serde(default = "default_max_automations")]
    pub max_automations: i64,
}

fn default_plan_name() -> String {
    "free".to_string()
}

fn default_max_members() -> i64 {
    3
}

fn default_max_members_lite() -> i64 {
    3
}

fn default_max_teams() -> i64 {
    1
}

fn default_max_projects() -> i64 {
    3
}

fn default_max_workflows() -> i64 {
    3
}

fn default_max_prompts() -> i64 {
    10
}

fn default_max_evaluators() -> i64 {
    5
}

fn default_max_scenarios() -> i64 {
    10
}

fn default_max_agents() -> i64 {
    3
}

fn default_max_experiments() -> i64 {
    10
}

fn default_max_online_evaluations() -> i64 {
    3
}

fn default_max_datasets() -> i64 {
    5
}

fn default_max_dashboards() -> i64 {
    3
}

fn default_max_custom_graphs() -> i64 {
    10
}

fn default_max_automations() -> i64 {
    3
}

impl Default for PlanInfo {
    /// The free plan every organization starts on.
    fn default() -> Self {
        Self {
            name: default_plan_name(),
            free: true,
            override_adding_limitations: false,
            max_members: default_max_members(),
            max_members_lite: default_max_members_lite(),
            max_teams: default_max_teams(),
            max_projects: default_max_projects(),
            max_workflows: default_max_workflows(),
            max_prompts: default_max_prompts(),
            max_evaluators: default_max_evaluators(),
            max_scenarios: default_max_scenarios(),
            max_agents: default_max_agents(),
            max_experiments: default_max_experiments(),
            max_online_evaluations: default_max_online_evaluations(),
            max_datasets: default_max_datasets(),
            max_dashboards: default_max_dashboards(),
            max_custom_graphs: default_max_custom_graphs(),
            max_automations: default_max_automations(),
        }
    }
}

impl PlanInfo {
    /// Unrestricted plan, used for enterprise organizations.
    pub fn unrestricted() -> Self {
        Self {
            name: "enterprise".to_string(),
            free: false,
            override_adding_limitations: true,
            ..Self::default()
        }
    }
}
