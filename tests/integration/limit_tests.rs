//! License limit enforcement tests
//!
//! Exercise the counting policies (archive and soft-delete exclusion,
//! project scoping) and the plan override through the limit endpoint.

use rstest::rstest;
use uuid::Uuid;

use lattice_licensing::models::{InviteStatus, OrgRole, PlanInfo};

use crate::common::fixtures::*;
use crate::common::TestApp;

fn limits_uri(org_id: Uuid, limit_type: &str) -> String {
    format!("/api/v1/organizations/{}/limits/{}", org_id, limit_type)
}

#[tokio::test]
async fn archived_workflows_do_not_count() {
    let app = TestApp::new().await;
    let org = Uuid::new_v4();
    let user = Uuid::new_v4();
    seed_organization(&app.state.db, org, None).await;
    seed_org_user(&app.state.db, org, user, OrgRole::Member).await;

    // Free plan allows 3 workflows. Two archived rows must not count.
    for _ in 0..3 {
        seed_workflow(&app.state.db, org, false).await;
    }
    for _ in 0..2 {
        seed_workflow(&app.state.db, org, true).await;
    }

    let token = app.token_for(org, user, OrgRole::Member);
    let response = app.get(&limits_uri(org, "workflows"), &token).await;
    response.assert_ok();

    let check: serde_json::Value = response.json();
    assert_eq!(check["allowed"], false);
    assert_eq!(check["current"], 3);
    assert_eq!(check["max"], 3);
}

#[tokio::test]
async fn workflow_below_max_is_allowed() {
    let app = TestApp::new().await;
    let org = Uuid::new_v4();
    let user = Uuid::new_v4();
    seed_organization(&app.state.db, org, None).await;
    seed_org_user(&app.state.db, org, user, OrgRole::Member).await;

    seed_workflow(&app.state.db, org, false).await;
    seed_workflow(&app.state.db, org, false).await;

    let token = app.token_for(org, user, OrgRole::Member);
    let check: serde_json::Value = app
        .get(&limits_uri(org, "workflows"), &token)
        .await
        .json();
    assert_eq!(check["allowed"], true);
    assert_eq!(check["current"], 2);
}

#[tokio::test]
async fn override_skips_counting_entirely() {
    let app = TestApp::new().await;
    let org = Uuid::new_v4();
    let user = Uuid::new_v4();

    // Zero maximum but override set: must be allowed without counting.
    let mut plan = PlanInfo::default();
    plan.max_prompts = 0;
    plan.override_adding_limitations = true;
    seed_organization(&app.state.db, org, Some(&plan)).await;
    seed_org_user(&app.state.db, org, user, OrgRole::Member).await;

    for _ in 0..5 {
        seed_prompt(&app.state.db, org).await;
    }

    let token = app.token_for(org, user, OrgRole::Member);
    let check: serde_json::Value = app.get(&limits_uri(org, "prompts"), &token).await.json();
    assert_eq!(check["allowed"], true);
    assert_eq!(check["current"], 0);
    assert_eq!(check["max"], 0);
}

#[tokio::test]
async fn project_scoped_count_with_no_projects_is_zero() {
    let app = TestApp::new().await;
    let org = Uuid::new_v4();
    let user = Uuid::new_v4();
    seed_organization(&app.state.db, org, None).await;
    seed_org_user(&app.state.db, org, user, OrgRole::Member).await;

    let token = app.token_for(org, user, OrgRole::Member);
    let check: serde_json::Value = app.get(&limits_uri(org, "agents"), &token).await.json();
    assert_eq!(check["allowed"], true);
    assert_eq!(check["current"], 0);
}

#[tokio::test]
async fn project_scoped_count_spans_all_projects_in_org_only() {
    let app = TestApp::new().await;
    let org = Uuid::new_v4();
    let other_org = Uuid::new_v4();
    let user = Uuid::new_v4();
    seed_organization(&app.state.db, org, None).await;
    seed_organization(&app.state.db, other_org, None).await;
    seed_org_user(&app.state.db, org, user, OrgRole::Member).await;

    let team = Uuid::new_v4();
    seed_team(&app.state.db, org, team).await;
    let project_a = Uuid::new_v4();
    let project_b = Uuid::new_v4();
    seed_project(&app.state.db, org, team, project_a).await;
    seed_project(&app.state.db, org, team, project_b).await;

    let other_team = Uuid::new_v4();
    seed_team(&app.state.db, other_org, other_team).await;
    let other_project = Uuid::new_v4();
    seed_project(&app.state.db, other_org, other_team, other_project).await;

    seed_agent(&app.state.db, project_a).await;
    seed_agent(&app.state.db, project_b).await;
    seed_agent(&app.state.db, other_project).await;

    let token = app.token_for(org, user, OrgRole::Member);
    let check: serde_json::Value = app.get(&limits_uri(org, "agents"), &token).await.json();
    assert_eq!(check["current"], 2);
}

#[tokio::test]
async fn soft_deleted_automations_and_archived_datasets_do_not_count() {
    let app = TestApp::new().await;
    let org = Uuid::new_v4();
    let user = Uuid::new_v4();
    seed_organization(&app.state.db, org, None).await;
    seed_org_user(&app.state.db, org, user, OrgRole::Member).await;

    let team = Uuid::new_v4();
    seed_team(&app.state.db, org, team).await;
    let project = Uuid::new_v4();
    seed_project(&app.state.db, org, team, project).await;

    seed_automation(&app.state.db, project, false).await;
    seed_automation(&app.state.db, project, true).await;
    seed_dataset(&app.state.db, project, false).await;
    seed_dataset(&app.state.db, project, true).await;

    let token = app.token_for(org, user, OrgRole::Member);
    let automations: serde_json::Value =
        app.get(&limits_uri(org, "automations"), &token).await.json();
    assert_eq!(automations["current"], 1);

    let datasets: serde_json::Value = app.get(&limits_uri(org, "datasets"), &token).await.json();
    assert_eq!(datasets["current"], 1);
}

#[tokio::test]
async fn live_invites_count_as_members() {
    let app = TestApp::new().await;
    let org = Uuid::new_v4();
    let user = Uuid::new_v4();
    seed_organization(&app.state.db, org, None).await;

    // Two real full members plus one waiting invite fills the free plan's
    // three member seats.
    seed_org_user(&app.state.db, org, user, OrgRole::Admin).await;
    seed_org_user(&app.state.db, org, Uuid::new_v4(), OrgRole::Member).await;
    seed_invite(
        &app.state.db,
        org,
        "pending@example.com",
        OrgRole::Member,
        &[],
        InviteStatus::WaitingApproval,
        None,
    )
    .await;

    let token = app.token_for(org, user, OrgRole::Admin);
    let check: serde_json::Value = app.get(&limits_uri(org, "members"), &token).await.json();
    assert_eq!(check["current"], 3);
    assert_eq!(check["allowed"], false);
}

#[tokio::test]
async fn expired_invites_do_not_count_as_members() {
    let app = TestApp::new().await;
    let org = Uuid::new_v4();
    let user = Uuid::new_v4();
    seed_organization(&app.state.db, org, None).await;
    seed_org_user(&app.state.db, org, user, OrgRole::Admin).await;

    seed_invite(
        &app.state.db,
        org,
        "expired@example.com",
        OrgRole::Member,
        &[],
        InviteStatus::Pending,
        Some(chrono::Utc::now() - chrono::Duration::hours(1)),
    )
    .await;

    let token = app.token_for(org, user, OrgRole::Admin);
    let check: serde_json::Value = app.get(&limits_uri(org, "members"), &token).await.json();
    assert_eq!(check["current"], 1);
}

#[rstest]
#[case::org_scoped("workflows")]
#[case::project_scoped("experiments")]
#[case::members("members")]
#[case::members_lite("members_lite")]
#[tokio::test]
async fn empty_organization_has_zero_usage(#[case] kind: &str) {
    let app = TestApp::new().await;
    let org = Uuid::new_v4();
    let user = Uuid::new_v4();
    seed_organization(&app.state.db, org, None).await;

    let token = app.token_for(org, user, OrgRole::Admin);
    let check: serde_json::Value = app.get(&limits_uri(org, kind), &token).await.json();
    assert_eq!(check["current"], 0);
    assert_eq!(check["allowed"], true);
}

#[tokio::test]
async fn unknown_limit_type_is_rejected() {
    let app = TestApp::new().await;
    let org = Uuid::new_v4();
    let user = Uuid::new_v4();
    seed_organization(&app.state.db, org, None).await;
    seed_org_user(&app.state.db, org, user, OrgRole::Member).await;

    let token = app.token_for(org, user, OrgRole::Member);
    app.get(&limits_uri(org, "gadgets"), &token)
        .await
        .assert_bad_request();
}

#[tokio::test]
async fn cross_organization_check_is_forbidden() {
    let app = TestApp::new().await;
    let org = Uuid::new_v4();
    let other_org = Uuid::new_v4();
    let user = Uuid::new_v4();
    seed_organization(&app.state.db, org, None).await;
    seed_organization(&app.state.db, other_org, None).await;
    seed_org_user(&app.state.db, org, user, OrgRole::Admin).await;

    let token = app.token_for(org, user, OrgRole::Admin);
    app.get(&limits_uri(other_org, "workflows"), &token)
        .await
        .assert_forbidden();
}
