//! Member-type limit guard tests
//!
//! Role changes that flip a member between the lite and full pools must
//! respect the corresponding member maximum; same-pool changes pass
//! untouched.

use serde_json::json;
use uuid::Uuid;

use lattice_licensing::models::{OrgRole, PlanInfo};

use crate::common::fixtures::*;
use crate::common::TestApp;

fn role_uri(org_id: Uuid, user_id: Uuid) -> String {
    format!("/api/v1/organizations/{}/members/{}/role", org_id, user_id)
}

fn team_role_uri(org_id: Uuid, team_id: Uuid, user_id: Uuid) -> String {
    format!(
        "/api/v1/organizations/{}/teams/{}/members/{}/role",
        org_id, team_id, user_id
    )
}

/// Seed an EXTERNAL user whose only permissions are view-only, which makes
/// them a lite member.
async fn seed_lite_user(app: &TestApp, org: Uuid, team: Uuid, view_role: Uuid) -> Uuid {
    let user = Uuid::new_v4();
    seed_org_user(&app.state.db, org, user, OrgRole::External).await;
    seed_team_user(&app.state.db, team, user, Some(view_role)).await;
    user
}

#[tokio::test]
async fn lite_to_full_rejected_at_full_capacity() {
    let app = TestApp::new().await;
    let org = Uuid::new_v4();
    let admin = Uuid::new_v4();
    seed_organization(&app.state.db, org, None).await;

    // Three full members exhaust the free plan.
    seed_org_user(&app.state.db, org, admin, OrgRole::Admin).await;
    seed_org_user(&app.state.db, org, Uuid::new_v4(), OrgRole::Member).await;
    seed_org_user(&app.state.db, org, Uuid::new_v4(), OrgRole::Member).await;

    let team = Uuid::new_v4();
    seed_team(&app.state.db, org, team).await;
    let view_role = Uuid::new_v4();
    seed_custom_role(&app.state.db, org, view_role, &["workflows:view"]).await;
    let lite_user = seed_lite_user(&app, org, team, view_role).await;

    let token = app.token_for(org, admin, OrgRole::Admin);
    let response = app
        .put_json(&role_uri(org, lite_user), &token, json!({"role": "MEMBER"}))
        .await;
    response.assert_forbidden();

    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "limit_exceeded");
    assert_eq!(body["details"]["limit_type"], "members");
}

#[tokio::test]
async fn lite_to_full_allowed_below_capacity() {
    let app = TestApp::new().await;
    let org = Uuid::new_v4();
    let admin = Uuid::new_v4();
    seed_organization(&app.state.db, org, None).await;
    seed_org_user(&app.state.db, org, admin, OrgRole::Admin).await;

    let team = Uuid::new_v4();
    seed_team(&app.state.db, org, team).await;
    let view_role = Uuid::new_v4();
    seed_custom_role(&app.state.db, org, view_role, &["workflows:view"]).await;
    let lite_user = seed_lite_user(&app, org, team, view_role).await;

    let token = app.token_for(org, admin, OrgRole::Admin);
    let response = app
        .put_json(&role_uri(org, lite_user), &token, json!({"role": "MEMBER"}))
        .await;
    response.assert_ok();

    let updated: serde_json::Value = response.json();
    assert_eq!(updated["role"], "MEMBER");
}

#[tokio::test]
async fn full_to_lite_rejected_at_lite_capacity() {
    let app = TestApp::new().await;
    let org = Uuid::new_v4();
    let admin = Uuid::new_v4();
    let target = Uuid::new_v4();
    seed_organization(&app.state.db, org, None).await;
    seed_org_user(&app.state.db, org, admin, OrgRole::Admin).await;
    seed_org_user(&app.state.db, org, target, OrgRole::Member).await;

    // EXTERNAL users without any permissions are lite; three of them fill
    // the free plan's lite pool.
    for _ in 0..3 {
        seed_org_user(&app.state.db, org, Uuid::new_v4(), OrgRole::External).await;
    }

    let token = app.token_for(org, admin, OrgRole::Admin);
    let response = app
        .put_json(&role_uri(org, target), &token, json!({"role": "EXTERNAL"}))
        .await;
    response.assert_forbidden();

    let body: serde_json::Value = response.json();
    assert_eq!(body["details"]["limit_type"], "members_lite");
}

#[tokio::test]
async fn change_within_full_pool_is_never_gated() {
    let app = TestApp::new().await;
    let org = Uuid::new_v4();
    let admin = Uuid::new_v4();
    let target = Uuid::new_v4();
    seed_organization(&app.state.db, org, None).await;

    // At full capacity, but MEMBER -> ADMIN does not change the member type.
    seed_org_user(&app.state.db, org, admin, OrgRole::Admin).await;
    seed_org_user(&app.state.db, org, target, OrgRole::Member).await;
    seed_org_user(&app.state.db, org, Uuid::new_v4(), OrgRole::Member).await;

    let token = app.token_for(org, admin, OrgRole::Admin);
    app.put_json(&role_uri(org, target), &token, json!({"role": "ADMIN"}))
        .await
        .assert_ok();
}

#[tokio::test]
async fn override_bypasses_member_guard() {
    let app = TestApp::new().await;
    let org = Uuid::new_v4();
    let admin = Uuid::new_v4();
    let mut plan = PlanInfo::default();
    plan.override_adding_limitations = true;
    seed_organization(&app.state.db, org, Some(&plan)).await;

    seed_org_user(&app.state.db, org, admin, OrgRole::Admin).await;
    seed_org_user(&app.state.db, org, Uuid::new_v4(), OrgRole::Member).await;
    seed_org_user(&app.state.db, org, Uuid::new_v4(), OrgRole::Member).await;

    let team = Uuid::new_v4();
    seed_team(&app.state.db, org, team).await;
    let view_role = Uuid::new_v4();
    seed_custom_role(&app.state.db, org, view_role, &["workflows:view"]).await;
    let lite_user = seed_lite_user(&app, org, team, view_role).await;

    let token = app.token_for(org, admin, OrgRole::Admin);
    app.put_json(&role_uri(org, lite_user), &token, json!({"role": "MEMBER"}))
        .await
        .assert_ok();
}

#[tokio::test]
async fn team_custom_role_change_is_gated() {
    let app = TestApp::new().await;
    let org = Uuid::new_v4();
    let admin = Uuid::new_v4();
    seed_organization(&app.state.db, org, None).await;

    seed_org_user(&app.state.db, org, admin, OrgRole::Admin).await;
    seed_org_user(&app.state.db, org, Uuid::new_v4(), OrgRole::Member).await;
    seed_org_user(&app.state.db, org, Uuid::new_v4(), OrgRole::Member).await;

    let team = Uuid::new_v4();
    seed_team(&app.state.db, org, team).await;
    let view_role = Uuid::new_v4();
    let edit_role = Uuid::new_v4();
    seed_custom_role(&app.state.db, org, view_role, &["workflows:view"]).await;
    seed_custom_role(&app.state.db, org, edit_role, &["workflows:edit"]).await;
    let lite_user = seed_lite_user(&app, org, team, view_role).await;

    // Swapping the custom role to one with an edit permission makes the
    // EXTERNAL user a full member, and the full pool is already at capacity.
    let token = app.token_for(org, admin, OrgRole::Admin);
    let response = app
        .put_json(
            &team_role_uri(org, team, lite_user),
            &token,
            json!({"role": "member", "custom_role_id": edit_role}),
        )
        .await;
    response.assert_forbidden();
}

#[tokio::test]
async fn team_custom_role_change_allowed_below_capacity() {
    let app = TestApp::new().await;
    let org = Uuid::new_v4();
    let admin = Uuid::new_v4();
    seed_organization(&app.state.db, org, None).await;
    seed_org_user(&app.state.db, org, admin, OrgRole::Admin).await;

    let team = Uuid::new_v4();
    seed_team(&app.state.db, org, team).await;
    let view_role = Uuid::new_v4();
    let edit_role = Uuid::new_v4();
    seed_custom_role(&app.state.db, org, view_role, &["workflows:view"]).await;
    seed_custom_role(&app.state.db, org, edit_role, &["workflows:edit"]).await;
    let lite_user = seed_lite_user(&app, org, team, view_role).await;

    let token = app.token_for(org, admin, OrgRole::Admin);
    let response = app
        .put_json(
            &team_role_uri(org, team, lite_user),
            &token,
            json!({"role": "member", "custom_role_id": edit_role}),
        )
        .await;
    response.assert_ok();

    let updated: serde_json::Value = response.json();
    assert_eq!(updated["assigned_role_id"], edit_role.to_string());
}
