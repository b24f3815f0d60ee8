//! Member role endpoints
//!
//! Role and custom-role changes go through the member-type limit guard
//! before anything is committed: a change that converts a lite member to a
//! full one (or the reverse) must fit the plan's member maximums.

use axum::{
    extract::{Path, State},
    routing::put,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::MemberRepository,
    middleware::AuthUser,
    models::{role_change_type, OrgRole, TeamUser},
    utils::AppError,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/members/{user_id}/role", put(update_member_role))
        .route(
            "/teams/{team_id}/members/{user_id}/role",
            put(update_team_member_role),
        )
}

#[derive(Debug, Deserialize)]
struct UpdateMemberRoleRequest {
    role: OrgRole,
}

#[derive(Debug, Serialize)]
struct MemberRoleResponse {
    user_id: Uuid,
    organization_id: Uuid,
    role: OrgRole,
}

#[derive(Debug, Deserialize)]
struct UpdateTeamMemberRoleRequest {
    role: String,
    #[serde(default)]
    custom_role_id: Option<Uuid>,
}

fn require_org_admin(auth_user: &AuthUser, org_id: Uuid) -> Result<(), AppError> {
    if auth_user.organization_id != org_id {
        return Err(AppError::Forbidden(
            "Operation not allowed for another organization".to_string(),
        ));
    }
    if !auth_user.is_admin() {
        return Err(AppError::Forbidden("ADMIN role required".to_string()));
    }
    Ok(())
}

/// Change a member's organization-level role.
async fn update_member_role(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateMemberRoleRequest>,
) -> Result<Json<MemberRoleResponse>, AppError> {
    require_org_admin(&auth_user, org_id)?;

    let repo = MemberRepository::new(&state.db);
    let old_role = repo
        .org_role(org_id, user_id)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Organization member not found".to_string()))?;

    // Custom-role permissions are unchanged by an org-role change, so the
    // same set applies before and after.
    let permissions = repo
        .effective_permissions(org_id, user_id, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    let change = role_change_type(old_role, &permissions, payload.role, &permissions);

    state
        .member_guard
        .check_role_change(org_id, change, Some(auth_user.id))
        .await?;

    let updated = repo
        .update_org_role(org_id, user_id, payload.role)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    if !updated {
        return Err(AppError::NotFound(
            "Organization member not found".to_string(),
        ));
    }

    Ok(Json(MemberRoleResponse {
        user_id,
        organization_id: org_id,
        role: payload.role,
    }))
}

/// Change a member's team role and custom-role assignment.
async fn update_team_member_role(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((org_id, team_id, user_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(payload): Json<UpdateTeamMemberRoleRequest>,
) -> Result<Json<TeamUser>, AppError> {
    require_org_admin(&auth_user, org_id)?;

    let repo = MemberRepository::new(&state.db);
    let in_org = repo
        .team_in_organization(org_id, team_id)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    if !in_org {
        return Err(AppError::NotFound("Team not found".to_string()));
    }

    let org_role = repo
        .org_role(org_id, user_id)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Organization member not found".to_string()))?;

    repo.team_user(team_id, user_id)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Team member not found".to_string()))?;

    let old_permissions = repo
        .effective_permissions(org_id, user_id, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    // The prospective permission set replaces this team's assignment with
    // the requested custom role.
    let mut new_permissions = repo
        .effective_permissions(org_id, user_id, Some(team_id))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    if let Some(custom_role_id) = payload.custom_role_id {
        let perms = repo
            .custom_role_permissions(custom_role_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound("Custom role not found".to_string()))?;
        new_permissions.extend(perms);
    }

    let change = role_change_type(org_role, &old_permissions, org_role, &new_permissions);
    state
        .member_guard
        .check_role_change(org_id, change, Some(auth_user.id))
        .await?;

    let updated = repo
        .update_team_role(team_id, user_id, &payload.role, payload.custom_role_id)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    if !updated {
        return Err(AppError::NotFound("Team member not found".to_string()));
    }

    Ok(Json(TeamUser {
        user_id,
        team_id,
        role: payload.role,
        assigned_role_id: payload.custom_role_id,
    }))
}
