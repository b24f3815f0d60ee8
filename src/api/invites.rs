//! Organization invite endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    middleware::AuthUser,
    models::{CreateInvitesRequest, InviteResult, OrganizationInvite},
    utils::AppError,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_invites).post(create_invites))
        .route("/request", post(create_invite_requests))
        .route("/{invite_id}/approve", post(approve_invite))
        .route("/{invite_id}", delete(delete_invite))
}

fn require_same_org(auth_user: &AuthUser, org_id: Uuid) -> Result<(), AppError> {
    if auth_user.organization_id == org_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Operation not allowed for another organization".to_string(),
        ))
    }
}

fn require_admin(auth_user: &AuthUser) -> Result<(), AppError> {
    if auth_user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("ADMIN role required".to_string()))
    }
}

async fn list_invites(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(org_id): Path<Uuid>,
) -> Result<Json<Vec<OrganizationInvite>>, AppError> {
    require_same_org(&auth_user, org_id)?;

    let invites = state.invitations.list_invites(org_id).await?;
    Ok(Json(invites))
}

/// Member path: request invitations that wait for admin approval.
async fn create_invite_requests(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(org_id): Path<Uuid>,
    Json(payload): Json<CreateInvitesRequest>,
) -> Result<(StatusCode, Json<Vec<OrganizationInvite>>), AppError> {
    require_same_org(&auth_user, org_id)?;

    let invites = state
        .invitations
        .create_invite_requests(org_id, auth_user.id, payload.invites)
        .await?;
    Ok((StatusCode::CREATED, Json(invites)))
}

/// Admin path: create immediately-pending invitations and notify recipients.
async fn create_invites(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(org_id): Path<Uuid>,
    Json(payload): Json<CreateInvitesRequest>,
) -> Result<(StatusCode, Json<Vec<InviteResult>>), AppError> {
    require_same_org(&auth_user, org_id)?;
    require_admin(&auth_user)?;

    let results = state
        .invitations
        .create_invites(org_id, payload.invites)
        .await?;
    Ok((StatusCode::CREATED, Json(results)))
}

async fn approve_invite(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((org_id, invite_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<InviteResult>, AppError> {
    require_same_org(&auth_user, org_id)?;
    require_admin(&auth_user)?;

    let result = state.invitations.approve_invite(org_id, invite_id).await?;
    Ok(Json(result))
}

async fn delete_invite(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((org_id, invite_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    require_same_org(&auth_user, org_id)?;
    require_admin(&auth_user)?;

    state.invitations.delete_invite(org_id, invite_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
