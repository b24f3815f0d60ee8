//! License limit endpoints

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::{
    middleware::AuthUser,
    services::license::{LimitCheck, LimitType},
    utils::AppError,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/{limit_type}", get(check_limit))
}

async fn check_limit(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((org_id, limit_type)): Path<(Uuid, String)>,
) -> Result<Json<LimitCheck>, AppError> {
    if auth_user.organization_id != org_id {
        return Err(AppError::Forbidden(
            "Operation not allowed for another organization".to_string(),
        ));
    }

    let limit_type = LimitType::parse(&limit_type)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown limit type: {}", limit_type)))?;

    let check = state
        .license
        .check_limit(org_id, limit_type, Some(auth_user.id))
        .await?;
    Ok(Json(check))
}
