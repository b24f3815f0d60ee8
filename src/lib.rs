//! Lattice Licensing Library
//!
//! This crate provides license enforcement and the member-invitation
//! approval workflow for the Lattice platform.

pub mod api;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::Router;

pub use config::AppConfig;
pub use db::DbPool;
pub use middleware::{auth_middleware, AuthUser, Claims};
use services::{InvitationService, LicenseService, MemberLimitGuard};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Database connection pool
    pub db: DbPool,
    /// License enforcement service
    pub license: LicenseService,
    /// Invitation service
    pub invitations: InvitationService,
    /// Member-type limit guard
    pub member_guard: MemberLimitGuard,
}

/// Build the full application router: public routes plus protected routes
/// behind the JWT auth middleware, nested under `/api/v1`.
pub fn app_router(state: AppState) -> Router {
    let protected = api::protected_routes().route_layer(axum::middleware::from_fn_with_state(
        state.clone(),
        auth_middleware,
    ));

    Router::new()
        .nest("/api/v1", api::public_routes().merge(protected))
        .with_state(state)
}
