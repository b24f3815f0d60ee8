//! Test application setup utilities
//!
//! Provides utilities for setting up test instances of the application
//! with temporary databases and a recording notifier.

use std::sync::Arc;

use axum::{body::Body, http::Request, Router};
use tower::ServiceExt;
use uuid::Uuid;

use lattice_licensing::{
    app_router,
    config::{AppConfig, AuthConfig, DatabaseConfig, LoggingConfig, ServerConfig},
    db,
    middleware::auth::create_access_token,
    models::OrgRole,
    services::{DbPlanProvider, InvitationService, LicenseService, MemberLimitGuard, PlanProvider},
    AppState,
};

use super::mocks::RecordingNotifier;

/// Test application wrapper for integration testing
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    /// Create a new test application with a temporary SQLite database
    pub async fn new() -> Self {
        let config = test_config();
        let db = db::init_pool(&config.database.url)
            .await
            .expect("Failed to initialize test database");

        let plans: Arc<dyn PlanProvider> = Arc::new(DbPlanProvider::new(db.clone()));
        let notifier = Arc::new(RecordingNotifier::new());

        let state = AppState {
            config,
            db: db.clone(),
            license: LicenseService::new(db.clone(), plans.clone()),
            invitations: InvitationService::new(db.clone(), plans.clone(), notifier.clone()),
            member_guard: MemberLimitGuard::new(db, plans),
        };

        let router = app_router(state.clone());

        Self {
            router,
            state,
            notifier,
        }
    }

    /// Mint a token for a user of the given role in the given organization
    pub fn token_for(&self, org_id: Uuid, user_id: Uuid, role: OrgRole) -> String {
        create_access_token(
            &user_id,
            &org_id,
            "test@example.com",
            role,
            &self.state.config.auth.jwt_secret,
            1,
        )
        .expect("Failed to mint test token")
    }

    /// Make an authenticated GET request
    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.request(
            Request::builder()
                .method("GET")
                .uri(uri)
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Make an authenticated POST request with JSON body
    pub async fn post_json(&self, uri: &str, token: &str, body: serde_json::Value) -> TestResponse {
        self.request(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Make an authenticated PUT request with JSON body
    pub async fn put_json(&self, uri: &str, token: &str, body: serde_json::Value) -> TestResponse {
        self.request(
            Request::builder()
                .method("PUT")
                .uri(uri)
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Make an authenticated DELETE request
    pub async fn delete(&self, uri: &str, token: &str) -> TestResponse {
        self.request(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Make an unauthenticated GET request
    pub async fn get_unauthenticated(&self, uri: &str) -> TestResponse {
        self.request(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Make an arbitrary request
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");

        TestResponse { status, body }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: axum::http::StatusCode,
    pub body: bytes::Bytes,
}

impl TestResponse {
    /// Get the response body as a string
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Parse the response body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse response as JSON")
    }

    /// Assert the response status
    pub fn assert_status(&self, expected: axum::http::StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    pub fn assert_ok(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::OK)
    }

    pub fn assert_created(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::CREATED)
    }

    pub fn assert_bad_request(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::BAD_REQUEST)
    }

    pub fn assert_forbidden(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::FORBIDDEN)
    }

    pub fn assert_not_found(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::NOT_FOUND)
    }
}

/// Create a test configuration with a temporary SQLite database
pub fn test_config() -> AppConfig {
    // Use a unique temp file for each test to avoid conflicts
    let db_path = format!(
        "/tmp/lattice_test_{}.db",
        Uuid::new_v4().to_string().replace('-', "")
    );

    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            workers: 1,
        },
        auth: AuthConfig {
            jwt_secret: "test_secret_key_that_is_at_least_32_bytes_long".to_string(),
            token_expiry_hours: 1,
        },
        database: DatabaseConfig {
            url: format!("sqlite://{}?mode=rwc", db_path),
            max_connections: 1,
        },
        logging: LoggingConfig::default(),
        smtp: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = TestApp::new().await;
        let response = app.get_unauthenticated("/api/v1/health").await;
        response.assert_ok();
        let json: serde_json::Value = response.json();
        assert!(json.get("status").is_some());
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let app = TestApp::new().await;
        let uri = format!("/api/v1/organizations/{}/invites", Uuid::new_v4());
        let response = app.get_unauthenticated(&uri).await;
        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
    }
}
