//! Authentication API handlers
//!
//! POST /auth/register, POST /auth/login, POST /auth/oauth-signin

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::db::users::User;
use crate::error::ApiResult;
use crate::services::{IdentityResolver, OAuthProfile, RegisterRequest};
use crate::AppState;

/// User fields exposed by auth responses
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub auth_provider: String,
    pub provider_id: Option<String>,
    pub email_verified: bool,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        UserView {
            id: user.guid.clone(),
            uid: user.uid.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            photo_url: user.photo_url.clone(),
            auth_provider: user.auth_provider.clone(),
            provider_id: user.provider_id.clone(),
            email_verified: user.email_verified,
        }
    }
}

/// POST /auth/login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Success envelope shared by all three auth endpoints
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub user: UserView,
}

/// POST /api/v1/auth/register
///
/// Create a local (password) account. Duplicate email is 409.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let resolver = IdentityResolver::new(state.db.clone());
    let user = resolver.register_local(&request).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            message: "User registered successfully".to_string(),
            user: UserView::from(&user),
        }),
    ))
}

/// POST /api/v1/auth/login
///
/// Authenticate by email and password. Unknown email is 404; a wrong
/// password or a non-local account is 401 with one shared message.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let resolver = IdentityResolver::new(state.db.clone());
    let user = resolver
        .login_local(&request.email, &request.password)
        .await?;

    Ok(Json(AuthResponse {
        success: true,
        message: "Login successful".to_string(),
        user: UserView::from(&user),
    }))
}

/// POST /api/v1/auth/oauth-signin
///
/// Resolve an OAuth assertion: existing uid signs in, a matching email is
/// linked, anything else creates a new account.
pub async fn oauth_sign_in(
    State(state): State<AppState>,
    Json(profile): Json<OAuthProfile>,
) -> ApiResult<Json<AuthResponse>> {
    let resolver = IdentityResolver::new(state.db.clone());
    let user = resolver.oauth_sign_in(&profile).await?;

    Ok(Json(AuthResponse {
        success: true,
        message: "OAuth sign-in successful".to_string(),
        user: UserView::from(&user),
    }))
}

/// Build auth routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/oauth-signin", post(oauth_sign_in))
}
