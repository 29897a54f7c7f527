//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, logout and identity checks.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use wanderlust_core::User;

use crate::error::ApiError;
use crate::web::{cookies, middleware::RequestContext, rest::envelope, state::AppState};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Signup fields arrive nested under `user`.
#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub user: SignupForm,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
struct AuthStatus {
    authenticated: bool,
    user: Option<User>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /user/signup - Create an account and log it in
#[utoipa::path(
    post,
    path = "/user/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User registered and logged in"),
        (status = 400, description = "Invalid fields, or username/email already taken"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let form = req.user;

    let user = state
        .credentials
        .register(&form.username, &form.email, &form.password)
        .await?;
    let cookie = start_session(&state, &headers, &user).await?;

    Ok((
        StatusCode::CREATED,
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        envelope(
            Some("User registered and logged in successfully"),
            json!({ "user": user }),
        ),
    ))
}

/// POST /user/login - Login with username and password
#[utoipa::path(
    post,
    path = "/user/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful; `redirectUrl` is set when a protected page was requested first"),
        (status = 401, description = "Invalid username or password"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let user = state
        .credentials
        .authenticate(&req.username, &req.password)
        .await?;
    let mut set_cookies = vec![(header::SET_COOKIE, start_session(&state, &headers, &user).await?)];

    let mut body = json!({ "user": user });
    if let Some(target) = ctx.pending_redirect {
        body["redirectUrl"] = json!(target);
        set_cookies.push((
            header::SET_COOKIE,
            cookies::clear(cookies::REDIRECT_COOKIE, state.config.production),
        ));
    }
    info!(user_id = %user.id, "User logged in");

    let message = format!("Successfully logged in {}", user.username);
    Ok((
        AppendHeaders(set_cookies),
        envelope(Some(message.as_str()), body),
    ))
}

/// GET /user/logout - Invalidate the current session, if any
#[utoipa::path(
    get,
    path = "/user/logout",
    responses(
        (status = 200, description = "Logged out; repeated calls succeed too")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = cookies::read(&headers, cookies::SESSION_COOKIE) {
        state.sessions.destroy_session(&token).await.map_err(|e| {
            error!("Failed to delete auth session: {:?}", e);
            e
        })?;
    }

    Ok((
        AppendHeaders([(
            header::SET_COOKIE,
            cookies::clear(cookies::SESSION_COOKIE, state.config.production),
        )]),
        envelope(Some("Successfully logged out"), json!({})),
    ))
}

/// GET /user/current - The signed-in user
#[utoipa::path(
    get,
    path = "/user/current",
    responses(
        (status = 200, description = "The signed-in user"),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn current_user_handler(
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, ApiError> {
    let user = ctx.identity.ok_or(ApiError::Unauthenticated)?;
    Ok(envelope(None, json!({ "user": user })))
}

/// GET /user/auth-status - Whether the caller is logged in
#[utoipa::path(
    get,
    path = "/user/auth-status",
    responses(
        (status = 200, description = "`authenticated` flag and, when true, the user")
    )
)]
pub async fn auth_status_handler(Extension(ctx): Extension<RequestContext>) -> impl IntoResponse {
    envelope(
        None,
        AuthStatus {
            authenticated: ctx.identity.is_some(),
            user: ctx.identity,
        },
    )
}

/// Replaces whatever session the request carried with a fresh one and
/// returns its `Set-Cookie` value.
async fn start_session(state: &AppState, headers: &HeaderMap, user: &User) -> Result<String, ApiError> {
    if let Some(previous) = cookies::read(headers, cookies::SESSION_COOKIE) {
        state.sessions.destroy_session(&previous).await?;
    }
    let session = state.sessions.create_session(user.id).await?;
    Ok(cookies::session_cookie(
        &session.id,
        state.sessions.ttl().num_seconds(),
        state.config.production,
    ))
}
