//! services/api/src/web/profile.rs
//!
//! Self-service account endpoints. All of them sit behind `require_auth`.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;
use wanderlust_core::User;

use crate::application::ProfileUpdate;
use crate::error::ApiError;
use crate::web::{rest::envelope, state::AppState};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeUsernameRequest {
    #[serde(default)]
    pub new_username: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// GET /user/profile
#[utoipa::path(
    get,
    path = "/user/profile",
    responses(
        (status = 200, description = "The caller's full profile"),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.credentials.profile(user.id).await?;
    Ok(envelope(None, json!({ "user": user })))
}

/// PUT /user/profile
#[utoipa::path(
    put,
    path = "/user/profile",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Profile updated"),
        (status = 400, description = "Invalid email, or email already in use"),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(update) = payload?;
    let user = state.credentials.update_profile(user.id, update).await?;
    Ok(envelope(
        Some("Profile updated successfully"),
        json!({ "user": user }),
    ))
}

/// PUT /user/profile/username
#[utoipa::path(
    put,
    path = "/user/profile/username",
    request_body = ChangeUsernameRequest,
    responses(
        (status = 200, description = "Username changed"),
        (status = 400, description = "Invalid or taken username"),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn change_username_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    payload: Result<Json<ChangeUsernameRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let user = state
        .credentials
        .change_username(user.id, &req.new_username)
        .await?;
    Ok(envelope(
        Some("Username changed successfully"),
        json!({ "user": user }),
    ))
}

/// PUT /user/profile/password
#[utoipa::path(
    put,
    path = "/user/profile/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Missing or mismatched fields"),
        (status = 401, description = "Not logged in, or current password is wrong")
    )
)]
pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    state
        .credentials
        .change_password(
            user.id,
            &req.old_password,
            &req.new_password,
            &req.confirm_password,
        )
        .await?;
    Ok(envelope(Some("Password changed successfully"), json!({})))
}
