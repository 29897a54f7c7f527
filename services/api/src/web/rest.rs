//! services/api/src/web/rest.rs
//!
//! The response envelope shared by every handler, the service-level routes,
//! and the master definition for the OpenAPI specification.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::json;
use utoipa::OpenApi;

use crate::application::ProfileUpdate;
use crate::web::{auth, listings, profile, reviews};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::current_user_handler,
        auth::auth_status_handler,
        profile::get_profile_handler,
        profile::update_profile_handler,
        profile::change_username_handler,
        profile::change_password_handler,
        listings::index_handler,
        listings::new_listing_handler,
        listings::create_listing_handler,
        listings::show_listing_handler,
        listings::edit_listing_handler,
        listings::update_listing_handler,
        listings::delete_listing_handler,
        reviews::create_review_handler,
        reviews::delete_review_handler,
    ),
    components(
        schemas(
            auth::SignupRequest,
            auth::SignupForm,
            auth::LoginRequest,
            profile::ChangeUsernameRequest,
            profile::ChangePasswordRequest,
            ProfileUpdate,
            reviews::AddReviewRequest,
            reviews::ReviewFields,
            reviews::RatingInput,
        )
    ),
    tags(
        (name = "Wanderlust API", description = "Listings, reviews and accounts for the Wanderlust rental site.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Response Envelope
//=========================================================================================

/// Every successful response is `{ "success": true, "message"?: ..., ...payload }`.
#[derive(Serialize)]
pub struct Envelope<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(flatten)]
    payload: T,
}

/// Wraps a payload (anything that serializes to a JSON object) in the success envelope.
pub fn envelope<T: Serialize>(message: Option<&str>, payload: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        message: message.map(str::to_string),
        payload,
    })
}

//=========================================================================================
// Service Routes
//=========================================================================================

/// GET / - Liveness check
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "The service is up")
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "OK",
        "message": "Wanderlust API is running",
    }))
}

/// Fallback for every unmatched route.
pub async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": "Route not found",
        })),
    )
}
