//! services/api/src/web/routes.rs
//!
//! Assembles the HTTP router: public and protected routes, the middleware
//! stack and CORS.

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, COOKIE},
        HeaderName, HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::web::{
    auth, listings,
    middleware::{identify, require_auth, require_listing_owner},
    profile,
    rest::{health_handler, not_found_handler},
    reviews,
    state::AppState,
};

/// Builds the application router over the given state.
pub fn build_router(state: Arc<AppState>) -> Router {
    let authenticated = axum_middleware::from_fn_with_state(state.clone(), require_auth);
    let owner_only = axum_middleware::from_fn_with_state(state.clone(), require_listing_owner);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/", get(health_handler))
        .route("/user/signup", post(auth::signup_handler))
        .route("/user/login", post(auth::login_handler))
        .route("/user/logout", get(auth::logout_handler))
        .route("/user/current", get(auth::current_user_handler))
        .route("/user/auth-status", get(auth::auth_status_handler));

    // Protected account routes
    let account_routes = Router::new()
        .route(
            "/user/profile",
            get(profile::get_profile_handler).put(profile::update_profile_handler),
        )
        .route("/user/profile/username", put(profile::change_username_handler))
        .route("/user/profile/password", put(profile::change_password_handler))
        .route_layer(authenticated.clone());

    // Listings mix public reads with protected writes on the same paths, so
    // the gates sit on the individual method routers. The last layer added
    // runs first: authentication, then ownership.
    let listing_routes = Router::new()
        .route(
            "/listing",
            get(listings::index_handler)
                .merge(post(listings::create_listing_handler).route_layer(authenticated.clone())),
        )
        .route(
            "/listing/new",
            get(listings::new_listing_handler).route_layer(authenticated.clone()),
        )
        .route(
            "/listing/{id}",
            get(listings::show_listing_handler).merge(
                patch(listings::update_listing_handler)
                    .delete(listings::delete_listing_handler)
                    .route_layer(owner_only.clone())
                    .route_layer(authenticated.clone()),
            ),
        )
        .route(
            "/listing/{id}/edit",
            get(listings::edit_listing_handler)
                .route_layer(owner_only.clone())
                .route_layer(authenticated.clone()),
        )
        .route(
            "/listing/{id}/review",
            post(reviews::create_review_handler).route_layer(authenticated.clone()),
        )
        .route(
            "/listing/{id}/review/{reviewId}",
            delete(reviews::delete_review_handler).route_layer(authenticated.clone()),
        );

    Router::new()
        .merge(public_routes)
        .merge(account_routes)
        .merge(listing_routes)
        .fallback(not_found_handler)
        .layer(axum_middleware::from_fn_with_state(state.clone(), identify))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(cors_layer(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Credentials are allowed, so origins are matched explicitly: the configured
/// list, plus HTTPS origins under an allowed suffix.
fn cors_layer(state: &AppState) -> CorsLayer {
    let config = state.config.clone();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin
                .to_str()
                .map(|origin| config.is_allowed_origin(origin))
                .unwrap_or(false)
        }))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            ACCEPT,
            COOKIE,
            HeaderName::from_static("x-requested-with"),
        ])
}
