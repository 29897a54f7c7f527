//! services/api/src/web/middleware.rs
//!
//! Identity resolution, authentication gate and ownership checks.

use axum::{
    extract::{Path, Request, State},
    http::header,
    middleware::Next,
    response::{AppendHeaders, IntoResponse, Response},
    Extension,
};
use std::sync::Arc;
use tracing::{debug, error};
use wanderlust_core::{ResourceKind, User};

use crate::application::{authorize_owner, Resource};
use crate::error::ApiError;
use crate::web::{cookies, parse_id, state::AppState};

/// What the request carries about its caller, resolved once per request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub identity: Option<User>,
    /// Where the caller was headed before being asked to log in.
    pub pending_redirect: Option<String>,
    /// Set when the session store could not be read.
    pub lookup_error: Option<String>,
}

/// Resolves the session cookie into an identity. Never rejects a request:
/// unknown or expired sessions leave it anonymous, and a store failure is
/// recorded for the routes that need an identity.
pub async fn identify(State(state): State<Arc<AppState>>, mut req: Request, next: Next) -> Response {
    let mut lookup_error = None;
    let identity = match cookies::read(req.headers(), cookies::SESSION_COOKIE) {
        Some(token) => match state.sessions.resolve_session(&token).await {
            Ok(user) => user,
            Err(e) => {
                error!("Failed to resolve session: {:?}", e);
                lookup_error = Some(e.to_string());
                None
            }
        },
        None => None,
    };
    let pending_redirect = cookies::read(req.headers(), cookies::REDIRECT_COOKIE)
        .and_then(|value| cookies::decode_redirect(&value));

    req.extensions_mut().insert(RequestContext {
        identity,
        pending_redirect,
        lookup_error,
    });
    next.run(req).await
}

/// Rejects anonymous requests with 401 and remembers the requested path so a
/// later login can send the user back. A failed session lookup is a 500. Signed-in requests get the `User`
/// inserted into their extensions.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let context = req
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_default();
    if let Some(cause) = context.lookup_error {
        return ApiError::Internal(cause).into_response();
    }

    match context.identity {
        Some(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        None => {
            let target = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| req.uri().path().to_string());
            debug!(%target, "Anonymous request to a protected route");
            let cookie = cookies::redirect_cookie(&target, state.config.production);
            (
                AppendHeaders([(header::SET_COOKIE, cookie)]),
                ApiError::Unauthenticated,
            )
                .into_response()
        }
    }
}

/// Lets the request through only if the caller owns the listing in the path.
pub async fn require_listing_owner(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Extension(user): Extension<User>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let listing_id = parse_id(&id, ResourceKind::Listing)?;
    authorize_owner(state.db.as_ref(), Resource::Listing(listing_id), user.id).await?;
    Ok(next.run(req).await)
}
