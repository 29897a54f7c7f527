pub mod auth;
pub mod cookies;
pub mod listings;
pub mod middleware;
pub mod profile;
pub mod rest;
pub mod reviews;
pub mod routes;
pub mod state;

pub use routes::build_router;

use uuid::Uuid;
use wanderlust_core::ResourceKind;

use crate::error::ApiError;

/// Path ids that are not UUIDs cannot name anything, so they are reported as not found.
pub(crate) fn parse_id(raw: &str, kind: ResourceKind) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(format!("{} not found", kind)))
}
