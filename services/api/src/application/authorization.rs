//! services/api/src/application/authorization.rs

use tracing::warn;
use uuid::Uuid;
use wanderlust_core::policy;
use wanderlust_core::ports::DatabaseService;

use crate::error::ApiError;

/// Something a user can own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Listing(Uuid),
    Review { listing_id: Uuid, review_id: Uuid },
}

/// Loads the resource and allows the request only if `user_id` owns it
/// (listing owner, or review author).
pub async fn authorize_owner(
    db: &dyn DatabaseService,
    resource: Resource,
    user_id: Uuid,
) -> Result<(), ApiError> {
    let outcome = match resource {
        Resource::Listing(listing_id) => {
            let listing = db.get_listing(listing_id).await?;
            policy::authorize_listing_owner(listing.as_ref(), user_id).map(|_| ())
        }
        Resource::Review {
            listing_id,
            review_id,
        } => {
            let review = db.get_review(review_id).await?;
            policy::authorize_review_author(listing_id, review.as_ref(), user_id).map(|_| ())
        }
    };

    outcome.map_err(|denied| {
        warn!(%user_id, ?resource, "Access denied: {}", denied);
        denied.into()
    })
}
