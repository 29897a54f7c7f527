//! services/api/src/application/reviews.rs

use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use wanderlust_core::domain::{NewReview, Review};
use wanderlust_core::policy;
use wanderlust_core::ports::DatabaseService;
use wanderlust_core::validation::ReviewForm;

use super::authorization::{authorize_owner, Resource};
use crate::error::ApiError;

#[derive(Clone)]
pub struct ReviewService {
    db: Arc<dyn DatabaseService>,
}

impl ReviewService {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    /// Adds a review by `author` and appends it to the listing's review list.
    pub async fn add(&self, listing_id: Uuid, author: Uuid, form: ReviewForm) -> Result<Review, ApiError> {
        let fields = form.validate(Utc::now())?;
        let listing = self.db.get_listing(listing_id).await?;
        policy::authorize_review_creation(listing.as_ref(), author)?;

        let review = self
            .db
            .add_review(NewReview {
                listing_id,
                author,
                rating: fields.rating,
                comment: fields.comment,
                created_at: fields.created_at,
            })
            .await?;
        info!(%listing_id, review_id = %review.id, "Review added");
        Ok(review)
    }

    /// Only the author may remove their review.
    pub async fn remove(&self, listing_id: Uuid, review_id: Uuid, requester: Uuid) -> Result<(), ApiError> {
        authorize_owner(
            self.db.as_ref(),
            Resource::Review {
                listing_id,
                review_id,
            },
            requester,
        )
        .await?;

        if !self.db.remove_review(listing_id, review_id).await? {
            return Err(ApiError::NotFound("Review not found".to_string()));
        }
        info!(%listing_id, %review_id, "Review removed");
        Ok(())
    }
}
