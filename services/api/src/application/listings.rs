//! services/api/src/application/listings.rs
//!
//! Listing lifecycle: create (geocode + image upload), read, partial update,
//! and cascading delete.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;
use wanderlust_core::domain::{
    Geometry, ImageRef, ImageUpload, Listing, ListingDetails, ListingSummary, NewListing,
    ReviewView, UserSummary,
};
use wanderlust_core::ports::{DatabaseService, GeocodingService, ImageStorageService, PortError};
use wanderlust_core::validation::{validate_image_filename, ListingForm};

use crate::error::ApiError;

const LISTING_NOT_FOUND: &str = "Listing not found";

#[derive(Clone)]
pub struct ListingService {
    db: Arc<dyn DatabaseService>,
    geocoder: Arc<dyn GeocodingService>,
    images: Arc<dyn ImageStorageService>,
}

impl ListingService {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        geocoder: Arc<dyn GeocodingService>,
        images: Arc<dyn ImageStorageService>,
    ) -> Self {
        Self {
            db,
            geocoder,
            images,
        }
    }

    /// All listings, optionally narrowed to those whose title, location or
    /// country contains `query` (case-insensitive).
    pub async fn list(&self, query: Option<&str>) -> Result<Vec<ListingSummary>, ApiError> {
        let listings = self.db.list_listings().await?;
        let needle = query
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());
        let Some(needle) = needle else {
            return Ok(listings);
        };
        Ok(listings
            .into_iter()
            .filter(|l| {
                [&l.title, &l.location, &l.country]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .collect())
    }

    /// The listing with its owner and reviews (and their authors) resolved.
    pub async fn get(&self, listing_id: Uuid) -> Result<ListingDetails, ApiError> {
        let listing = self.find(listing_id).await?;
        let reviews = self.db.get_reviews_for_listing(listing_id).await?;

        let mut user_ids: Vec<Uuid> = reviews.iter().map(|r| r.author).collect();
        user_ids.push(listing.owner);
        user_ids.sort_unstable();
        user_ids.dedup();
        let users: HashMap<Uuid, UserSummary> = self
            .db
            .get_user_summaries(&user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let owner = users.get(&listing.owner).cloned().ok_or_else(|| {
            ApiError::Internal(format!("Owner {} of listing {} is missing", listing.owner, listing.id))
        })?;
        let reviews = reviews
            .into_iter()
            .map(|review| {
                let author = users.get(&review.author).cloned().ok_or_else(|| {
                    ApiError::Internal(format!("Author {} of review {} is missing", review.author, review.id))
                })?;
                Ok(ReviewView::new(review, author))
            })
            .collect::<Result<Vec<_>, ApiError>>()?;

        Ok(ListingDetails::assemble(listing, owner, reviews))
    }

    /// The stored listing plus a thumbnail of its image, for the edit form.
    pub async fn edit_view(&self, listing_id: Uuid) -> Result<(Listing, String), ApiError> {
        let listing = self.find(listing_id).await?;
        let thumbnail = thumbnail_url(&listing.image.url);
        Ok((listing, thumbnail))
    }

    /// Validates, geocodes, stores the image, then persists. Nothing is
    /// persisted when any step fails.
    pub async fn create(
        &self,
        owner: Uuid,
        form: ListingForm,
        image: Option<ImageUpload>,
    ) -> Result<Listing, ApiError> {
        let fields = form.validate_new()?;
        let upload = image.ok_or_else(|| ApiError::Validation("Image is required".to_string()))?;
        validate_image_filename(&upload.filename)?;
        let geometry = self.geocode(&fields.location).await?;
        let image = self.images.store_image(upload).await.map_err(upstream)?;

        let created = self
            .db
            .create_listing(NewListing {
                owner,
                fields,
                image: image.clone(),
                geometry,
            })
            .await;
        match created {
            Ok(listing) => {
                info!(listing_id = %listing.id, %owner, "Listing created");
                Ok(listing)
            }
            Err(e) => {
                self.discard_image(&image).await;
                Err(e.into())
            }
        }
    }

    /// Applies the fields present in `form`. A changed location is geocoded
    /// again; a new image replaces the old one, which is then removed.
    pub async fn update(
        &self,
        listing_id: Uuid,
        form: ListingForm,
        image: Option<ImageUpload>,
    ) -> Result<Listing, ApiError> {
        let patch = form.validate_patch()?;
        if let Some(upload) = &image {
            validate_image_filename(&upload.filename)?;
        }
        let mut listing = self.find(listing_id).await?;

        let location_changed = patch
            .location
            .as_ref()
            .is_some_and(|location| *location != listing.location);
        patch.apply_to(&mut listing);
        if location_changed {
            listing.geometry = self.geocode(&listing.location).await?;
        }

        let replaced = match image {
            Some(upload) => {
                let new_image = self.images.store_image(upload).await.map_err(upstream)?;
                Some(std::mem::replace(&mut listing.image, new_image))
            }
            None => None,
        };

        match self.db.update_listing(&listing).await {
            Ok(updated) => {
                if let Some(old_image) = replaced {
                    self.discard_image(&old_image).await;
                }
                info!(%listing_id, "Listing updated");
                Ok(updated)
            }
            Err(e) => {
                if replaced.is_some() {
                    self.discard_image(&listing.image).await;
                }
                Err(e.into())
            }
        }
    }

    /// Removes the listing and every review attached to it in one unit.
    pub async fn delete(&self, listing_id: Uuid) -> Result<(), ApiError> {
        let listing = self.find(listing_id).await?;
        let deleted = self
            .db
            .delete_listing_cascade(listing_id, &listing.reviews)
            .await?;
        if !deleted {
            return Err(ApiError::NotFound(LISTING_NOT_FOUND.to_string()));
        }
        info!(%listing_id, reviews = listing.reviews.len(), "Listing deleted");
        self.discard_image(&listing.image).await;
        Ok(())
    }

    async fn find(&self, listing_id: Uuid) -> Result<Listing, ApiError> {
        self.db
            .get_listing(listing_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(LISTING_NOT_FOUND.to_string()))
    }

    /// First candidate wins; no candidates is a client error.
    async fn geocode(&self, location: &str) -> Result<Geometry, ApiError> {
        let candidates = self
            .geocoder
            .forward_geocode(location)
            .await
            .map_err(upstream)?;
        candidates.into_iter().next().ok_or_else(|| {
            warn!(location, "Geocoder returned no candidates");
            ApiError::Geocode(format!("Could not find a location matching \"{}\"", location))
        })
    }

    /// Best effort; a failure only leaves an orphaned file at the image host.
    async fn discard_image(&self, image: &ImageRef) {
        if let Err(e) = self.images.remove_image(image).await {
            error!("Failed to remove image {}: {:?}", image.filename, e);
        }
    }
}

fn upstream(err: PortError) -> ApiError {
    ApiError::Upstream(err.to_string())
}

/// Image-host URL of a 250x300 thumbnail of the given image.
pub fn thumbnail_url(url: &str) -> String {
    url.replacen("/upload", "/upload/h_300,w_250", 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thumbnail_is_requested_from_the_image_host() {
        assert_eq!(
            thumbnail_url("https://res.cloudinary.com/demo/image/upload/v1/wanderlust/a.jpg"),
            "https://res.cloudinary.com/demo/image/upload/h_300,w_250/v1/wanderlust/a.jpg"
        );
        assert_eq!(thumbnail_url("https://elsewhere/a.jpg"), "https://elsewhere/a.jpg");
    }
}
