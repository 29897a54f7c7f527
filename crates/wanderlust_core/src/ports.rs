//! crates/wanderlust_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    AuthSession, Geometry, ImageRef, ImageUpload, Listing, ListingSummary, NewListing, NewReview,
    NewUser, Review, User, UserCredentials, UserProfile, UserSummary,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Persistence for users, sessions, listings and reviews.
///
/// Lookups return `Ok(None)` for a missing record so callers have to branch on
/// absence explicitly. Every method must be atomic on its own: the multi-record
/// operations (`add_review`, `remove_review`, `delete_listing_cascade`) either
/// apply completely or not at all.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users ---
    async fn create_user(&self, new_user: NewUser) -> PortResult<User>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<Option<User>>;

    async fn get_user_by_username(&self, username: &str) -> PortResult<Option<User>>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<Option<User>>;

    async fn get_user_summaries(&self, user_ids: &[Uuid]) -> PortResult<Vec<UserSummary>>;

    async fn get_credentials_by_username(
        &self,
        username: &str,
    ) -> PortResult<Option<UserCredentials>>;

    async fn get_credentials_by_id(&self, user_id: Uuid) -> PortResult<Option<UserCredentials>>;

    async fn update_password(&self, user_id: Uuid, hashed_password: &str) -> PortResult<()>;

    async fn update_username(&self, user_id: Uuid, username: &str) -> PortResult<User>;

    async fn update_profile(
        &self,
        user_id: Uuid,
        email: &str,
        profile: &UserProfile,
    ) -> PortResult<User>;

    // --- Auth Sessions ---
    async fn create_auth_session(&self, session: &AuthSession) -> PortResult<()>;

    async fn get_auth_session(&self, session_id: &str) -> PortResult<Option<AuthSession>>;

    /// Removing an unknown session is not an error.
    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Listings ---
    async fn create_listing(&self, new_listing: NewListing) -> PortResult<Listing>;

    async fn get_listing(&self, listing_id: Uuid) -> PortResult<Option<Listing>>;

    async fn list_listings(&self) -> PortResult<Vec<ListingSummary>>;

    /// Writes the mutable columns (title, description, image, price, location,
    /// country, geometry). Owner and reviews are never written here.
    async fn update_listing(&self, listing: &Listing) -> PortResult<Listing>;

    /// Deletes the given reviews, any other review still pointing at the
    /// listing, and then the listing itself in one unit.
    /// Returns `false` when the listing did not exist.
    async fn delete_listing_cascade(&self, listing_id: Uuid, review_ids: &[Uuid])
        -> PortResult<bool>;

    // --- Reviews ---
    async fn get_review(&self, review_id: Uuid) -> PortResult<Option<Review>>;

    /// Reviews of a listing in creation order.
    async fn get_reviews_for_listing(&self, listing_id: Uuid) -> PortResult<Vec<Review>>;

    /// Inserts the review and appends it to the listing's review sequence.
    /// Fails with `NotFound` when the listing is gone.
    async fn add_review(&self, new_review: NewReview) -> PortResult<Review>;

    /// Pulls the review from the listing's sequence and deletes it.
    /// Returns `false` when there was nothing to remove.
    async fn remove_review(&self, listing_id: Uuid, review_id: Uuid) -> PortResult<bool>;
}

#[async_trait]
pub trait GeocodingService: Send + Sync {
    /// Resolves free text into candidate points, best match first.
    async fn forward_geocode(&self, query: &str) -> PortResult<Vec<Geometry>>;
}

#[async_trait]
pub trait ImageStorageService: Send + Sync {
    /// Stores an uploaded image and returns where it can be fetched from.
    async fn store_image(&self, upload: ImageUpload) -> PortResult<ImageRef>;

    async fn remove_image(&self, image: &ImageRef) -> PortResult<()>;
}
