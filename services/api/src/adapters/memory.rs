//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the `DatabaseService` port. Used when no
//! `DATABASE_URL` is configured and by the integration tests.
//!
//! All tables sit behind one lock, so every port call is atomic, including
//! the multi-record ones.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;
use wanderlust_core::domain::{
    AuthSession, Listing, ListingSummary, NewListing, NewReview, NewUser, Review, User,
    UserCredentials, UserProfile, UserSummary,
};
use wanderlust_core::ports::{DatabaseService, PortError, PortResult};

struct StoredUser {
    user: User,
    hashed_password: String,
}

impl StoredUser {
    fn credentials(&self) -> UserCredentials {
        UserCredentials {
            user_id: self.user.id,
            username: self.user.username.clone(),
            hashed_password: self.hashed_password.clone(),
        }
    }
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, StoredUser>,
    sessions: HashMap<String, AuthSession>,
    listings: HashMap<Uuid, Listing>,
    /// Listing ids in creation order, for the index view.
    listing_order: Vec<Uuid>,
    reviews: HashMap<Uuid, Review>,
}

impl Tables {
    fn username_taken(&self, username: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.user.username == username && Some(u.user.id) != except)
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.user.email == email && Some(u.user.id) != except)
    }

    fn user_mut(&mut self, user_id: Uuid) -> PortResult<&mut StoredUser> {
        self.users
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }
}

/// A `DatabaseService` that keeps everything in memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored reviews across all listings.
    pub async fn review_count(&self) -> usize {
        self.tables.read().await.reviews.len()
    }

    /// Number of stored listings.
    pub async fn listing_count(&self) -> usize {
        self.tables.read().await.listings.len()
    }
}

#[async_trait]
impl DatabaseService for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let mut tables = self.tables.write().await;
        if tables.username_taken(&new_user.username, None) {
            return Err(PortError::Conflict(
                "A user with the given username is already registered".to_string(),
            ));
        }
        if tables.email_taken(&new_user.email, None) {
            return Err(PortError::Conflict("Email already in use".to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            profile: UserProfile::default(),
            created_at: Utc::now(),
        };
        tables.users.insert(
            user.id,
            StoredUser {
                user: user.clone(),
                hashed_password: new_user.hashed_password,
            },
        );
        Ok(user)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&user_id).map(|u| u.user.clone()))
    }

    async fn get_user_by_username(&self, username: &str) -> PortResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.user.username == username)
            .map(|u| u.user.clone()))
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.user.email == email)
            .map(|u| u.user.clone()))
    }

    async fn get_user_summaries(&self, user_ids: &[Uuid]) -> PortResult<Vec<UserSummary>> {
        let tables = self.tables.read().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| tables.users.get(id))
            .map(|u| u.user.summary())
            .collect())
    }

    async fn get_credentials_by_username(
        &self,
        username: &str,
    ) -> PortResult<Option<UserCredentials>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.user.username == username)
            .map(StoredUser::credentials))
    }

    async fn get_credentials_by_id(&self, user_id: Uuid) -> PortResult<Option<UserCredentials>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&user_id).map(StoredUser::credentials))
    }

    async fn update_password(&self, user_id: Uuid, hashed_password: &str) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        tables.user_mut(user_id)?.hashed_password = hashed_password.to_string();
        Ok(())
    }

    async fn update_username(&self, user_id: Uuid, username: &str) -> PortResult<User> {
        let mut tables = self.tables.write().await;
        if tables.username_taken(username, Some(user_id)) {
            return Err(PortError::Conflict(
                "A user with the given username is already registered".to_string(),
            ));
        }
        let stored = tables.user_mut(user_id)?;
        stored.user.username = username.to_string();
        Ok(stored.user.clone())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        email: &str,
        profile: &UserProfile,
    ) -> PortResult<User> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(email, Some(user_id)) {
            return Err(PortError::Conflict("Email already in use".to_string()));
        }
        let stored = tables.user_mut(user_id)?;
        stored.user.email = email.to_string();
        stored.user.profile = profile.clone();
        Ok(stored.user.clone())
    }

    async fn create_auth_session(&self, session: &AuthSession) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&session.user_id) {
            return Err(PortError::NotFound(format!(
                "User {} not found",
                session.user_id
            )));
        }
        tables.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get_auth_session(&self, session_id: &str) -> PortResult<Option<AuthSession>> {
        let tables = self.tables.read().await;
        Ok(tables.sessions.get(session_id).cloned())
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables.write().await.sessions.remove(session_id);
        Ok(())
    }

    async fn create_listing(&self, new_listing: NewListing) -> PortResult<Listing> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&new_listing.owner) {
            return Err(PortError::NotFound(format!(
                "User {} not found",
                new_listing.owner
            )));
        }
        let NewListing {
            owner,
            fields,
            image,
            geometry,
        } = new_listing;
        let listing = Listing {
            id: Uuid::new_v4(),
            title: fields.title,
            description: fields.description,
            image,
            price: fields.price,
            location: fields.location,
            country: fields.country,
            geometry,
            owner,
            reviews: Vec::new(),
            created_at: Utc::now(),
        };
        tables.listing_order.push(listing.id);
        tables.listings.insert(listing.id, listing.clone());
        Ok(listing)
    }

    async fn get_listing(&self, listing_id: Uuid) -> PortResult<Option<Listing>> {
        let tables = self.tables.read().await;
        Ok(tables.listings.get(&listing_id).cloned())
    }

    async fn list_listings(&self) -> PortResult<Vec<ListingSummary>> {
        let tables = self.tables.read().await;
        Ok(tables
            .listing_order
            .iter()
            .filter_map(|id| tables.listings.get(id))
            .map(ListingSummary::from)
            .collect())
    }

    async fn update_listing(&self, listing: &Listing) -> PortResult<Listing> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .listings
            .get_mut(&listing.id)
            .ok_or_else(|| PortError::NotFound(format!("Listing {} not found", listing.id)))?;
        stored.title = listing.title.clone();
        stored.description = listing.description.clone();
        stored.image = listing.image.clone();
        stored.price = listing.price;
        stored.location = listing.location.clone();
        stored.country = listing.country.clone();
        stored.geometry = listing.geometry;
        Ok(stored.clone())
    }

    async fn delete_listing_cascade(
        &self,
        listing_id: Uuid,
        review_ids: &[Uuid],
    ) -> PortResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.listings.contains_key(&listing_id) {
            return Ok(false);
        }
        for review_id in review_ids {
            tables.reviews.remove(review_id);
        }
        tables.reviews.retain(|_, r| r.listing_id != listing_id);
        tables.listings.remove(&listing_id);
        tables.listing_order.retain(|id| *id != listing_id);
        Ok(true)
    }

    async fn get_review(&self, review_id: Uuid) -> PortResult<Option<Review>> {
        let tables = self.tables.read().await;
        Ok(tables.reviews.get(&review_id).cloned())
    }

    async fn get_reviews_for_listing(&self, listing_id: Uuid) -> PortResult<Vec<Review>> {
        let tables = self.tables.read().await;
        let Some(listing) = tables.listings.get(&listing_id) else {
            return Ok(Vec::new());
        };
        Ok(listing
            .reviews
            .iter()
            .filter_map(|id| tables.reviews.get(id))
            .cloned()
            .collect())
    }

    async fn add_review(&self, new_review: NewReview) -> PortResult<Review> {
        let mut tables = self.tables.write().await;
        let review = Review {
            id: Uuid::new_v4(),
            listing_id: new_review.listing_id,
            rating: new_review.rating,
            comment: new_review.comment,
            author: new_review.author,
            created_at: new_review.created_at,
        };
        let listing = tables.listings.get_mut(&review.listing_id).ok_or_else(|| {
            PortError::NotFound(format!("Listing {} not found", review.listing_id))
        })?;
        listing.reviews.push(review.id);
        tables.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    async fn remove_review(&self, listing_id: Uuid, review_id: Uuid) -> PortResult<bool> {
        let mut tables = self.tables.write().await;
        let belongs = tables
            .reviews
            .get(&review_id)
            .is_some_and(|r| r.listing_id == listing_id);
        if !belongs {
            return Ok(false);
        }
        if let Some(listing) = tables.listings.get_mut(&listing_id) {
            listing.reviews.retain(|id| *id != review_id);
        }
        tables.reviews.remove(&review_id);
        Ok(true)
    }
}
