//! crates/wanderlust_core/src/domain.rs
//!
//! Defines the core data structures for the marketplace.
//! These structs are independent of any database; the serde derives only
//! describe how they appear inside JSON payloads.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Users
//=========================================================================================

/// Optional, self-service profile fields. Empty strings mean "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub profile_picture: String,
}

/// Represents a user - used throughout app. Never carries the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(flatten)]
    pub profile: UserProfile,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

/// The public face of a user, embedded as listing owner and review author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
}

// Only used internally for login and password changes - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub username: String,
    pub hashed_password: String,
}

/// A user row about to be inserted. The email is already normalized.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

//=========================================================================================
// Listings
//=========================================================================================

/// A GeoJSON-style point. Serializes as `{"type":"Point","coordinates":[lng,lat]}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: [f64; 2] },
}

impl Geometry {
    pub fn point(longitude: f64, latitude: f64) -> Self {
        Self::Point {
            coordinates: [longitude, latitude],
        }
    }

    pub fn longitude(&self) -> f64 {
        match self {
            Self::Point { coordinates } => coordinates[0],
        }
    }

    pub fn latitude(&self) -> f64 {
        match self {
            Self::Point { coordinates } => coordinates[1],
        }
    }
}

/// Where a stored image lives. `filename` is the provider's key, needed to remove it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    pub url: String,
    pub filename: String,
}

/// An uploaded file on its way to the image storage provider.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// A listing as stored. `reviews` keeps review ids in creation order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image: ImageRef,
    pub price: f64,
    pub location: String,
    pub country: String,
    pub geometry: Geometry,
    pub owner: Uuid,
    pub reviews: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// The validated, owner-editable fields of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingFields {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub location: String,
    pub country: String,
}

/// A validated partial update. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub location: Option<String>,
    pub country: Option<String>,
}

impl ListingPatch {
    /// Applies the patch to the mutable fields only; owner and reviews stay as they are.
    pub fn apply_to(self, listing: &mut Listing) {
        if let Some(title) = self.title {
            listing.title = title;
        }
        if let Some(description) = self.description {
            listing.description = description;
        }
        if let Some(price) = self.price {
            listing.price = price;
        }
        if let Some(location) = self.location {
            listing.location = location;
        }
        if let Some(country) = self.country {
            listing.country = country;
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewListing {
    pub owner: Uuid,
    pub fields: ListingFields,
    pub image: ImageRef,
    pub geometry: Geometry,
}

/// Index-view projection of a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingSummary {
    pub id: Uuid,
    pub title: String,
    pub image: ImageRef,
    pub price: f64,
    pub location: String,
    pub country: String,
    pub geometry: Geometry,
}

impl From<&Listing> for ListingSummary {
    fn from(listing: &Listing) -> Self {
        Self {
            id: listing.id,
            title: listing.title.clone(),
            image: listing.image.clone(),
            price: listing.price,
            location: listing.location.clone(),
            country: listing.country.clone(),
            geometry: listing.geometry,
        }
    }
}

/// A listing with its owner and reviews (and their authors) resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDetails {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image: ImageRef,
    pub price: f64,
    pub location: String,
    pub country: String,
    pub geometry: Geometry,
    pub owner: UserSummary,
    pub reviews: Vec<ReviewView>,
    pub created_at: DateTime<Utc>,
}

impl ListingDetails {
    pub fn assemble(listing: Listing, owner: UserSummary, reviews: Vec<ReviewView>) -> Self {
        Self {
            id: listing.id,
            title: listing.title,
            description: listing.description,
            image: listing.image,
            price: listing.price,
            location: listing.location,
            country: listing.country,
            geometry: listing.geometry,
            owner,
            reviews,
            created_at: listing.created_at,
        }
    }
}

//=========================================================================================
// Reviews
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub rating: u8,
    pub comment: String,
    pub author: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub listing_id: Uuid,
    pub author: Uuid,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// A review as shown on its listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub id: Uuid,
    pub rating: u8,
    pub comment: String,
    pub author: UserSummary,
    pub created_at: DateTime<Utc>,
}

impl ReviewView {
    pub fn new(review: Review, author: UserSummary) -> Self {
        Self {
            id: review.id,
            rating: review.rating,
            comment: review.comment,
            author,
            created_at: review.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_serializes_as_geojson_point() {
        let json = serde_json::to_value(Geometry::point(-106.82, 39.19)).unwrap();
        assert_eq!(json["type"], "Point");
        assert_eq!(json["coordinates"][0], -106.82);
        assert_eq!(json["coordinates"][1], 39.19);
    }

    #[test]
    fn patch_leaves_owner_and_reviews_alone() {
        let owner = Uuid::new_v4();
        let review = Uuid::new_v4();
        let mut listing = Listing {
            id: Uuid::new_v4(),
            title: "Cabin".to_string(),
            description: String::new(),
            image: ImageRef {
                url: "https://img/cabin.jpg".to_string(),
                filename: "cabin".to_string(),
            },
            price: 100.0,
            location: "Aspen".to_string(),
            country: "USA".to_string(),
            geometry: Geometry::point(0.0, 0.0),
            owner,
            reviews: vec![review],
            created_at: Utc::now(),
        };

        ListingPatch {
            title: Some("Lodge".to_string()),
            price: Some(250.0),
            ..Default::default()
        }
        .apply_to(&mut listing);

        assert_eq!(listing.title, "Lodge");
        assert_eq!(listing.price, 250.0);
        assert_eq!(listing.location, "Aspen");
        assert_eq!(listing.owner, owner);
        assert_eq!(listing.reviews, vec![review]);
    }
}
