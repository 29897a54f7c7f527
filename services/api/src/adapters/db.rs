//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use wanderlust_core::domain::{
    AuthSession, Geometry, ImageRef, Listing, ListingSummary, NewListing, NewReview, NewUser,
    Review, User, UserCredentials, UserProfile, UserSummary,
};
use wanderlust_core::ports::{DatabaseService, PortError, PortResult};

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, phone, address, city, \
                            country, profile_picture, created_at";
const LISTING_COLUMNS: &str = "id, title, description, image_url, image_filename, price, \
                               location, country, longitude, latitude, owner_id, created_at";
const REVIEW_COLUMNS: &str = "id, listing_id, author_id, rating, comment, created_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn review_ids(&self, listing_id: Uuid) -> PortResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM reviews WHERE listing_id = $1 ORDER BY position ASC",
        )
        .bind(listing_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Turns unique-constraint failures on the users table into `Conflict`.
fn user_write_error(e: sqlx::Error) -> PortError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            let message = match db_err.constraint() {
                Some("users_email_key") => "Email already in use",
                _ => "A user with the given username is already registered",
            };
            return PortError::Conflict(message.to_string());
        }
    }
    unexpected(e)
}

/// A foreign key failure on insert means the referenced parent is gone.
fn missing_parent(e: sqlx::Error, what: String) -> PortError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_foreign_key_violation() {
            return PortError::NotFound(what);
        }
    }
    unexpected(e)
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    phone: String,
    address: String,
    city: String,
    country: String,
    profile_picture: String,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            profile: UserProfile {
                first_name: self.first_name,
                last_name: self.last_name,
                phone: self.phone,
                address: self.address,
                city: self.city,
                country: self.country,
                profile_picture: self.profile_picture,
            },
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    username: String,
    password_hash: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.id,
            username: self.username,
            hashed_password: self.password_hash,
        }
    }
}

#[derive(FromRow)]
struct UserSummaryRecord {
    id: Uuid,
    username: String,
}

#[derive(FromRow)]
struct AuthSessionRecord {
    id: String,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}
impl AuthSessionRecord {
    fn to_domain(self) -> AuthSession {
        AuthSession {
            id: self.id,
            user_id: self.user_id,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

#[derive(FromRow)]
struct ListingRecord {
    id: Uuid,
    title: String,
    description: String,
    image_url: String,
    image_filename: String,
    price: f64,
    location: String,
    country: String,
    longitude: f64,
    latitude: f64,
    owner_id: Uuid,
    created_at: DateTime<Utc>,
}
impl ListingRecord {
    fn to_domain(self, reviews: Vec<Uuid>) -> Listing {
        Listing {
            id: self.id,
            title: self.title,
            description: self.description,
            image: ImageRef {
                url: self.image_url,
                filename: self.image_filename,
            },
            price: self.price,
            location: self.location,
            country: self.country,
            geometry: Geometry::point(self.longitude, self.latitude),
            owner: self.owner_id,
            reviews,
            created_at: self.created_at,
        }
    }

    fn to_summary(self) -> ListingSummary {
        ListingSummary {
            id: self.id,
            title: self.title,
            image: ImageRef {
                url: self.image_url,
                filename: self.image_filename,
            },
            price: self.price,
            location: self.location,
            country: self.country,
            geometry: Geometry::point(self.longitude, self.latitude),
        }
    }
}

#[derive(FromRow)]
struct ReviewRecord {
    id: Uuid,
    listing_id: Uuid,
    author_id: Uuid,
    rating: i16,
    comment: String,
    created_at: DateTime<Utc>,
}
impl ReviewRecord {
    fn to_domain(self) -> PortResult<Review> {
        let rating = u8::try_from(self.rating)
            .map_err(|_| PortError::Unexpected(format!("Review {} has rating {}", self.id, self.rating)))?;
        Ok(Review {
            id: self.id,
            listing_id: self.listing_id,
            rating,
            comment: self.comment,
            author: self.author_id,
            created_at: self.created_at,
        })
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let sql = format!(
            "INSERT INTO users (id, username, email, password_hash) VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.hashed_password)
            .fetch_one(&self.pool)
            .await
            .map_err(user_write_error)?;
        Ok(record.to_domain())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(UserRecord::to_domain))
    }

    async fn get_user_by_username(&self, username: &str) -> PortResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(UserRecord::to_domain))
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(UserRecord::to_domain))
    }

    async fn get_user_summaries(&self, user_ids: &[Uuid]) -> PortResult<Vec<UserSummary>> {
        let records = sqlx::query_as::<_, UserSummaryRecord>(
            "SELECT id, username FROM users WHERE id = ANY($1)",
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records
            .into_iter()
            .map(|r| UserSummary {
                id: r.id,
                username: r.username,
            })
            .collect())
    }

    async fn get_credentials_by_username(
        &self,
        username: &str,
    ) -> PortResult<Option<UserCredentials>> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, username, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(CredentialsRecord::to_domain))
    }

    async fn get_credentials_by_id(&self, user_id: Uuid) -> PortResult<Option<UserCredentials>> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, username, password_hash FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(CredentialsRecord::to_domain))
    }

    async fn update_password(&self, user_id: Uuid, hashed_password: &str) -> PortResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(hashed_password)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }

    async fn update_username(&self, user_id: Uuid, username: &str) -> PortResult<User> {
        let sql = format!("UPDATE users SET username = $1 WHERE id = $2 RETURNING {USER_COLUMNS}");
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(username)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(user_write_error)?
            .map(UserRecord::to_domain)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        email: &str,
        profile: &UserProfile,
    ) -> PortResult<User> {
        let sql = format!(
            "UPDATE users SET email = $1, first_name = $2, last_name = $3, phone = $4, \
             address = $5, city = $6, country = $7, profile_picture = $8 \
             WHERE id = $9 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(email)
            .bind(&profile.first_name)
            .bind(&profile.last_name)
            .bind(&profile.phone)
            .bind(&profile.address)
            .bind(&profile.city)
            .bind(&profile.country)
            .bind(&profile.profile_picture)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(user_write_error)?
            .map(UserRecord::to_domain)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn create_auth_session(&self, session: &AuthSession) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO auth_sessions (id, user_id, created_at, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn get_auth_session(&self, session_id: &str) -> PortResult<Option<AuthSession>> {
        let record = sqlx::query_as::<_, AuthSessionRecord>(
            "SELECT id, user_id, created_at, expires_at FROM auth_sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(AuthSessionRecord::to_domain))
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn create_listing(&self, new_listing: NewListing) -> PortResult<Listing> {
        let sql = format!(
            "INSERT INTO listings (id, title, description, image_url, image_filename, price, \
             location, country, longitude, latitude, owner_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {LISTING_COLUMNS}"
        );
        let NewListing {
            owner,
            fields,
            image,
            geometry,
        } = new_listing;
        let record = sqlx::query_as::<_, ListingRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&fields.title)
            .bind(&fields.description)
            .bind(&image.url)
            .bind(&image.filename)
            .bind(fields.price)
            .bind(&fields.location)
            .bind(&fields.country)
            .bind(geometry.longitude())
            .bind(geometry.latitude())
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| missing_parent(e, format!("User {} not found", owner)))?;
        Ok(record.to_domain(Vec::new()))
    }

    async fn get_listing(&self, listing_id: Uuid) -> PortResult<Option<Listing>> {
        let sql = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1");
        let Some(record) = sqlx::query_as::<_, ListingRecord>(&sql)
            .bind(listing_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
        else {
            return Ok(None);
        };
        let reviews = self.review_ids(listing_id).await?;
        Ok(Some(record.to_domain(reviews)))
    }

    async fn list_listings(&self) -> PortResult<Vec<ListingSummary>> {
        let sql = format!("SELECT {LISTING_COLUMNS} FROM listings ORDER BY created_at ASC");
        let records = sqlx::query_as::<_, ListingRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(ListingRecord::to_summary).collect())
    }

    async fn update_listing(&self, listing: &Listing) -> PortResult<Listing> {
        let sql = format!(
            "UPDATE listings SET title = $2, description = $3, image_url = $4, \
             image_filename = $5, price = $6, location = $7, country = $8, longitude = $9, \
             latitude = $10 WHERE id = $1 RETURNING {LISTING_COLUMNS}"
        );
        let record = sqlx::query_as::<_, ListingRecord>(&sql)
            .bind(listing.id)
            .bind(&listing.title)
            .bind(&listing.description)
            .bind(&listing.image.url)
            .bind(&listing.image.filename)
            .bind(listing.price)
            .bind(&listing.location)
            .bind(&listing.country)
            .bind(listing.geometry.longitude())
            .bind(listing.geometry.latitude())
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Listing {} not found", listing.id)))?;
        let reviews = self.review_ids(listing.id).await?;
        Ok(record.to_domain(reviews))
    }

    async fn delete_listing_cascade(
        &self,
        listing_id: Uuid,
        review_ids: &[Uuid],
    ) -> PortResult<bool> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // Lock the listing first so a concurrent review insert waits on the
        // foreign key check and then fails instead of slipping in between.
        let locked = sqlx::query_scalar::<_, Uuid>("SELECT id FROM listings WHERE id = $1 FOR UPDATE")
            .bind(listing_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unexpected)?;
        if locked.is_none() {
            return Ok(false);
        }

        sqlx::query("DELETE FROM reviews WHERE id = ANY($1) OR listing_id = $2")
            .bind(review_ids)
            .bind(listing_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        sqlx::query("DELETE FROM listings WHERE id = $1")
            .bind(listing_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(true)
    }

    async fn get_review(&self, review_id: Uuid) -> PortResult<Option<Review>> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1");
        sqlx::query_as::<_, ReviewRecord>(&sql)
            .bind(review_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(ReviewRecord::to_domain)
            .transpose()
    }

    async fn get_reviews_for_listing(&self, listing_id: Uuid) -> PortResult<Vec<Review>> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE listing_id = $1 ORDER BY position ASC"
        );
        let records = sqlx::query_as::<_, ReviewRecord>(&sql)
            .bind(listing_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(ReviewRecord::to_domain).collect()
    }

    async fn add_review(&self, new_review: NewReview) -> PortResult<Review> {
        // The listing's review sequence is `reviews.listing_id` ordered by
        // `position`, so inserting the row also appends the reference.
        let sql = format!(
            "INSERT INTO reviews (id, listing_id, author_id, rating, comment, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {REVIEW_COLUMNS}"
        );
        let record = sqlx::query_as::<_, ReviewRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(new_review.listing_id)
            .bind(new_review.author)
            .bind(i16::from(new_review.rating))
            .bind(&new_review.comment)
            .bind(new_review.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                missing_parent(e, format!("Listing {} not found", new_review.listing_id))
            })?;
        record.to_domain()
    }

    async fn remove_review(&self, listing_id: Uuid, review_id: Uuid) -> PortResult<bool> {
        // One statement both unlinks the review from its listing and deletes it.
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1 AND listing_id = $2")
            .bind(review_id)
            .bind(listing_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }
}
