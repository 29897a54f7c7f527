//! services/api/src/application/credentials.rs
//!
//! Registration, login and self-service account changes. Passwords are hashed
//! with argon2 and never stored or logged in the clear.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;
use wanderlust_core::domain::{NewUser, User, UserProfile};
use wanderlust_core::ports::DatabaseService;
use wanderlust_core::validation;

use crate::error::ApiError;

const LOGIN_FAILED: &str = "Invalid username or password";

/// Profile fields a user may change. Absent or empty values keep the current one.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Clone)]
pub struct CredentialStore {
    db: Arc<dyn DatabaseService>,
    /// Verified against when the username is unknown, so both login failures cost the same.
    dummy_hash: String,
}

impl CredentialStore {
    pub fn new(db: Arc<dyn DatabaseService>) -> Result<Self, ApiError> {
        let dummy_hash = hash_password("wanderlust-timing-equaliser")?;
        Ok(Self { db, dummy_hash })
    }

    /// Creates an account. Username and normalized email must both be unused.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ApiError> {
        let registration = validation::validate_registration(username, email, password)?;

        if self
            .db
            .get_user_by_username(&registration.username)
            .await?
            .is_some()
        {
            return Err(ApiError::DuplicateIdentity(
                "A user with the given username is already registered".to_string(),
            ));
        }
        if self.db.get_user_by_email(&registration.email).await?.is_some() {
            return Err(ApiError::DuplicateIdentity("Email already in use".to_string()));
        }

        let hashed_password = hash_password(&registration.password)?;
        let user = self
            .db
            .create_user(NewUser {
                username: registration.username,
                email: registration.email,
                hashed_password,
            })
            .await?;
        info!(user_id = %user.id, "Registered new user");
        Ok(user)
    }

    /// Checks a username/password pair. Unknown users and wrong passwords fail identically.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let credentials = self.db.get_credentials_by_username(username.trim()).await?;

        let Some(credentials) = credentials else {
            verify_password(password, &self.dummy_hash)?;
            return Err(ApiError::InvalidCredentials(LOGIN_FAILED.to_string()));
        };
        if !verify_password(password, &credentials.hashed_password)? {
            return Err(ApiError::InvalidCredentials(LOGIN_FAILED.to_string()));
        }

        self.db
            .get_user_by_id(credentials.user_id)
            .await?
            .ok_or_else(|| ApiError::InvalidCredentials(LOGIN_FAILED.to_string()))
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        old_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), ApiError> {
        validation::validate_new_password(old_password, new_password, confirm_password)?;

        let credentials = self
            .db
            .get_credentials_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
        if !verify_password(old_password, &credentials.hashed_password)? {
            return Err(ApiError::InvalidCredentials(
                "Current password is incorrect".to_string(),
            ));
        }

        let hashed_password = hash_password(new_password)?;
        self.db.update_password(user_id, &hashed_password).await?;
        info!(%user_id, "Password changed");
        Ok(())
    }

    pub async fn change_username(&self, user_id: Uuid, new_username: &str) -> Result<User, ApiError> {
        let new_username = new_username.trim();
        validation::validate_username(new_username)?;

        if let Some(existing) = self.db.get_user_by_username(new_username).await? {
            if existing.id != user_id {
                return Err(ApiError::DuplicateIdentity("Username already taken".to_string()));
            }
        }
        Ok(self.db.update_username(user_id, new_username).await?)
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<User, ApiError> {
        self.db
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    pub async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> Result<User, ApiError> {
        let user = self.profile(user_id).await?;

        let email = match update.email.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                let email = validation::normalize_email(raw)?;
                if email != user.email {
                    if let Some(existing) = self.db.get_user_by_email(&email).await? {
                        if existing.id != user_id {
                            return Err(ApiError::DuplicateIdentity(
                                "Email already in use".to_string(),
                            ));
                        }
                    }
                }
                email
            }
            _ => user.email.clone(),
        };

        let current = user.profile;
        let profile = UserProfile {
            first_name: keep_or_replace(current.first_name, update.first_name),
            last_name: keep_or_replace(current.last_name, update.last_name),
            phone: keep_or_replace(current.phone, update.phone),
            address: keep_or_replace(current.address, update.address),
            city: keep_or_replace(current.city, update.city),
            country: keep_or_replace(current.country, update.country),
            profile_picture: keep_or_replace(current.profile_picture, update.profile_picture),
        };

        Ok(self.db.update_profile(user_id, &email, &profile).await?)
    }
}

fn keep_or_replace(current: String, update: Option<String>) -> String {
    match update {
        Some(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => current,
    }
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })
}

fn verify_password(password: &str, hashed_password: &str) -> Result<bool, ApiError> {
    let parsed_hash = PasswordHash::new(hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Authentication error".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
