//! services/api/src/web/state.rs
//!
//! Defines the application state shared by every request.

use crate::application::{CredentialStore, ListingService, ReviewService, SessionManager};
use crate::config::Config;
use crate::error::ApiError;
use chrono::Duration;
use std::sync::Arc;
use wanderlust_core::ports::{DatabaseService, GeocodingService, ImageStorageService};

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub credentials: CredentialStore,
    pub sessions: SessionManager,
    pub listings: ListingService,
    pub reviews: ReviewService,
}

impl AppState {
    /// Wires the use-case services onto the given adapters.
    pub fn new(
        config: Arc<Config>,
        db: Arc<dyn DatabaseService>,
        geocoder: Arc<dyn GeocodingService>,
        images: Arc<dyn ImageStorageService>,
    ) -> Result<Self, ApiError> {
        let session_ttl = Duration::try_days(config.session_ttl_days)
            .ok_or_else(|| ApiError::Internal("SESSION_TTL_DAYS is out of range".to_string()))?;
        Ok(Self {
            credentials: CredentialStore::new(db.clone())?,
            sessions: SessionManager::new(db.clone(), session_ttl),
            listings: ListingService::new(db.clone(), geocoder, images),
            reviews: ReviewService::new(db.clone()),
            db,
            config,
        })
    }
}
