//! services/api/src/application/mod.rs
//!
//! Use cases that sit between the HTTP handlers and the core ports.

pub mod authorization;
pub mod credentials;
pub mod listings;
pub mod reviews;
pub mod sessions;

pub use authorization::{authorize_owner, Resource};
pub use credentials::{CredentialStore, ProfileUpdate};
pub use listings::ListingService;
pub use reviews::ReviewService;
pub use sessions::SessionManager;
