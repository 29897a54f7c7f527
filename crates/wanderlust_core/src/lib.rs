pub mod domain;
pub mod policy;
pub mod ports;
pub mod validation;

pub use domain::{
    AuthSession, Geometry, ImageRef, ImageUpload, Listing, ListingDetails, ListingFields,
    ListingPatch, ListingSummary, NewListing, NewReview, NewUser, Review, ReviewView, User,
    UserCredentials, UserProfile, UserSummary,
};
pub use policy::{AccessDenied, ResourceKind};
pub use ports::{DatabaseService, GeocodingService, ImageStorageService, PortError, PortResult};
pub use validation::ValidationError;
