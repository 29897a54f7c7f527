//! crates/wanderlust_core/src/policy.rs
//!
//! Ownership rules for listings and reviews.
//!
//! Every check takes the looked-up resource as an `Option` so a missing
//! record is an explicit `NotFound` outcome, never a dereference of nothing.

use std::fmt;

use uuid::Uuid;

use crate::domain::{Listing, Review};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Listing,
    Review,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listing => f.write_str("Listing"),
            Self::Review => f.write_str("Review"),
        }
    }
}

/// Why a request may not touch a resource.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessDenied {
    #[error("{0} not found")]
    NotFound(ResourceKind),
    #[error("{0}")]
    Forbidden(&'static str),
}

/// Only the owner may edit or delete a listing.
pub fn authorize_listing_owner(listing: Option<&Listing>, user_id: Uuid) -> Result<&Listing, AccessDenied> {
    let listing = listing.ok_or(AccessDenied::NotFound(ResourceKind::Listing))?;
    if listing.owner != user_id {
        return Err(AccessDenied::Forbidden(
            "You do not have permission to edit this listing",
        ));
    }
    Ok(listing)
}

/// Only the author may delete a review, and only through the listing it belongs to.
pub fn authorize_review_author(
    listing_id: Uuid,
    review: Option<&Review>,
    user_id: Uuid,
) -> Result<&Review, AccessDenied> {
    let review = review
        .filter(|r| r.listing_id == listing_id)
        .ok_or(AccessDenied::NotFound(ResourceKind::Review))?;
    if review.author != user_id {
        return Err(AccessDenied::Forbidden(
            "You do not have permission to delete this review",
        ));
    }
    Ok(review)
}

/// Any signed-in user except the owner may review a listing.
pub fn authorize_review_creation(listing: Option<&Listing>, user_id: Uuid) -> Result<&Listing, AccessDenied> {
    let listing = listing.ok_or(AccessDenied::NotFound(ResourceKind::Listing))?;
    if listing.owner == user_id {
        return Err(AccessDenied::Forbidden("You cannot review your own listing"));
    }
    Ok(listing)
}
