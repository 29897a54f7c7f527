//! crates/wanderlust_core/src/validation.rs
//!
//! Boundary validation for everything a client can send. These run before any
//! persistence call so a rejected request never leaves a partial write.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::domain::{ListingFields, ListingPatch};

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 30;
pub const PASSWORD_MIN_LEN: usize = 6;
pub const PASSWORD_MAX_LEN: usize = 30;
pub const RATING_MIN: u8 = 1;
pub const RATING_MAX: u8 = 5;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

/// One or more human readable problems with a request, joined by ", ".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    fn from_problems(problems: Vec<String>) -> Result<(), Self> {
        if problems.is_empty() {
            Ok(())
        } else {
            Err(Self(problems.join(", ")))
        }
    }
}

//=========================================================================================
// Users
//=========================================================================================

/// A signup request that passed validation. `email` is trimmed and lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub fn validate_registration(
    username: &str,
    email: &str,
    password: &str,
) -> Result<Registration, ValidationError> {
    let mut problems = Vec::new();
    let username = username.trim();
    if let Err(e) = validate_username(username) {
        problems.push(e.0);
    }
    let email = match normalize_email(email) {
        Ok(email) => email,
        Err(e) => {
            problems.push(e.0);
            String::new()
        }
    };
    let password_len = password.chars().count();
    if password.is_empty() {
        problems.push("Password is required".to_string());
    } else if password_len < PASSWORD_MIN_LEN {
        problems.push(format!(
            "Password must be at least {PASSWORD_MIN_LEN} characters"
        ));
    } else if password_len > PASSWORD_MAX_LEN {
        problems.push(format!(
            "Password must be at most {PASSWORD_MAX_LEN} characters"
        ));
    }
    ValidationError::from_problems(problems)?;

    Ok(Registration {
        username: username.to_string(),
        email,
        password: password.to_string(),
    })
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.trim().chars().count();
    if len == 0 {
        Err(ValidationError("Username is required".to_string()))
    } else if len < USERNAME_MIN_LEN {
        Err(ValidationError(format!(
            "Username must be at least {USERNAME_MIN_LEN} characters"
        )))
    } else if len > USERNAME_MAX_LEN {
        Err(ValidationError(format!(
            "Username must be at most {USERNAME_MAX_LEN} characters"
        )))
    } else {
        Ok(())
    }
}

/// Trims and lower-cases an email after checking its shape.
pub fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError("Email is required".to_string()));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError("Email must be valid".to_string()));
    }
    Ok(email.to_lowercase())
}

/// Checks the new half of a password change. The old password is checked
/// against the stored hash by the caller.
pub fn validate_new_password(
    old_password: &str,
    new_password: &str,
    confirm_password: &str,
) -> Result<(), ValidationError> {
    if old_password.is_empty() || new_password.is_empty() || confirm_password.is_empty() {
        return Err(ValidationError(
            "All password fields are required".to_string(),
        ));
    }
    if new_password != confirm_password {
        return Err(ValidationError("New passwords do not match".to_string()));
    }
    if new_password.chars().count() < PASSWORD_MIN_LEN {
        return Err(ValidationError(format!(
            "New password must be at least {PASSWORD_MIN_LEN} characters long"
        )));
    }
    Ok(())
}

//=========================================================================================
// Listings
//=========================================================================================

/// Raw listing fields as they arrive from a form. Everything is text because
/// multipart bodies carry no types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub location: Option<String>,
    pub country: Option<String>,
}

impl ListingForm {
    /// All of title, price, location and country are required for a new listing.
    pub fn validate_new(self) -> Result<ListingFields, ValidationError> {
        let mut problems = Vec::new();
        let title = required_text("title", self.title, &mut problems);
        let location = required_text("location", self.location, &mut problems);
        let country = required_text("country", self.country, &mut problems);
        let price = match self.price.as_deref().map(str::trim) {
            None | Some("") => {
                problems.push("\"price\" is required".to_string());
                0.0
            }
            Some(raw) => parse_price(raw, &mut problems),
        };
        ValidationError::from_problems(problems)?;

        Ok(ListingFields {
            title,
            description: self
                .description
                .map(|d| d.trim().to_string())
                .unwrap_or_default(),
            price,
            location,
            country,
        })
    }

    /// Only the fields present are validated; present text fields other than
    /// the description must not be blank.
    pub fn validate_patch(self) -> Result<ListingPatch, ValidationError> {
        let mut problems = Vec::new();
        let title = self
            .title
            .map(|t| required_text("title", Some(t), &mut problems));
        let location = self
            .location
            .map(|l| required_text("location", Some(l), &mut problems));
        let country = self
            .country
            .map(|c| required_text("country", Some(c), &mut problems));
        let price = self
            .price
            .map(|p| parse_price(p.trim(), &mut problems));
        ValidationError::from_problems(problems)?;

        Ok(ListingPatch {
            title,
            description: self.description.map(|d| d.trim().to_string()),
            price,
            location,
            country,
        })
    }
}

fn required_text(field: &str, value: Option<String>, problems: &mut Vec<String>) -> String {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => v,
        Some(_) => {
            problems.push(format!("\"{field}\" is not allowed to be empty"));
            String::new()
        }
        None => {
            problems.push(format!("\"{field}\" is required"));
            String::new()
        }
    }
}

fn parse_price(raw: &str, problems: &mut Vec<String>) -> f64 {
    match raw.parse::<f64>() {
        Ok(price) if !price.is_finite() => {
            problems.push("\"price\" must be a number".to_string());
            0.0
        }
        Ok(price) if price < 0.0 => {
            problems.push("\"price\" must be greater than or equal to 0".to_string());
            0.0
        }
        Ok(price) => price,
        Err(_) => {
            problems.push("\"price\" must be a number".to_string());
            0.0
        }
    }
}

/// Image formats the listing gallery can display.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub fn validate_image_filename(filename: &str) -> Result<(), ValidationError> {
    let allowed = filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| IMAGE_EXTENSIONS.iter().any(|a| ext.eq_ignore_ascii_case(a)));
    if allowed {
        Ok(())
    } else {
        Err(ValidationError(
            "Image must be a .jpg, .jpeg or .png file".to_string(),
        ))
    }
}

//=========================================================================================
// Reviews
//=========================================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewForm {
    pub rating: Option<f64>,
    pub comment: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewFields {
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl ReviewForm {
    /// `now` fills in `created_at` when the client leaves it absent or empty.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ReviewFields, ValidationError> {
        let mut problems = Vec::new();

        let rating = match self.rating {
            None => {
                problems.push("\"rating\" is required".to_string());
                0
            }
            Some(r) if r.fract() != 0.0 => {
                problems.push("\"rating\" must be an integer".to_string());
                0
            }
            Some(r) if r < f64::from(RATING_MIN) || r > f64::from(RATING_MAX) => {
                problems.push(format!(
                    "\"rating\" must be between {RATING_MIN} and {RATING_MAX}"
                ));
                0
            }
            // In range and integral, so the cast is exact.
            Some(r) => r as u8,
        };

        let comment = required_text("comment", self.comment, &mut problems);

        let created_at = match self.created_at.as_deref().map(str::trim) {
            None | Some("") => now,
            Some(raw) => match DateTime::parse_from_rfc3339(raw) {
                Ok(at) => at.with_timezone(&Utc),
                Err(_) => {
                    problems.push("\"createdAt\" must be a valid date".to_string());
                    now
                }
            },
        };
        ValidationError::from_problems(problems)?;

        Ok(ReviewFields {
            rating,
            comment,
            created_at,
        })
    }
}
