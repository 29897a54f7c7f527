//! services/api/src/web/reviews.rs

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;
use wanderlust_core::validation::ReviewForm;
use wanderlust_core::{ResourceKind, User};

use crate::error::ApiError;
use crate::web::{parse_id, rest::envelope, state::AppState};

/// Browsers post the star value either as a JSON number or as its text.
#[derive(Deserialize, ToSchema)]
#[serde(untagged)]
pub enum RatingInput {
    Number(f64),
    Text(String),
}

impl RatingInput {
    fn parse(self) -> Result<Option<f64>, ApiError> {
        match self {
            Self::Number(n) => Ok(Some(n)),
            Self::Text(text) if text.trim().is_empty() => Ok(None),
            Self::Text(text) => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Some)
                .ok_or_else(|| ApiError::Validation("\"rating\" must be a number".to_string())),
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFields {
    pub rating: Option<RatingInput>,
    pub comment: Option<String>,
    /// RFC 3339; the server time is used when absent.
    pub created_at: Option<String>,
}

/// Review fields arrive nested under `review`.
#[derive(Deserialize, ToSchema)]
pub struct AddReviewRequest {
    pub review: ReviewFields,
}

impl TryFrom<ReviewFields> for ReviewForm {
    type Error = ApiError;

    fn try_from(fields: ReviewFields) -> Result<Self, Self::Error> {
        let rating = match fields.rating {
            Some(input) => input.parse()?,
            None => None,
        };
        Ok(Self {
            rating,
            comment: fields.comment,
            created_at: fields.created_at,
        })
    }
}

/// POST /listing/{id}/review - Review someone else's listing
#[utoipa::path(
    post,
    path = "/listing/{id}/review",
    params(("id" = String, Path, description = "Listing id")),
    request_body = AddReviewRequest,
    responses(
        (status = 201, description = "Review added"),
        (status = 400, description = "Rating outside 1..=5 or empty comment"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Reviewing your own listing"),
        (status = 404, description = "Listing not found")
    )
)]
pub async fn create_review_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    payload: Result<Json<AddReviewRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let listing_id = parse_id(&id, ResourceKind::Listing)?;
    let Json(req) = payload?;
    let review = state
        .reviews
        .add(listing_id, user.id, req.review.try_into()?)
        .await?;
    Ok((
        StatusCode::CREATED,
        envelope(
            Some("Successfully added a new review"),
            json!({ "review": review }),
        ),
    ))
}

/// DELETE /listing/{id}/review/{reviewId} - Remove your own review
#[utoipa::path(
    delete,
    path = "/listing/{id}/review/{reviewId}",
    params(
        ("id" = String, Path, description = "Listing id"),
        ("reviewId" = String, Path, description = "Review id")
    ),
    responses(
        (status = 200, description = "Review deleted"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Review not found on this listing")
    )
)]
pub async fn delete_review_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path((id, review_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let listing_id = parse_id(&id, ResourceKind::Listing)?;
    let review_id = parse_id(&review_id, ResourceKind::Review)?;
    state.reviews.remove(listing_id, review_id, user.id).await?;
    Ok(envelope(Some("Successfully deleted the review"), json!({})))
}

#[cfg(test)]
mod tests {
    use super::AddReviewRequest;
    use wanderlust_core::validation::ReviewForm;

    fn form(body: &str) -> Result<ReviewForm, crate::error::ApiError> {
        let req: AddReviewRequest = serde_json::from_str(body).unwrap();
        ReviewForm::try_from(req.review)
    }

    #[test]
    fn rating_accepts_numbers_and_numeric_text() {
        assert_eq!(form(r#"{"review":{"rating":4}}"#).unwrap().rating, Some(4.0));
        assert_eq!(form(r#"{"review":{"rating":" 3 "}}"#).unwrap().rating, Some(3.0));
        assert_eq!(form(r#"{"review":{"rating":""}}"#).unwrap().rating, None);
    }

    #[test]
    fn non_numeric_rating_text_is_rejected() {
        assert!(form(r#"{"review":{"rating":"abc"}}"#).is_err());
        assert!(form(r#"{"review":{"rating":"NaN"}}"#).is_err());
    }
}
