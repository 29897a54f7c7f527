//! services/api/src/web/listings.rs
//!
//! Listing endpoints. Create and update take `multipart/form-data` with the
//! text fields and an optional image part.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;
use utoipa::IntoParams;
use wanderlust_core::validation::ListingForm;
use wanderlust_core::{ImageUpload, ResourceKind, User};

use crate::error::ApiError;
use crate::web::{parse_id, rest::envelope, state::AppState};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListingQuery {
    /// Case-insensitive text matched against title, location and country.
    pub q: Option<String>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /listing - All listings
#[utoipa::path(
    get,
    path = "/listing",
    params(ListingQuery),
    responses(
        (status = 200, description = "Listing summaries")
    )
)]
pub async fn index_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListingQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let listings = state.listings.list(query.q.as_deref()).await?;
    Ok(envelope(None, json!({ "listings": listings })))
}

/// POST /listing - Create a listing owned by the caller
#[utoipa::path(
    post,
    path = "/listing",
    request_body(content_type = "multipart/form-data", description = "listing[title], listing[description], listing[price], listing[location], listing[country] and the listing[image] file."),
    responses(
        (status = 201, description = "Listing created"),
        (status = 400, description = "Invalid fields, missing image, or unknown location"),
        (status = 401, description = "Not logged in"),
        (status = 502, description = "Geocoder or image host failed")
    )
)]
pub async fn create_listing_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let (form, image) = read_listing_form(multipart?).await?;
    let listing = state.listings.create(user.id, form, image).await?;
    Ok((
        StatusCode::CREATED,
        envelope(
            Some("Successfully created a new listing"),
            json!({ "listing": listing }),
        ),
    ))
}

/// GET /listing/{id} - One listing with owner and reviews
#[utoipa::path(
    get,
    path = "/listing/{id}",
    params(("id" = String, Path, description = "Listing id")),
    responses(
        (status = 200, description = "The listing, its owner and its reviews"),
        (status = 404, description = "Listing not found")
    )
)]
pub async fn show_listing_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let listing_id = parse_id(&id, ResourceKind::Listing)?;
    let listing = state.listings.get(listing_id).await?;
    Ok(envelope(None, json!({ "listing": listing })))
}

/// GET /listing/new - Lets the client check it may open the create form
#[utoipa::path(
    get,
    path = "/listing/new",
    responses(
        (status = 200, description = "The caller may create listings"),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn new_listing_handler() -> impl IntoResponse {
    envelope(Some("Ready to create new listing"), json!({}))
}

/// GET /listing/{id}/edit - Data for the owner's edit form
#[utoipa::path(
    get,
    path = "/listing/{id}/edit",
    params(("id" = String, Path, description = "Listing id")),
    responses(
        (status = 200, description = "The listing and a thumbnail of its image"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Listing not found")
    )
)]
pub async fn edit_listing_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let listing_id = parse_id(&id, ResourceKind::Listing)?;
    let (listing, thumbnail) = state.listings.edit_view(listing_id).await?;
    Ok(envelope(
        None,
        json!({ "listing": listing, "originalUrl": thumbnail }),
    ))
}

/// PATCH /listing/{id} - Update some fields and optionally the image
#[utoipa::path(
    patch,
    path = "/listing/{id}",
    params(("id" = String, Path, description = "Listing id")),
    request_body(content_type = "multipart/form-data", description = "Any subset of the listing fields, and optionally a new image."),
    responses(
        (status = 200, description = "Listing updated"),
        (status = 400, description = "Invalid fields or unknown location"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Listing not found")
    )
)]
pub async fn update_listing_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let listing_id = parse_id(&id, ResourceKind::Listing)?;
    let (form, image) = read_listing_form(multipart?).await?;
    let listing = state.listings.update(listing_id, form, image).await?;
    Ok(envelope(
        Some("Successfully updated the listing"),
        json!({ "listing": listing }),
    ))
}

/// DELETE /listing/{id} - Delete a listing and all of its reviews
#[utoipa::path(
    delete,
    path = "/listing/{id}",
    params(("id" = String, Path, description = "Listing id")),
    responses(
        (status = 200, description = "Listing and its reviews deleted"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Listing not found")
    )
)]
pub async fn delete_listing_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let listing_id = parse_id(&id, ResourceKind::Listing)?;
    state.listings.delete(listing_id).await?;
    Ok(envelope(Some("Successfully deleted the listing"), json!({})))
}

//=========================================================================================
// Multipart Parsing
//=========================================================================================

/// Collects the listing fields and image from a multipart body. Field names
/// may be bare (`title`) or nested (`listing[title]`); unknown parts are skipped.
async fn read_listing_form(
    mut multipart: Multipart,
) -> Result<(ListingForm, Option<ImageUpload>), ApiError> {
    let mut form = ListingForm::default();
    let mut image = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(field_key).unwrap_or_default();
        match name.as_str() {
            "image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await?;
                if filename.is_empty() || data.is_empty() {
                    continue;
                }
                image = Some(ImageUpload {
                    filename,
                    content_type,
                    data,
                });
            }
            "title" => form.title = Some(field.text().await?),
            "description" => form.description = Some(field.text().await?),
            "price" => form.price = Some(field.text().await?),
            "location" => form.location = Some(field.text().await?),
            "country" => form.country = Some(field.text().await?),
            other => debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    Ok((form, image))
}

/// Form prefixes the browser client has used for listing fields.
const FIELD_PREFIXES: &[&str] = &["listing[", "lististing["];

fn field_key(name: &str) -> String {
    FIELD_PREFIXES
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix)?.strip_suffix(']'))
        .unwrap_or(name)
        .to_string()
}
