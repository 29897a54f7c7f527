mod common;

use api_lib::{adapters::MemoryStore, application::ListingService, error::ApiError};
use axum::{
    body::{Body, Bytes},
    http::{header, Method, Request, StatusCode},
};
use common::{
    cabin_fields, fake_geocoder, multipart_body_as, FakeImageStore, FlakyStore, TestApp,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use wanderlust_core::validation::ListingForm;
use wanderlust_core::{DatabaseService, Geometry, ImageUpload};

#[tokio::test]
async fn created_listing_reads_back_with_owner_and_no_reviews() {
    let app = TestApp::new();
    let cookie = app.signup("alice").await;
    let listing_id = app.create_listing(&cookie).await;

    let shown = app.get(&format!("/listing/{}", listing_id), None).await;
    assert_eq!(shown.status, StatusCode::OK);
    let listing = &shown.body["listing"];
    assert_eq!(listing["title"], "Cabin");
    assert_eq!(listing["price"], json!(100.0));
    assert_eq!(listing["location"], "Aspen");
    assert_eq!(listing["country"], "USA");
    assert_eq!(listing["owner"]["username"], "alice");
    assert_eq!(listing["reviews"], json!([]));
    assert_eq!(listing["geometry"]["type"], "Point");
    assert_eq!(listing["geometry"]["coordinates"], json!([-106.82, 39.19]));
}

#[tokio::test]
async fn legacy_lististing_field_names_are_accepted() {
    let app = TestApp::new();
    let cookie = app.signup("alice").await;

    let (content_type, body) = multipart_body_as(
        &[
            ("lististing[title]", "Cabin"),
            ("lististing[description]", "A quiet cabin in the woods"),
            ("lististing[price]", "100"),
            ("lististing[location]", "Aspen"),
            ("lististing[country]", "USA"),
        ],
        "lististing[image]",
        Some("cabin.jpg"),
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/listing")
        .header(header::CONTENT_TYPE, content_type)
        .header(header::COOKIE, &cookie)
        .body(Body::from(body))
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    assert_eq!(response.body["listing"]["title"], "Cabin");
    assert_eq!(app.images.stored.lock().unwrap().len(), 1);
    assert_eq!(app.store.listing_count().await, 1);
}

#[tokio::test]
async fn anonymous_can_read_but_not_create() {
    let app = TestApp::new();

    let index = app.get("/listing", None).await;
    assert_eq!(index.status, StatusCode::OK);
    assert_eq!(index.body["listings"], json!([]));

    let create = app
        .send_multipart(Method::POST, "/listing", None, &cabin_fields(), Some("cabin.jpg"))
        .await;
    assert_eq!(create.status, StatusCode::UNAUTHORIZED);
    assert_eq!(create.message(), "You must be logged in to do that");
    assert_eq!(app.store.listing_count().await, 0);
    assert!(app.images.stored.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_location_persists_nothing() {
    let app = TestApp::new();
    let cookie = app.signup("alice").await;
    app.geocoder.set_candidates(Vec::new());

    let response = app
        .send_multipart(Method::POST, "/listing", Some(&cookie), &cabin_fields(), Some("cabin.jpg"))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.store.listing_count().await, 0);
    assert!(app.images.stored.lock().unwrap().is_empty());
}

#[tokio::test]
async fn create_requires_an_image_and_valid_fields() {
    let app = TestApp::new();
    let cookie = app.signup("alice").await;

    let no_image = app
        .send_multipart(Method::POST, "/listing", Some(&cookie), &cabin_fields(), None)
        .await;
    assert_eq!(no_image.status, StatusCode::BAD_REQUEST);
    assert_eq!(no_image.message(), "Image is required");

    let negative_price = app
        .send_multipart(
            Method::POST,
            "/listing",
            Some(&cookie),
            &[
                ("title", "Cabin"),
                ("price", "-5"),
                ("location", "Aspen"),
                ("country", "USA"),
            ],
            Some("cabin.jpg"),
        )
        .await;
    assert_eq!(negative_price.status, StatusCode::BAD_REQUEST);

    let wrong_format = app
        .send_multipart(Method::POST, "/listing", Some(&cookie), &cabin_fields(), Some("cabin.gif"))
        .await;
    assert_eq!(wrong_format.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.store.listing_count().await, 0);
    assert!(app.images.stored.lock().unwrap().is_empty());
}

#[tokio::test]
async fn index_can_be_filtered() {
    let app = TestApp::new();
    let cookie = app.signup("alice").await;
    app.create_listing(&cookie).await;

    let hit = app.get("/listing?q=aspen", None).await;
    assert_eq!(hit.body["listings"].as_array().unwrap().len(), 1);
    assert_eq!(hit.body["listings"][0]["title"], "Cabin");

    let miss = app.get("/listing?q=lisbon", None).await;
    assert_eq!(miss.body["listings"], json!([]));
}

#[tokio::test]
async fn only_the_owner_can_update() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;
    let listing_id = app.create_listing(&alice).await;
    let uri = format!("/listing/{}", listing_id);

    let by_bob = app
        .send_multipart(Method::PATCH, &uri, Some(&bob), &[("listing[title]", "Mine now")], None)
        .await;
    assert_eq!(by_bob.status, StatusCode::FORBIDDEN);

    let by_alice = app
        .send_multipart(
            Method::PATCH,
            &uri,
            Some(&alice),
            &[("listing[title]", "Log Cabin"), ("listing[price]", "120")],
            None,
        )
        .await;
    assert_eq!(by_alice.status, StatusCode::OK);
    assert_eq!(by_alice.body["listing"]["title"], "Log Cabin");
    assert_eq!(by_alice.body["listing"]["location"], "Aspen");

    let shown = app.get(&uri, None).await;
    assert_eq!(shown.body["listing"]["price"], json!(120.0));
    assert_eq!(shown.body["listing"]["owner"]["username"], "alice");
}

#[tokio::test]
async fn changing_the_location_moves_the_pin() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let listing_id = app.create_listing(&alice).await;

    app.geocoder.set_candidates(vec![Geometry::point(-105.27, 40.01)]);
    let moved = app
        .send_multipart(
            Method::PATCH,
            &format!("/listing/{}", listing_id),
            Some(&alice),
            &[("location", "Boulder")],
            None,
        )
        .await;
    assert_eq!(moved.status, StatusCode::OK);
    assert_eq!(moved.body["listing"]["geometry"]["coordinates"], json!([-105.27, 40.01]));
}

#[tokio::test]
async fn new_image_replaces_and_removes_the_old_one() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let listing_id = app.create_listing(&alice).await;
    let original = app.images.stored.lock().unwrap()[0].clone();

    let updated = app
        .send_multipart(
            Method::PATCH,
            &format!("/listing/{}", listing_id),
            Some(&alice),
            &[],
            Some("porch.jpg"),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_ne!(updated.body["listing"]["image"]["url"], json!(original.url));
    assert_eq!(*app.images.removed.lock().unwrap(), vec![original]);
}

#[tokio::test]
async fn edit_view_is_owner_only_and_offers_a_thumbnail() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;
    let listing_id = app.create_listing(&alice).await;
    let uri = format!("/listing/{}/edit", listing_id);

    assert_eq!(app.get(&uri, None).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.get(&uri, Some(&bob)).await.status, StatusCode::FORBIDDEN);

    let edit = app.get(&uri, Some(&alice)).await;
    assert_eq!(edit.status, StatusCode::OK);
    assert!(edit.body["originalUrl"]
        .as_str()
        .unwrap()
        .contains("/upload/h_300,w_250/"));
}

#[tokio::test]
async fn deleting_a_listing_removes_its_reviews() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;
    let carol = app.signup("carol").await;
    let listing_id = app.create_listing(&alice).await;
    assert_eq!(app.add_review(&bob, listing_id, 4).await.status, StatusCode::CREATED);
    assert_eq!(app.add_review(&carol, listing_id, 5).await.status, StatusCode::CREATED);
    assert_eq!(app.store.review_count().await, 2);

    let uri = format!("/listing/{}", listing_id);
    assert_eq!(app.delete(&uri, Some(&bob)).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.store.review_count().await, 2);

    let deleted = app.delete(&uri, Some(&alice)).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(app.store.review_count().await, 0);
    assert_eq!(app.store.listing_count().await, 0);
    assert_eq!(app.get(&uri, None).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_and_malformed_ids_are_not_found() {
    let app = TestApp::new();
    let cookie = app.signup("alice").await;

    let missing = app.get(&format!("/listing/{}", Uuid::new_v4()), None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.message(), "Listing not found");

    let malformed = app.get("/listing/not-a-uuid", None).await;
    assert_eq!(malformed.status, StatusCode::NOT_FOUND);

    let delete_missing = app
        .delete(&format!("/listing/{}", Uuid::new_v4()), Some(&cookie))
        .await;
    assert_eq!(delete_missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_and_unknown_routes() {
    let app = TestApp::new();

    let health = app.get("/", None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["status"], "OK");

    let unknown = app.get("/nowhere", None).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.body, json!({ "success": false, "message": "Route not found" }));
}

#[tokio::test]
async fn new_listing_form_requires_login() {
    let app = TestApp::new();

    let anonymous = app.get("/listing/new", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let cookie = app.signup("alice").await;
    let signed_in = app.get("/listing/new", Some(&cookie)).await;
    assert_eq!(signed_in.status, StatusCode::OK);
    assert_eq!(signed_in.message(), "Ready to create new listing");
}

fn cabin_form() -> ListingForm {
    ListingForm {
        title: Some("Cabin".to_string()),
        description: Some("A quiet cabin in the woods".to_string()),
        price: Some("100".to_string()),
        location: Some("Aspen".to_string()),
        country: Some("USA".to_string()),
    }
}

fn jpeg(filename: &str) -> ImageUpload {
    ImageUpload {
        filename: filename.to_string(),
        content_type: Some("image/jpeg".to_string()),
        data: Bytes::from_static(b"\xff\xd8\xff\xe0"),
    }
}

fn flaky_service() -> (ListingService, Arc<FlakyStore>, Arc<MemoryStore>, Arc<FakeImageStore>) {
    let memory = Arc::new(MemoryStore::new());
    let store = Arc::new(FlakyStore::new(memory.clone()));
    let images = Arc::new(FakeImageStore::default());
    let service = ListingService::new(store.clone(), Arc::new(fake_geocoder()), images.clone());
    (service, store, memory, images)
}

#[tokio::test]
async fn failed_insert_removes_the_uploaded_image() {
    let (service, store, memory, images) = flaky_service();
    store.fail_listing_writes();

    let result = service
        .create(Uuid::new_v4(), cabin_form(), Some(jpeg("cabin.jpg")))
        .await;

    assert!(matches!(result, Err(ApiError::Internal(_))));
    assert_eq!(memory.listing_count().await, 0);
    let stored = images.stored.lock().unwrap().clone();
    assert_eq!(stored.len(), 1);
    assert_eq!(*images.removed.lock().unwrap(), stored);
}

#[tokio::test]
async fn failed_update_discards_the_new_image_and_keeps_the_old_one() {
    let (service, store, memory, images) = flaky_service();
    let listing = service
        .create(Uuid::new_v4(), cabin_form(), Some(jpeg("cabin.jpg")))
        .await
        .unwrap();
    store.fail_listing_writes();

    let patch = ListingForm {
        title: Some("Renamed".to_string()),
        ..ListingForm::default()
    };
    let result = service
        .update(listing.id, patch, Some(jpeg("porch.png")))
        .await;
    assert!(matches!(result, Err(ApiError::Internal(_))));

    let stored = images.stored.lock().unwrap().clone();
    assert_eq!(stored.len(), 2);
    assert_eq!(*images.removed.lock().unwrap(), vec![stored[1].clone()]);

    let kept = memory.get_listing(listing.id).await.unwrap().unwrap();
    assert_eq!(kept.title, "Cabin");
    assert_eq!(kept.image, listing.image);
}
