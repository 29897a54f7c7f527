#![allow(dead_code)]

use api_lib::{
    adapters::MemoryStore,
    config::Config,
    web::{build_router, state::AppState},
};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;
use std::sync::atomic::{AtomicBool, Ordering};
use wanderlust_core::domain::{
    AuthSession, Listing, ListingSummary, NewListing, NewReview, NewUser, Review, User,
    UserCredentials, UserProfile, UserSummary,
};
use wanderlust_core::{
    DatabaseService, Geometry, GeocodingService, ImageRef, ImageStorageService, ImageUpload,
    PortError, PortResult,
};

//=========================================================================================
// Fake Collaborators
//=========================================================================================

/// Returns whatever candidates the test configured.
pub struct FakeGeocoder {
    candidates: Mutex<Vec<Geometry>>,
}

impl FakeGeocoder {
    pub fn set_candidates(&self, candidates: Vec<Geometry>) {
        *self.candidates.lock().unwrap() = candidates;
    }
}

#[async_trait]
impl GeocodingService for FakeGeocoder {
    async fn forward_geocode(&self, _query: &str) -> PortResult<Vec<Geometry>> {
        Ok(self.candidates.lock().unwrap().clone())
    }
}

/// Records every stored and removed image.
#[derive(Default)]
pub struct FakeImageStore {
    pub stored: Mutex<Vec<ImageRef>>,
    pub removed: Mutex<Vec<ImageRef>>,
}

#[async_trait]
impl ImageStorageService for FakeImageStore {
    async fn store_image(&self, upload: ImageUpload) -> PortResult<ImageRef> {
        let mut stored = self.stored.lock().unwrap();
        let filename = format!("wanderlust/{}-{}", stored.len(), upload.filename);
        let image = ImageRef {
            url: format!("https://images.test/demo/image/upload/{}", filename),
            filename,
        };
        stored.push(image.clone());
        Ok(image)
    }

    async fn remove_image(&self, image: &ImageRef) -> PortResult<()> {
        self.removed.lock().unwrap().push(image.clone());
        Ok(())
    }
}

/// A `MemoryStore` whose listing writes or session reads can be switched to fail.
pub struct FlakyStore {
    pub inner: Arc<MemoryStore>,
    listing_writes_fail: AtomicBool,
    session_reads_fail: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            listing_writes_fail: AtomicBool::new(false),
            session_reads_fail: AtomicBool::new(false),
        }
    }

    pub fn fail_listing_writes(&self) {
        self.listing_writes_fail.store(true, Ordering::SeqCst);
    }

    pub fn fail_session_reads(&self) {
        self.session_reads_fail.store(true, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, what: &str) -> PortResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected(format!("{} refused", what)));
        }
        Ok(())
    }
}

#[async_trait]
impl DatabaseService for FlakyStore {
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        self.inner.create_user(new_user).await
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<Option<User>> {
        self.inner.get_user_by_id(user_id).await
    }

    async fn get_user_by_username(&self, username: &str) -> PortResult<Option<User>> {
        self.inner.get_user_by_username(username).await
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<Option<User>> {
        self.inner.get_user_by_email(email).await
    }

    async fn get_user_summaries(&self, user_ids: &[Uuid]) -> PortResult<Vec<UserSummary>> {
        self.inner.get_user_summaries(user_ids).await
    }

    async fn get_credentials_by_username(
        &self,
        username: &str,
    ) -> PortResult<Option<UserCredentials>> {
        self.inner.get_credentials_by_username(username).await
    }

    async fn get_credentials_by_id(&self, user_id: Uuid) -> PortResult<Option<UserCredentials>> {
        self.inner.get_credentials_by_id(user_id).await
    }

    async fn update_password(&self, user_id: Uuid, hashed_password: &str) -> PortResult<()> {
        self.inner.update_password(user_id, hashed_password).await
    }

    async fn update_username(&self, user_id: Uuid, username: &str) -> PortResult<User> {
        self.inner.update_username(user_id, username).await
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        email: &str,
        profile: &UserProfile,
    ) -> PortResult<User> {
        self.inner.update_profile(user_id, email, profile).await
    }

    async fn create_auth_session(&self, session: &AuthSession) -> PortResult<()> {
        self.inner.create_auth_session(session).await
    }

    async fn get_auth_session(&self, session_id: &str) -> PortResult<Option<AuthSession>> {
        Self::check(&self.session_reads_fail, "session read")?;
        self.inner.get_auth_session(session_id).await
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.inner.delete_auth_session(session_id).await
    }

    async fn create_listing(&self, new_listing: NewListing) -> PortResult<Listing> {
        Self::check(&self.listing_writes_fail, "listing write")?;
        self.inner.create_listing(new_listing).await
    }

    async fn get_listing(&self, listing_id: Uuid) -> PortResult<Option<Listing>> {
        self.inner.get_listing(listing_id).await
    }

    async fn list_listings(&self) -> PortResult<Vec<ListingSummary>> {
        self.inner.list_listings().await
    }

    async fn update_listing(&self, listing: &Listing) -> PortResult<Listing> {
        Self::check(&self.listing_writes_fail, "listing write")?;
        self.inner.update_listing(listing).await
    }

    async fn delete_listing_cascade(
        &self,
        listing_id: Uuid,
        review_ids: &[Uuid],
    ) -> PortResult<bool> {
        self.inner.delete_listing_cascade(listing_id, review_ids).await
    }

    async fn get_review(&self, review_id: Uuid) -> PortResult<Option<Review>> {
        self.inner.get_review(review_id).await
    }

    async fn get_reviews_for_listing(&self, listing_id: Uuid) -> PortResult<Vec<Review>> {
        self.inner.get_reviews_for_listing(listing_id).await
    }

    async fn add_review(&self, new_review: NewReview) -> PortResult<Review> {
        self.inner.add_review(new_review).await
    }

    async fn remove_review(&self, listing_id: Uuid, review_id: Uuid) -> PortResult<bool> {
        self.inner.remove_review(listing_id, review_id).await
    }
}

//=========================================================================================
// Test Application
//=========================================================================================

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub flaky: Arc<FlakyStore>,
    pub geocoder: Arc<FakeGeocoder>,
    pub images: Arc<FakeImageStore>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub set_cookies: Vec<String>,
    pub body: Value,
}

impl TestResponse {
    /// `name=value` of a cookie the response set, ready to send back.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.set_cookies
            .iter()
            .filter_map(|c| c.split(';').next())
            .find(|pair| pair.starts_with(&format!("{}=", name)))
            .map(str::to_string)
    }

    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }
}

pub fn fake_geocoder() -> FakeGeocoder {
    FakeGeocoder {
        candidates: Mutex::new(vec![Geometry::point(-106.82, 39.19)]),
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let flaky = Arc::new(FlakyStore::new(store.clone()));
        let geocoder = Arc::new(fake_geocoder());
        let images = Arc::new(FakeImageStore::default());
        let state = AppState::new(
            Arc::new(config),
            flaky.clone(),
            geocoder.clone(),
            images.clone(),
        )
        .unwrap();
        Self {
            router: build_router(Arc::new(state)),
            store,
            flaky,
            geocoder,
            images,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set_cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse {
            status,
            set_cookies,
            body,
        }
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.send(request(Method::GET, uri, cookie, None)).await
    }

    pub async fn delete(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.send(request(Method::DELETE, uri, cookie, None)).await
    }

    pub async fn post_json(&self, uri: &str, cookie: Option<&str>, body: Value) -> TestResponse {
        self.send(request(Method::POST, uri, cookie, Some(body))).await
    }

    pub async fn put_json(&self, uri: &str, cookie: Option<&str>, body: Value) -> TestResponse {
        self.send(request(Method::PUT, uri, cookie, Some(body))).await
    }

    pub async fn send_multipart(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        fields: &[(&str, &str)],
        image: Option<&str>,
    ) -> TestResponse {
        let (content_type, body) = multipart_body(fields, image);
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    /// Registers a user and returns the session cookie.
    pub async fn signup(&self, username: &str) -> String {
        let response = self
            .post_json(
                "/user/signup",
                None,
                json!({ "user": {
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": "secret123",
                }}),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.cookie("session").unwrap()
    }

    /// Creates the standard test listing and returns its id.
    pub async fn create_listing(&self, cookie: &str) -> Uuid {
        let response = self
            .send_multipart(
                Method::POST,
                "/listing",
                Some(cookie),
                &cabin_fields(),
                Some("cabin.jpg"),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["listing"]["id"].as_str().unwrap().parse().unwrap()
    }

    pub async fn add_review(&self, cookie: &str, listing_id: Uuid, rating: u8) -> TestResponse {
        self.post_json(
            &format!("/listing/{}/review", listing_id),
            Some(cookie),
            json!({ "review": { "rating": rating, "comment": "Lovely stay" } }),
        )
        .await
    }
}

pub fn cabin_fields() -> Vec<(&'static str, &'static str)> {
    vec![
        ("listing[title]", "Cabin"),
        ("listing[description]", "A quiet cabin in the woods"),
        ("listing[price]", "100"),
        ("listing[location]", "Aspen"),
        ("listing[country]", "USA"),
    ]
}

pub fn request(method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

const BOUNDARY: &str = "wanderlust-test-boundary";

pub fn multipart_body(fields: &[(&str, &str)], image: Option<&str>) -> (String, Vec<u8>) {
    multipart_body_as(fields, "listing[image]", image)
}

/// Same as `multipart_body`, with the image part under `image_field`.
pub fn multipart_body_as(
    fields: &[(&str, &str)],
    image_field: &str,
    image: Option<&str>,
) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(filename) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{image_field}\"; filename=\"{filename}\"\r\nContent-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"\xff\xd8\xff\xe0 not really a jpeg");
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}
