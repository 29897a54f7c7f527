//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{CloudinaryImageStore, DbAdapter, MapboxGeocoder, MemoryStore},
    config::Config,
    error::ApiError,
    web::{build_router, rest::ApiDoc, state::AppState},
};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use wanderlust_core::ports::DatabaseService;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    let db: Arc<dyn DatabaseService> = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let db_adapter = DbAdapter::new(db_pool);
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(db_adapter)
        }
        None => {
            warn!("DATABASE_URL is not set; keeping all data in memory until shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    // --- 3. Initialize Service Adapters ---
    let http_client = reqwest::Client::new();
    let geocoder = Arc::new(MapboxGeocoder::new(
        http_client.clone(),
        config.require_mapbox_token()?,
    ));
    let images = Arc::new(CloudinaryImageStore::new(
        http_client,
        config.require_cloudinary()?,
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(config.clone(), db, geocoder, images)?);

    // --- 5. Create the Web Router ---
    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(build_router(app_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
