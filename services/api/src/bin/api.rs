//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, InMemoryAdapter, OpenAiTtsAdapter},
    config::Config,
    error::ApiError,
    web::{cors_layer, rest::ApiDoc, router, state::AppState},
};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use voicebook_core::{LibraryStore, TextToSpeechService, UserStore};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_filter))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect Storage ---
    let (library, users): (Arc<dyn LibraryStore>, Arc<dyn UserStore>) =
        match &config.database_url {
            Some(database_url) => {
                info!("Connecting to database...");
                let db_pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect(database_url)
                    .await?;
                let db_adapter = Arc::new(DbAdapter::new(db_pool));
                info!("Running database migrations...");
                db_adapter.run_migrations().await?;
                info!("Database migrations complete.");
                let library: Arc<dyn LibraryStore> = db_adapter.clone();
                let users: Arc<dyn UserStore> = db_adapter;
                (library, users)
            }
            None => {
                warn!("DATABASE_URL is not set; books and progress are kept in memory only.");
                let store = Arc::new(InMemoryAdapter::new());
                let library: Arc<dyn LibraryStore> = store.clone();
                let users: Arc<dyn UserStore> = store;
                (library, users)
            }
        };

    // --- 3. Initialize Speech Synthesis ---
    let tts: Option<Arc<dyn TextToSpeechService>> = match OpenAiTtsAdapter::from_config(&config)? {
        Some(adapter) => Some(Arc::new(adapter) as Arc<dyn TextToSpeechService>),
        None => {
            warn!("OPENAI_API_KEY is not set; page audio is disabled.");
            None
        }
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(library, users, tts, config.clone()));

    // --- 5. Create the Web Router ---
    let api_router = router(app_state).layer(cors_layer(&config.cors_allowed_origin)?);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
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
