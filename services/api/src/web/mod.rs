pub mod auth;
pub mod middleware;
pub mod reading;
pub mod rest;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::ApiError;
use auth::{login_handler, logout_handler, me_handler, signup_handler};
use reading::{
    get_current_page_handler, get_page_audio_handler, get_page_handler, mark_page_finished_handler,
};
use rest::{
    create_book_handler, delete_book_handler, get_book_handler, health_handler, list_books_handler,
};
use state::AppState;

pub use middleware::require_auth;

/// Builds the API router with every route, auth and request tracing.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/me", get(me_handler))
        .route("/books", get(list_books_handler).post(create_book_handler))
        .route(
            "/books/{book_id}",
            get(get_book_handler).delete(delete_book_handler),
        )
        .route(
            "/books/{book_id}/progress",
            get(get_current_page_handler).post(mark_page_finished_handler),
        )
        .route("/books/{book_id}/pages/{page_index}", get(get_page_handler))
        .route(
            "/books/{book_id}/pages/{page_index}/audio",
            get(get_page_audio_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(app_state.config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// CORS policy for the configured browser origin.
pub fn cors_layer(allowed_origin: &str) -> Result<CorsLayer, ApiError> {
    let origin = allowed_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", allowed_origin, e))
    })?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(middleware::SESSION_HEADER),
        ]))
}
