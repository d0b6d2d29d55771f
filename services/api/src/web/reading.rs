//! services/api/src/web/reading.rs
//!
//! Handlers for reading a book page by page: the current position, marking a
//! page finished, and fetching a page's text or synthesized audio.
//!
//! Every handler checks that the book belongs to the caller before touching
//! the progress tracker.

use crate::adapters::tts::AUDIO_CONTENT_TYPE;
use crate::error::{ApiError, ErrorBody};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use voicebook_core::{CurrentPage, Page};

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The page the reader should be on, with its neighbours for navigation.
#[derive(Serialize, ToSchema)]
pub struct CurrentPageResponse {
    pub book_id: Uuid,
    pub page_index: u32,
    pub previous_page_index: Option<u32>,
    pub next_page_index: Option<u32>,
}

impl From<CurrentPage> for CurrentPageResponse {
    fn from(current: CurrentPage) -> Self {
        Self {
            book_id: current.book_id,
            page_index: current.page_index,
            previous_page_index: current.previous_page_index,
            next_page_index: current.next_page_index,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct FinishPageRequest {
    pub page_index: u32,
}

#[derive(Serialize, ToSchema)]
pub struct PageResponse {
    pub book_id: Uuid,
    pub page_index: u32,
    pub text: String,
    pub audio_url: Option<String>,
}

impl From<Page> for PageResponse {
    fn from(page: Page) -> Self {
        Self {
            book_id: page.book_id,
            page_index: page.page_index,
            text: page.text,
            audio_url: page.audio_url,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Where the caller should continue reading.
///
/// The first call for a book starts the caller on its first page.
#[utoipa::path(
    get,
    path = "/books/{book_id}/progress",
    params(("book_id" = Uuid, Path, description = "The book id.")),
    responses(
        (status = 200, description = "Current page and neighbours", body = CurrentPageResponse),
        (status = 404, description = "No such book, or the book has no pages", body = ErrorBody)
    )
)]
pub async fn get_current_page_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<CurrentPageResponse>, ApiError> {
    app_state.owned_book(user_id, book_id).await?;
    let current = app_state.tracker.get_current_page(user_id, book_id).await?;
    Ok(Json(current.into()))
}

/// Record a page as finished. Any existing page may be marked, in any order.
#[utoipa::path(
    post,
    path = "/books/{book_id}/progress",
    params(("book_id" = Uuid, Path, description = "The book id.")),
    request_body = FinishPageRequest,
    responses(
        (status = 204, description = "Progress saved"),
        (status = 400, description = "The page does not exist", body = ErrorBody),
        (status = 404, description = "No such book", body = ErrorBody)
    )
)]
pub async fn mark_page_finished_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(book_id): Path<Uuid>,
    Json(req): Json<FinishPageRequest>,
) -> Result<StatusCode, ApiError> {
    app_state.owned_book(user_id, book_id).await?;
    app_state
        .tracker
        .mark_page_finished(user_id, book_id, req.page_index)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The text of one page.
#[utoipa::path(
    get,
    path = "/books/{book_id}/pages/{page_index}",
    params(
        ("book_id" = Uuid, Path, description = "The book id."),
        ("page_index" = u32, Path, description = "1-based page index.")
    ),
    responses(
        (status = 200, description = "The page", body = PageResponse),
        (status = 404, description = "No such book or page", body = ErrorBody)
    )
)]
pub async fn get_page_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path((book_id, page_index)): Path<(Uuid, u32)>,
) -> Result<Json<PageResponse>, ApiError> {
    app_state.owned_book(user_id, book_id).await?;
    let page = app_state.library.get_page(book_id, page_index).await?;
    Ok(Json(page.into()))
}

/// Speech audio for one page.
#[utoipa::path(
    get,
    path = "/books/{book_id}/pages/{page_index}/audio",
    params(
        ("book_id" = Uuid, Path, description = "The book id."),
        ("page_index" = u32, Path, description = "1-based page index.")
    ),
    responses(
        (status = 200, description = "Synthesized speech", body = Vec<u8>, content_type = "audio/mpeg"),
        (status = 404, description = "No such book or page", body = ErrorBody),
        (status = 502, description = "Speech synthesis failed", body = ErrorBody),
        (status = 503, description = "Speech synthesis is not configured", body = ErrorBody)
    )
)]
pub async fn get_page_audio_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path((book_id, page_index)): Path<(Uuid, u32)>,
) -> Result<impl IntoResponse, ApiError> {
    app_state.owned_book(user_id, book_id).await?;
    let tts = app_state
        .tts
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("Speech synthesis is not configured".to_string()))?;

    let page = app_state.library.get_page(book_id, page_index).await?;
    let audio = tts
        .generate_audio(&page.text)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;
    info!(%book_id, page_index, bytes = audio.len(), "Page audio generated.");

    Ok(([(header::CONTENT_TYPE, AUDIO_CONTENT_TYPE)], bytes::Bytes::from(audio)))
}
