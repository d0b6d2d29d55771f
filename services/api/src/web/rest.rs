//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the book collection endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::{ApiError, ErrorBody};
use crate::web::{auth, reading, state::AppState};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;
use voicebook_core::{ingest_book, Book, NewBook};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        list_books_handler,
        create_book_handler,
        get_book_handler,
        delete_book_handler,
        reading::get_current_page_handler,
        reading::mark_page_finished_handler,
        reading::get_page_handler,
        reading::get_page_audio_handler,
    ),
    components(
        schemas(
            HealthResponse,
            BookResponse,
            ErrorBody,
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            auth::MeResponse,
            reading::CurrentPageResponse,
            reading::FinishPageRequest,
            reading::PageResponse,
        )
    ),
    tags(
        (name = "Voicebook API", description = "Paginated reading with resumable progress and page audio.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Book metadata as returned by the collection endpoints.
#[derive(Serialize, ToSchema)]
pub struct BookResponse {
    pub id: Uuid,
    pub title: String,
    pub author: Option<String>,
    pub source_url: Option<String>,
    pub page_count: u32,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            source_url: book.source_url,
            page_count: book.page_count,
            uploaded_at: book.uploaded_at,
        }
    }
}

/// Fields collected from the multipart upload form.
#[derive(Default)]
struct BookUpload {
    file_name: Option<String>,
    text: Option<String>,
    title: Option<String>,
    author: Option<String>,
    source_url: Option<String>,
}

impl BookUpload {
    /// Explicit title, else the file name without its extension.
    fn resolved_title(&self) -> String {
        self.title
            .clone()
            .or_else(|| {
                self.file_name.as_deref().map(|name| {
                    name.rsplit_once('.')
                        .map_or(name, |(stem, _)| stem)
                        .to_string()
                })
            })
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| "Untitled".to_string())
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(format!("Failed to read multipart data: {}", e))
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// List the caller's books, newest first.
#[utoipa::path(
    get,
    path = "/books",
    responses(
        (status = 200, description = "The caller's collection", body = [BookResponse]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_books_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    let books = app_state.library.list_books_by_user(user_id).await?;
    Ok(Json(books.into_iter().map(BookResponse::from).collect()))
}

/// Upload a plain-text document and paginate it into a new book.
///
/// Accepts a multipart/form-data request with a `file` part (UTF-8 text) and
/// optional `title`, `author` and `source_url` parts.
#[utoipa::path(
    post,
    path = "/books",
    request_body(content_type = "multipart/form-data", description = "The document to upload."),
    responses(
        (status = 201, description = "Book created", body = BookResponse),
        (status = 400, description = "Missing file or invalid text", body = ErrorBody),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_book_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut upload = BookUpload::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                upload.file_name = field.file_name().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_error)?;
                let text = String::from_utf8(data.to_vec()).map_err(|e| {
                    ApiError::BadRequest(format!("Uploaded file is not valid UTF-8 text: {}", e))
                })?;
                upload.text = Some(text.trim_start_matches('\u{feff}').to_string());
            }
            "title" => upload.title = non_empty(field.text().await.map_err(multipart_error)?),
            "author" => upload.author = non_empty(field.text().await.map_err(multipart_error)?),
            "source_url" => {
                upload.source_url = non_empty(field.text().await.map_err(multipart_error)?)
            }
            _ => {}
        }
    }

    let title = upload.resolved_title();
    let text = upload
        .text
        .take()
        .ok_or_else(|| ApiError::BadRequest("Multipart form must include a file".to_string()))?;

    let new_book = NewBook {
        user_id,
        title,
        author: upload.author,
        source_url: upload.source_url,
    };
    let book = ingest_book(
        app_state.library.as_ref(),
        new_book,
        &text,
        app_state.config.page_budget,
    )
    .await?;
    info!(book_id = %book.id, pages = book.page_count, "Book uploaded.");

    Ok((StatusCode::CREATED, Json(BookResponse::from(book))))
}

/// Fetch one of the caller's books.
#[utoipa::path(
    get,
    path = "/books/{book_id}",
    params(("book_id" = Uuid, Path, description = "The book id.")),
    responses(
        (status = 200, description = "Book metadata", body = BookResponse),
        (status = 404, description = "No such book", body = ErrorBody)
    )
)]
pub async fn get_book_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = app_state.owned_book(user_id, book_id).await?;
    Ok(Json(book.into()))
}

/// Delete one of the caller's books with its pages and reading progress.
#[utoipa::path(
    delete,
    path = "/books/{book_id}",
    params(("book_id" = Uuid, Path, description = "The book id.")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "No such book", body = ErrorBody)
    )
)]
pub async fn delete_book_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(book_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state.owned_book(user_id, book_id).await?;
    app_state.library.delete_book(book_id).await?;
    info!(%book_id, "Book deleted.");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(file_name: Option<&str>, title: Option<&str>) -> BookUpload {
        BookUpload {
            file_name: file_name.map(str::to_string),
            title: title.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_title_resolution() {
        assert_eq!(upload(Some("moby.txt"), Some("Moby Dick")).resolved_title(), "Moby Dick");
        assert_eq!(upload(Some("moby.dick.txt"), None).resolved_title(), "moby.dick");
        assert_eq!(upload(Some("README"), None).resolved_title(), "README");
        assert_eq!(upload(Some(".txt"), None).resolved_title(), "Untitled");
        assert_eq!(upload(None, None).resolved_title(), "Untitled");
    }

    #[test]
    fn test_non_empty_trims() {
        assert_eq!(non_empty("  Herman  ".into()), Some("Herman".to_string()));
        assert_eq!(non_empty("   ".into()), None);
    }
}
