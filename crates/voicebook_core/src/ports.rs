//! crates/voicebook_core/src/ports.rs
//!
//! Defines the service contracts (traits) the core consumes.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to stay independent of specific implementations like Postgres or a TTS vendor.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Book, NewBook, NewPage, Page, Progress, User, UserCredentials};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Books, their pages and per-user reading progress.
#[async_trait]
pub trait LibraryStore: Send + Sync {
    // --- Books ---

    /// Inserts the book row and every page in one transaction.
    /// Either all of them become visible or none do.
    async fn create_book(&self, book: NewBook, pages: Vec<NewPage>) -> PortResult<Book>;

    async fn get_book(&self, book_id: Uuid) -> PortResult<Book>;

    async fn list_books_by_user(&self, user_id: Uuid) -> PortResult<Vec<Book>>;

    /// Removes the book together with its pages and all progress records on it.
    async fn delete_book(&self, book_id: Uuid) -> PortResult<()>;

    // --- Pages ---

    async fn get_page(&self, book_id: Uuid, page_index: u32) -> PortResult<Page>;

    async fn page_exists(&self, book_id: Uuid, page_index: u32) -> PortResult<bool>;

    /// Smallest existing page index strictly greater than `after`.
    async fn next_page_index(&self, book_id: Uuid, after: u32) -> PortResult<Option<u32>>;

    /// Largest existing page index strictly less than `before`.
    async fn previous_page_index(&self, book_id: Uuid, before: u32) -> PortResult<Option<u32>>;

    // --- Progress ---

    async fn get_progress(&self, user_id: Uuid, book_id: Uuid) -> PortResult<Option<Progress>>;

    /// Insert-or-overwrite keyed on (user, book). Must be a single atomic write.
    async fn upsert_progress(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        last_finished_page_index: u32,
    ) -> PortResult<()>;

    /// Inserts a progress record only if none exists for (user, book), then
    /// returns whichever record is stored. Never overwrites a concurrent write.
    async fn init_progress(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        last_finished_page_index: u32,
    ) -> PortResult<Progress>;
}

/// Accounts and login sessions.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `PortError::Conflict` when the email is already registered.
    async fn create_user_with_email(&self, email: &str, hashed_password: &str) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the owning user, or `PortError::Unauthorized` for unknown or expired sessions.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}

#[async_trait]
pub trait TextToSpeechService: Send + Sync {
    /// Generates audio data from a string of text.
    async fn generate_audio(&self, text: &str) -> PortResult<Vec<u8>>;
}
