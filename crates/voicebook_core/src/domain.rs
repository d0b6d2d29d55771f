//! crates/voicebook_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A text document uploaded by a user. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub author: Option<String>,
    pub source_url: Option<String>,
    pub page_count: u32,
    pub uploaded_at: DateTime<Utc>,
}

/// The metadata needed to create a book. Pages are supplied separately.
#[derive(Debug, Clone)]
pub struct NewBook {
    pub user_id: Uuid,
    pub title: String,
    pub author: Option<String>,
    pub source_url: Option<String>,
}

/// A single persisted page of a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub book_id: Uuid,
    /// 1-based position of the page within its book.
    pub page_index: u32,
    pub text: String,
    /// Filled lazily once speech audio exists for this page.
    pub audio_url: Option<String>,
}

/// A page produced at ingestion time, before it belongs to a stored book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPage {
    pub page_index: u32,
    pub text: String,
}

/// The last page a user finished in a given book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub user_id: Uuid,
    pub book_id: Uuid,
    /// `0` means the user has not finished any page yet.
    pub last_finished_page_index: u32,
    pub updated_at: DateTime<Utc>,
}

/// Where a user currently is in a book, plus the neighbours for navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentPage {
    pub book_id: Uuid,
    pub page_index: u32,
    pub previous_page_index: Option<u32>,
    pub next_page_index: Option<u32>,
}

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}
