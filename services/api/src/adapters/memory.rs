//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the storage ports. Used when no
//! `DATABASE_URL` is configured and by the HTTP tests.
//!
//! All state sits behind a single lock, so a book and its pages are inserted
//! in one step and a progress upsert is a single atomic write.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;
use voicebook_core::domain::{
    AuthSession, Book, NewBook, NewPage, Page, Progress, User, UserCredentials,
};
use voicebook_core::ports::{LibraryStore, PortError, PortResult, UserStore};

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, UserCredentials>,
    users_by_email: HashMap<String, Uuid>,
    auth_sessions: HashMap<String, AuthSession>,
    books: HashMap<Uuid, Book>,
    /// Pages per book, ordered by index.
    pages: HashMap<Uuid, BTreeMap<u32, Page>>,
    progress: HashMap<(Uuid, Uuid), Progress>,
}

/// Storage adapter that keeps everything in memory.
#[derive(Clone, Default)]
pub struct InMemoryAdapter {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

fn book_not_found(book_id: Uuid) -> PortError {
    PortError::NotFound(format!("Book {} not found", book_id))
}

//=========================================================================================
// `LibraryStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl LibraryStore for InMemoryAdapter {
    async fn create_book(&self, book: NewBook, pages: Vec<NewPage>) -> PortResult<Book> {
        let id = Uuid::new_v4();

        let mut ordered = BTreeMap::new();
        for page in pages {
            let stored = Page {
                book_id: id,
                page_index: page.page_index,
                text: page.text,
                audio_url: None,
            };
            if ordered.insert(page.page_index, stored).is_some() {
                return Err(PortError::Conflict(format!(
                    "duplicate page index {}",
                    page.page_index
                )));
            }
        }

        let stored = Book {
            id,
            user_id: book.user_id,
            title: book.title,
            author: book.author,
            source_url: book.source_url,
            page_count: ordered.len() as u32,
            uploaded_at: Utc::now(),
        };

        let mut state = self.state.write().await;
        state.books.insert(id, stored.clone());
        state.pages.insert(id, ordered);
        Ok(stored)
    }

    async fn get_book(&self, book_id: Uuid) -> PortResult<Book> {
        self.state
            .read()
            .await
            .books
            .get(&book_id)
            .cloned()
            .ok_or_else(|| book_not_found(book_id))
    }

    async fn list_books_by_user(&self, user_id: Uuid) -> PortResult<Vec<Book>> {
        let state = self.state.read().await;
        let mut books: Vec<Book> = state
            .books
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        books.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(books)
    }

    async fn delete_book(&self, book_id: Uuid) -> PortResult<()> {
        let mut state = self.state.write().await;
        if state.books.remove(&book_id).is_none() {
            return Err(book_not_found(book_id));
        }
        state.pages.remove(&book_id);
        state.progress.retain(|(_, b), _| *b != book_id);
        Ok(())
    }

    async fn get_page(&self, book_id: Uuid, page_index: u32) -> PortResult<Page> {
        let state = self.state.read().await;
        state
            .pages
            .get(&book_id)
            .and_then(|pages| pages.get(&page_index))
            .cloned()
            .ok_or_else(|| {
                PortError::NotFound(format!("Page {} of book {} not found", page_index, book_id))
            })
    }

    async fn page_exists(&self, book_id: Uuid, page_index: u32) -> PortResult<bool> {
        let state = self.state.read().await;
        Ok(state
            .pages
            .get(&book_id)
            .is_some_and(|pages| pages.contains_key(&page_index)))
    }

    async fn next_page_index(&self, book_id: Uuid, after: u32) -> PortResult<Option<u32>> {
        let Some(start) = after.checked_add(1) else {
            return Ok(None);
        };
        let state = self.state.read().await;
        Ok(state
            .pages
            .get(&book_id)
            .and_then(|pages| pages.range(start..).next().map(|(i, _)| *i)))
    }

    async fn previous_page_index(&self, book_id: Uuid, before: u32) -> PortResult<Option<u32>> {
        let state = self.state.read().await;
        Ok(state
            .pages
            .get(&book_id)
            .and_then(|pages| pages.range(..before).next_back().map(|(i, _)| *i)))
    }

    async fn get_progress(&self, user_id: Uuid, book_id: Uuid) -> PortResult<Option<Progress>> {
        Ok(self
            .state
            .read()
            .await
            .progress
            .get(&(user_id, book_id))
            .cloned())
    }

    async fn upsert_progress(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        last_finished_page_index: u32,
    ) -> PortResult<()> {
        let mut state = self.state.write().await;
        if !state.books.contains_key(&book_id) {
            return Err(book_not_found(book_id));
        }
        state.progress.insert(
            (user_id, book_id),
            Progress {
                user_id,
                book_id,
                last_finished_page_index,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn init_progress(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        last_finished_page_index: u32,
    ) -> PortResult<Progress> {
        let mut state = self.state.write().await;
        if !state.books.contains_key(&book_id) {
            return Err(book_not_found(book_id));
        }
        Ok(state
            .progress
            .entry((user_id, book_id))
            .or_insert_with(|| Progress {
                user_id,
                book_id,
                last_finished_page_index,
                updated_at: Utc::now(),
            })
            .clone())
    }
}

//=========================================================================================
// `UserStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserStore for InMemoryAdapter {
    async fn create_user_with_email(&self, email: &str, hashed_password: &str) -> PortResult<User> {
        let mut state = self.state.write().await;
        if state.users_by_email.contains_key(email) {
            return Err(PortError::Conflict(format!(
                "Email {} is already registered",
                email
            )));
        }

        let user_id = Uuid::new_v4();
        state.users.insert(
            user_id,
            UserCredentials {
                user_id,
                email: email.to_string(),
                hashed_password: hashed_password.to_string(),
            },
        );
        state.users_by_email.insert(email.to_string(), user_id);
        Ok(User {
            user_id,
            email: email.to_string(),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let state = self.state.read().await;
        state
            .users_by_email
            .get(email)
            .and_then(|id| state.users.get(id))
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let state = self.state.read().await;
        state
            .users
            .get(&user_id)
            .map(|creds| User {
                user_id: creds.user_id,
                email: creds.email.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user_id) {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        state.auth_sessions.insert(
            session_id.to_string(),
            AuthSession {
                id: session_id.to_string(),
                user_id,
                expires_at,
            },
        );
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let state = self.state.read().await;
        state
            .auth_sessions
            .get(session_id)
            .filter(|session| session.expires_at > Utc::now())
            .map(|session| session.user_id)
            .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.state.write().await.auth_sessions.remove(session_id);
        Ok(())
    }
}
