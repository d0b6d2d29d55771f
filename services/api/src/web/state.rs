//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::InMemoryAdapter;
use crate::config::Config;
use crate::error::ApiError;
use std::sync::Arc;
use uuid::Uuid;
use voicebook_core::{Book, LibraryStore, ProgressTracker, TextToSpeechService, UserStore};

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub library: Arc<dyn LibraryStore>,
    pub users: Arc<dyn UserStore>,
    /// `None` when no speech provider is configured.
    pub tts: Option<Arc<dyn TextToSpeechService>>,
    pub tracker: ProgressTracker,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        library: Arc<dyn LibraryStore>,
        users: Arc<dyn UserStore>,
        tts: Option<Arc<dyn TextToSpeechService>>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            tracker: ProgressTracker::new(library.clone()),
            library,
            users,
            tts,
            config,
        }
    }

    /// State backed entirely by the in-memory store.
    pub fn in_memory(config: Config, tts: Option<Arc<dyn TextToSpeechService>>) -> Self {
        let store = Arc::new(InMemoryAdapter::new());
        Self::new(store.clone(), store, tts, Arc::new(config))
    }

    /// Loads a book, hiding books owned by someone else behind a 404.
    pub async fn owned_book(&self, user_id: Uuid, book_id: Uuid) -> Result<Book, ApiError> {
        let book = self.library.get_book(book_id).await?;
        if book.user_id != user_id {
            return Err(ApiError::NotFound(format!("Book {} not found", book_id)));
        }
        Ok(book)
    }
}
