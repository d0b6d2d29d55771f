//! In-memory `LibraryStore` used by the unit tests of this crate.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::{Book, NewBook, NewPage, Page, Progress};
use crate::ports::{LibraryStore, PortError, PortResult};

#[derive(Default)]
struct FakeState {
    books: HashMap<Uuid, Book>,
    pages: HashMap<Uuid, BTreeMap<u32, Page>>,
    progress: HashMap<(Uuid, Uuid), Progress>,
    /// Page index committed as "finished" right after the next progress read
    /// that finds no record.
    finish_after_missed_read: Option<u32>,
}

fn progress_record(user_id: Uuid, book_id: Uuid, last_finished_page_index: u32) -> Progress {
    Progress {
        user_id,
        book_id,
        last_finished_page_index,
        updated_at: Utc::now(),
    }
}

#[derive(Default)]
pub(crate) struct FakeLibrary {
    state: Mutex<FakeState>,
    fail_writes: AtomicBool,
}

impl FakeLibrary {
    /// A store holding one book with pages `1..=page_count`.
    pub(crate) fn with_book(page_count: u32) -> (Arc<Self>, Uuid) {
        let indices: Vec<u32> = (1..=page_count).collect();
        Self::with_page_indices(&indices)
    }

    /// A store holding one book with exactly the given page indices.
    pub(crate) fn with_page_indices(indices: &[u32]) -> (Arc<Self>, Uuid) {
        let store = Arc::new(Self::default());
        let book_id = Uuid::new_v4();
        {
            let mut state = store.state.lock().unwrap();
            state.books.insert(
                book_id,
                Book {
                    id: book_id,
                    user_id: Uuid::new_v4(),
                    title: "Fixture".to_string(),
                    author: None,
                    source_url: None,
                    page_count: indices.len() as u32,
                    uploaded_at: Utc::now(),
                },
            );
            let pages = indices
                .iter()
                .map(|&page_index| {
                    let page = Page {
                        book_id,
                        page_index,
                        text: format!("Page {page_index}."),
                        audio_url: None,
                    };
                    (page_index, page)
                })
                .collect();
            state.pages.insert(book_id, pages);
        }
        (store, book_id)
    }

    pub(crate) fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Simulates another request finishing `page_index` between a reader's
    /// progress lookup and its first write.
    pub(crate) fn finish_page_after_missed_read(&self, page_index: u32) {
        self.state.lock().unwrap().finish_after_missed_read = Some(page_index);
    }

    pub(crate) fn last_finished(&self, user_id: Uuid, book_id: Uuid) -> Option<u32> {
        self.state
            .lock()
            .unwrap()
            .progress
            .get(&(user_id, book_id))
            .map(|p| p.last_finished_page_index)
    }

    fn check_writable(&self) -> PortResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("write rejected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LibraryStore for FakeLibrary {
    async fn create_book(&self, book: NewBook, pages: Vec<NewPage>) -> PortResult<Book> {
        self.check_writable()?;
        let id = Uuid::new_v4();
        let stored = Book {
            id,
            user_id: book.user_id,
            title: book.title,
            author: book.author,
            source_url: book.source_url,
            page_count: pages.len() as u32,
            uploaded_at: Utc::now(),
        };
        let pages = pages
            .into_iter()
            .map(|p| {
                let page = Page {
                    book_id: id,
                    page_index: p.page_index,
                    text: p.text,
                    audio_url: None,
                };
                (p.page_index, page)
            })
            .collect();

        let mut state = self.state.lock().unwrap();
        state.books.insert(id, stored.clone());
        state.pages.insert(id, pages);
        Ok(stored)
    }

    async fn get_book(&self, book_id: Uuid) -> PortResult<Book> {
        self.state
            .lock()
            .unwrap()
            .books
            .get(&book_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Book {} not found", book_id)))
    }

    async fn list_books_by_user(&self, user_id: Uuid) -> PortResult<Vec<Book>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .books
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_book(&self, book_id: Uuid) -> PortResult<()> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        state.books.remove(&book_id);
        state.pages.remove(&book_id);
        state.progress.retain(|(_, b), _| *b != book_id);
        Ok(())
    }

    async fn get_page(&self, book_id: Uuid, page_index: u32) -> PortResult<Page> {
        let state = self.state.lock().unwrap();
        state
            .pages
            .get(&book_id)
            .and_then(|pages| pages.get(&page_index))
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Page {} not found", page_index)))
    }

    async fn page_exists(&self, book_id: Uuid, page_index: u32) -> PortResult<bool> {
        let state = self.state.lock().unwrap();
        Ok(state
            .pages
            .get(&book_id)
            .is_some_and(|pages| pages.contains_key(&page_index)))
    }

    async fn next_page_index(&self, book_id: Uuid, after: u32) -> PortResult<Option<u32>> {
        let state = self.state.lock().unwrap();
        Ok(state.pages.get(&book_id).and_then(|pages| {
            pages
                .range(after.saturating_add(1)..)
                .next()
                .map(|(i, _)| *i)
                .filter(|&i| i > after)
        }))
    }

    async fn previous_page_index(&self, book_id: Uuid, before: u32) -> PortResult<Option<u32>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .pages
            .get(&book_id)
            .and_then(|pages| pages.range(..before).next_back().map(|(i, _)| *i)))
    }

    async fn get_progress(&self, user_id: Uuid, book_id: Uuid) -> PortResult<Option<Progress>> {
        let mut state = self.state.lock().unwrap();
        let found = state.progress.get(&(user_id, book_id)).cloned();
        if found.is_none() {
            if let Some(page_index) = state.finish_after_missed_read.take() {
                state.progress.insert(
                    (user_id, book_id),
                    progress_record(user_id, book_id, page_index),
                );
            }
        }
        Ok(found)
    }

    async fn upsert_progress(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        last_finished_page_index: u32,
    ) -> PortResult<()> {
        self.check_writable()?;
        self.state.lock().unwrap().progress.insert(
            (user_id, book_id),
            progress_record(user_id, book_id, last_finished_page_index),
        );
        Ok(())
    }

    async fn init_progress(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        last_finished_page_index: u32,
    ) -> PortResult<Progress> {
        self.check_writable()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .progress
            .entry((user_id, book_id))
            .or_insert_with(|| progress_record(user_id, book_id, last_finished_page_index))
            .clone())
    }
}
