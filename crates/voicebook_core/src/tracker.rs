//! crates/voicebook_core/src/tracker.rs
//!
//! Tracks, per (user, book), the last page the user finished and derives the
//! page they should read now.
//!
//! The only transitions are driven by [`ProgressTracker::mark_page_finished`].
//! [`ProgressTracker::get_current_page`] writes exactly once: on the first view
//! of a book it records "about to start the first page". Once the final page
//! has been finished the reader stays parked on it.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::domain::CurrentPage;
use crate::ports::{LibraryStore, PortError};

/// Errors surfaced by the reading-progress operations.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Book {0} has no pages")]
    EmptyDocument(Uuid),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] PortError),
}

pub type ReaderResult<T> = Result<T, ReaderError>;

/// Computes and records reading positions on top of a [`LibraryStore`].
#[derive(Clone)]
pub struct ProgressTracker {
    store: Arc<dyn LibraryStore>,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn LibraryStore>) -> Self {
        Self { store }
    }

    /// Returns the page the user should read next in `book_id`, along with its
    /// nearest existing neighbours.
    pub async fn get_current_page(&self, user_id: Uuid, book_id: Uuid) -> ReaderResult<CurrentPage> {
        let page_index = match self.store.get_progress(user_id, book_id).await? {
            None => self.start_reading(user_id, book_id).await?,
            Some(progress) => {
                self.resume_after(book_id, progress.last_finished_page_index)
                    .await?
            }
        };

        let (previous_page_index, next_page_index) = futures::try_join!(
            self.store.previous_page_index(book_id, page_index),
            self.store.next_page_index(book_id, page_index),
        )?;

        Ok(CurrentPage {
            book_id,
            page_index,
            previous_page_index,
            next_page_index,
        })
    }

    /// Records `page_index` as the last page `user_id` finished in `book_id`.
    ///
    /// Any existing page is accepted, including ones before or far after the
    /// previous position.
    pub async fn mark_page_finished(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        page_index: u32,
    ) -> ReaderResult<()> {
        if !self.store.page_exists(book_id, page_index).await? {
            return Err(ReaderError::InvalidInput(format!(
                "page {} does not exist in book {}",
                page_index, book_id
            )));
        }

        self.store
            .upsert_progress(user_id, book_id, page_index)
            .await?;
        debug!(%user_id, %book_id, page_index, "Page marked finished.");
        Ok(())
    }

    /// First view of a book: persist the implicit "not started" record.
    ///
    /// A record committed by a concurrent `mark_page_finished` since the
    /// initial read wins over the "not started" one.
    async fn start_reading(&self, user_id: Uuid, book_id: Uuid) -> ReaderResult<u32> {
        let first = self
            .store
            .next_page_index(book_id, 0)
            .await?
            .ok_or(ReaderError::EmptyDocument(book_id))?;

        let progress = self.store.init_progress(user_id, book_id, first - 1).await?;
        debug!(
            %user_id,
            %book_id,
            last_finished = progress.last_finished_page_index,
            "Reading progress initialized."
        );
        self.resume_after(book_id, progress.last_finished_page_index)
            .await
    }

    async fn resume_after(&self, book_id: Uuid, last_finished: u32) -> ReaderResult<u32> {
        match self.store.next_page_index(book_id, last_finished).await? {
            Some(next) => Ok(next),
            // Parked on the final page.
            None if last_finished > 0 => Ok(last_finished),
            None => Err(ReaderError::EmptyDocument(book_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeLibrary;

    fn tracker_for(store: &Arc<FakeLibrary>) -> ProgressTracker {
        ProgressTracker::new(store.clone())
    }

    #[tokio::test]
    async fn test_first_view_starts_at_first_page_and_persists_progress() {
        let (store, book_id) = FakeLibrary::with_book(5);
        let tracker = tracker_for(&store);
        let user_id = Uuid::new_v4();

        let current = tracker.get_current_page(user_id, book_id).await.unwrap();

        assert_eq!(current.page_index, 1);
        assert_eq!(current.previous_page_index, None);
        assert_eq!(current.next_page_index, Some(2));
        assert_eq!(store.last_finished(user_id, book_id), Some(0));
    }

    #[tokio::test]
    async fn test_first_view_keeps_concurrently_finished_page() {
        let (store, book_id) = FakeLibrary::with_book(5);
        let tracker = tracker_for(&store);
        let user_id = Uuid::new_v4();

        // Another request finishes page 3 after the lookup found no record.
        store.finish_page_after_missed_read(3);
        let current = tracker.get_current_page(user_id, book_id).await.unwrap();

        assert_eq!(store.last_finished(user_id, book_id), Some(3));
        assert_eq!(current.page_index, 4);
        assert_eq!(current.previous_page_index, Some(3));
        assert_eq!(current.next_page_index, Some(5));
    }

    #[tokio::test]
    async fn test_resumes_after_last_finished_page() {
        let (store, book_id) = FakeLibrary::with_book(5);
        let tracker = tracker_for(&store);
        let user_id = Uuid::new_v4();

        tracker.mark_page_finished(user_id, book_id, 3).await.unwrap();
        let current = tracker.get_current_page(user_id, book_id).await.unwrap();

        assert_eq!(current.page_index, 4);
        assert_eq!(current.previous_page_index, Some(3));
        assert_eq!(current.next_page_index, Some(5));
    }

    #[tokio::test]
    async fn test_parks_on_final_page() {
        let (store, book_id) = FakeLibrary::with_book(5);
        let tracker = tracker_for(&store);
        let user_id = Uuid::new_v4();

        tracker.mark_page_finished(user_id, book_id, 5).await.unwrap();
        for _ in 0..3 {
            let current = tracker.get_current_page(user_id, book_id).await.unwrap();
            assert_eq!(current.page_index, 5);
            assert_eq!(current.previous_page_index, Some(4));
            assert_eq!(current.next_page_index, None);
        }
        assert_eq!(store.last_finished(user_id, book_id), Some(5));
    }

    #[tokio::test]
    async fn test_single_page_book() {
        let (store, book_id) = FakeLibrary::with_book(1);
        let tracker = tracker_for(&store);
        let user_id = Uuid::new_v4();

        let current = tracker.get_current_page(user_id, book_id).await.unwrap();
        assert_eq!(current.page_index, 1);
        assert_eq!(current.previous_page_index, None);
        assert_eq!(current.next_page_index, None);

        tracker.mark_page_finished(user_id, book_id, 1).await.unwrap();
        let current = tracker.get_current_page(user_id, book_id).await.unwrap();
        assert_eq!(current.page_index, 1);
    }

    #[tokio::test]
    async fn test_empty_book_is_reported_and_nothing_is_written() {
        let (store, book_id) = FakeLibrary::with_book(0);
        let tracker = tracker_for(&store);
        let user_id = Uuid::new_v4();

        let err = tracker.get_current_page(user_id, book_id).await.unwrap_err();
        assert!(matches!(err, ReaderError::EmptyDocument(id) if id == book_id));
        assert_eq!(store.last_finished(user_id, book_id), None);
    }

    #[tokio::test]
    async fn test_mark_finished_rejects_unknown_page() {
        let (store, book_id) = FakeLibrary::with_book(5);
        let tracker = tracker_for(&store);
        let user_id = Uuid::new_v4();

        for bad in [0, 6, 100] {
            let err = tracker
                .mark_page_finished(user_id, book_id, bad)
                .await
                .unwrap_err();
            assert!(matches!(err, ReaderError::InvalidInput(_)));
        }
        assert_eq!(store.last_finished(user_id, book_id), None);
    }

    #[tokio::test]
    async fn test_mark_finished_is_idempotent_and_allows_jumps() {
        let (store, book_id) = FakeLibrary::with_book(10);
        let tracker = tracker_for(&store);
        let user_id = Uuid::new_v4();

        tracker.mark_page_finished(user_id, book_id, 7).await.unwrap();
        tracker.mark_page_finished(user_id, book_id, 7).await.unwrap();
        assert_eq!(store.last_finished(user_id, book_id), Some(7));

        // Going back to reread is allowed.
        tracker.mark_page_finished(user_id, book_id, 2).await.unwrap();
        let current = tracker.get_current_page(user_id, book_id).await.unwrap();
        assert_eq!(current.page_index, 3);
    }

    #[tokio::test]
    async fn test_progress_is_scoped_per_user() {
        let (store, book_id) = FakeLibrary::with_book(5);
        let tracker = tracker_for(&store);
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        tracker.mark_page_finished(alice, book_id, 4).await.unwrap();

        let for_bob = tracker.get_current_page(bob, book_id).await.unwrap();
        assert_eq!(for_bob.page_index, 1);
        let for_alice = tracker.get_current_page(alice, book_id).await.unwrap();
        assert_eq!(for_alice.page_index, 5);
    }

    #[tokio::test]
    async fn test_neighbours_do_not_assume_contiguous_indices() {
        let (store, book_id) = FakeLibrary::with_page_indices(&[2, 5, 9]);
        let tracker = tracker_for(&store);
        let user_id = Uuid::new_v4();

        let current = tracker.get_current_page(user_id, book_id).await.unwrap();
        assert_eq!(current.page_index, 2);
        assert_eq!(store.last_finished(user_id, book_id), Some(1));
        assert_eq!(current.next_page_index, Some(5));

        tracker.mark_page_finished(user_id, book_id, 5).await.unwrap();
        let current = tracker.get_current_page(user_id, book_id).await.unwrap();
        assert_eq!(current.page_index, 9);
        assert_eq!(current.previous_page_index, Some(5));
        assert_eq!(current.next_page_index, None);
    }

    #[tokio::test]
    async fn test_persistence_failures_are_surfaced() {
        let (store, book_id) = FakeLibrary::with_book(3);
        store.fail_writes();
        let tracker = tracker_for(&store);

        let err = tracker
            .get_current_page(Uuid::new_v4(), book_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ReaderError::Persistence(PortError::Unexpected(_))));

        let err = tracker
            .mark_page_finished(Uuid::new_v4(), book_id, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ReaderError::Persistence(_)));
    }
}
