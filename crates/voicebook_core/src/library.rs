//! crates/voicebook_core/src/library.rs
//!
//! Turns an uploaded document into a stored book with numbered pages.

use tracing::info;

use crate::domain::{Book, NewBook, NewPage};
use crate::paginator::paginate;
use crate::ports::{LibraryStore, PortResult};

/// Assigns 1-based indices to pages in document order.
pub fn number_pages(pages: Vec<String>) -> Vec<NewPage> {
    (1u32..)
        .zip(pages)
        .map(|(page_index, text)| NewPage { page_index, text })
        .collect()
}

/// Paginates `text` and stores the book and its pages as one atomic batch.
///
/// An empty document is still stored; it simply has no pages.
pub async fn ingest_book(
    store: &dyn LibraryStore,
    book: NewBook,
    text: &str,
    page_budget: usize,
) -> PortResult<Book> {
    let pages = number_pages(paginate(text, page_budget));
    let page_count = pages.len();

    let book = store.create_book(book, pages).await?;
    info!(book_id = %book.id, user_id = %book.user_id, page_count, "Book ingested.");
    Ok(book)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeLibrary;
    use uuid::Uuid;

    #[test]
    fn test_number_pages_is_dense_and_one_based() {
        let pages = number_pages(vec!["a".into(), "b".into(), "c".into()]);
        let indices: Vec<u32> = pages.iter().map(|p| p.page_index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(pages[2].text, "c");
    }

    #[test]
    fn test_number_pages_empty() {
        assert!(number_pages(Vec::new()).is_empty());
    }

    fn new_book() -> NewBook {
        NewBook {
            user_id: Uuid::new_v4(),
            title: "A Tale".to_string(),
            author: Some("Anon".to_string()),
            source_url: None,
        }
    }

    #[tokio::test]
    async fn test_ingest_book_stores_numbered_pages() {
        let store = FakeLibrary::default();

        let book = ingest_book(&store, new_book(), "Hello world. This is a test!", 15)
            .await
            .unwrap();

        assert_eq!(book.page_count, 2);
        assert_eq!(store.get_page(book.id, 1).await.unwrap().text, "Hello world.");
        assert_eq!(store.get_page(book.id, 2).await.unwrap().text, "This is a test!");
        assert!(!store.page_exists(book.id, 3).await.unwrap());
    }

    #[tokio::test]
    async fn test_ingest_empty_document_has_no_pages() {
        let store = FakeLibrary::default();

        let book = ingest_book(&store, new_book(), "  \n ", 250).await.unwrap();

        assert_eq!(book.page_count, 0);
        assert_eq!(store.next_page_index(book.id, 0).await.unwrap(), None);
    }
}
