pub mod domain;
pub mod library;
pub mod paginator;
pub mod ports;
pub mod tracker;

#[cfg(test)]
mod testing;

pub use domain::{
    AuthSession, Book, CurrentPage, NewBook, NewPage, Page, Progress, User, UserCredentials,
};
pub use library::{ingest_book, number_pages};
pub use paginator::{paginate, DEFAULT_PAGE_BUDGET};
pub use ports::{LibraryStore, PortError, PortResult, TextToSpeechService, UserStore};
pub use tracker::{ProgressTracker, ReaderError, ReaderResult};
