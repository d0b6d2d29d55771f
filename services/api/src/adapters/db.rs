//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of the
//! `LibraryStore` and `UserStore` ports from the `core` crate. It handles all
//! interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use voicebook_core::domain::{Book, NewBook, NewPage, Page, Progress, User, UserCredentials};
use voicebook_core::ports::{LibraryStore, PortError, PortResult, UserStore};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the storage ports on Postgres.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn to_db_index(page_index: u32) -> PortResult<i32> {
    i32::try_from(page_index)
        .map_err(|_| PortError::Unexpected(format!("page index {} out of range", page_index)))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const BOOK_COLUMNS: &str = "b.id, b.user_id, b.title, b.author, b.source_url, \
     (SELECT COUNT(*) FROM book_pages p WHERE p.book_id = b.id) AS page_count, b.uploaded_at";

#[derive(FromRow)]
struct BookRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    author: Option<String>,
    source_url: Option<String>,
    page_count: i64,
    uploaded_at: DateTime<Utc>,
}
impl BookRecord {
    fn to_domain(self) -> Book {
        Book {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            author: self.author,
            source_url: self.source_url,
            page_count: self.page_count as u32,
            uploaded_at: self.uploaded_at,
        }
    }
}

#[derive(FromRow)]
struct PageRecord {
    book_id: Uuid,
    page_index: i32,
    text: String,
    audio_url: Option<String>,
}
impl PageRecord {
    fn to_domain(self) -> Page {
        Page {
            book_id: self.book_id,
            page_index: self.page_index as u32,
            text: self.text,
            audio_url: self.audio_url,
        }
    }
}

#[derive(FromRow)]
struct ProgressRecord {
    user_id: Uuid,
    book_id: Uuid,
    last_finished_page_index: i32,
    updated_at: DateTime<Utc>,
}
impl ProgressRecord {
    fn to_domain(self) -> Progress {
        Progress {
            user_id: self.user_id,
            book_id: self.book_id,
            last_finished_page_index: self.last_finished_page_index as u32,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            email: self.email,
        }
    }

    fn to_credentials(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

//=========================================================================================
// `LibraryStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl LibraryStore for DbAdapter {
    async fn create_book(&self, book: NewBook, pages: Vec<NewPage>) -> PortResult<Book> {
        let (indices, texts): (Vec<i32>, Vec<String>) = pages
            .into_iter()
            .map(|p| to_db_index(p.page_index).map(|i| (i, p.text)))
            .collect::<PortResult<Vec<_>>>()?
            .into_iter()
            .unzip();

        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let record = sqlx::query_as::<_, BookRecord>(
            "INSERT INTO books (id, user_id, title, author, source_url) VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, user_id, title, author, source_url, 0::BIGINT AS page_count, uploaded_at",
        )
        .bind(Uuid::new_v4())
        .bind(book.user_id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.source_url)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        if !indices.is_empty() {
            sqlx::query(
                "INSERT INTO book_pages (book_id, page_index, text) \
                 SELECT $1, p.page_index, p.text FROM UNNEST($2::INT4[], $3::TEXT[]) AS p(page_index, text)",
            )
            .bind(record.id)
            .bind(&indices)
            .bind(&texts)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)?;

        let mut book = record.to_domain();
        book.page_count = indices.len() as u32;
        Ok(book)
    }

    async fn get_book(&self, book_id: Uuid) -> PortResult<Book> {
        let record = sqlx::query_as::<_, BookRecord>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books b WHERE b.id = $1"
        ))
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Book {} not found", book_id)))?;
        Ok(record.to_domain())
    }

    async fn list_books_by_user(&self, user_id: Uuid) -> PortResult<Vec<Book>> {
        let records = sqlx::query_as::<_, BookRecord>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books b WHERE b.user_id = $1 ORDER BY b.uploaded_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn delete_book(&self, book_id: Uuid) -> PortResult<()> {
        // Pages and progress rows go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(book_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Book {} not found", book_id)));
        }
        Ok(())
    }

    async fn get_page(&self, book_id: Uuid, page_index: u32) -> PortResult<Page> {
        let record = sqlx::query_as::<_, PageRecord>(
            "SELECT book_id, page_index, text, audio_url FROM book_pages \
             WHERE book_id = $1 AND page_index = $2",
        )
        .bind(book_id)
        .bind(i64::from(page_index))
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| {
            PortError::NotFound(format!("Page {} of book {} not found", page_index, book_id))
        })?;
        Ok(record.to_domain())
    }

    async fn page_exists(&self, book_id: Uuid, page_index: u32) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM book_pages WHERE book_id = $1 AND page_index = $2)",
        )
        .bind(book_id)
        .bind(i64::from(page_index))
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn next_page_index(&self, book_id: Uuid, after: u32) -> PortResult<Option<u32>> {
        let next = sqlx::query_scalar::<_, i32>(
            "SELECT page_index FROM book_pages WHERE book_id = $1 AND page_index > $2 \
             ORDER BY page_index ASC LIMIT 1",
        )
        .bind(book_id)
        .bind(i64::from(after))
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(next.map(|i| i as u32))
    }

    async fn previous_page_index(&self, book_id: Uuid, before: u32) -> PortResult<Option<u32>> {
        let previous = sqlx::query_scalar::<_, i32>(
            "SELECT page_index FROM book_pages WHERE book_id = $1 AND page_index < $2 \
             ORDER BY page_index DESC LIMIT 1",
        )
        .bind(book_id)
        .bind(i64::from(before))
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(previous.map(|i| i as u32))
    }

    async fn get_progress(&self, user_id: Uuid, book_id: Uuid) -> PortResult<Option<Progress>> {
        let record = sqlx::query_as::<_, ProgressRecord>(
            "SELECT user_id, book_id, last_finished_page_index, updated_at FROM reading_progress \
             WHERE user_id = $1 AND book_id = $2",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn upsert_progress(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        last_finished_page_index: u32,
    ) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO reading_progress (user_id, book_id, last_finished_page_index) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, book_id) DO UPDATE SET \
                 last_finished_page_index = EXCLUDED.last_finished_page_index, \
                 updated_at = now()",
        )
        .bind(user_id)
        .bind(book_id)
        .bind(to_db_index(last_finished_page_index)?)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn init_progress(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        last_finished_page_index: u32,
    ) -> PortResult<Progress> {
        sqlx::query(
            "INSERT INTO reading_progress (user_id, book_id, last_finished_page_index) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, book_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(book_id)
        .bind(to_db_index(last_finished_page_index)?)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        // Separate statement: must see a row committed by a concurrent writer.
        self.get_progress(user_id, book_id).await?.ok_or_else(|| {
            PortError::NotFound(format!("No reading progress for book {}", book_id))
        })
    }
}

//=========================================================================================
// `UserStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserStore for DbAdapter {
    async fn create_user_with_email(&self, email: &str, hashed_password: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3) \
             RETURNING user_id, email, hashed_password",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PortError::Conflict(format!("Email {} is already registered", email))
            }
            other => unexpected(other),
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))?;
        Ok(record.to_credentials())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}
