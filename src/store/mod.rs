//! Entity storage
//!
//! Books are content items of the `book` bundle; authors are taxonomy
//! terms in the `authors` vocabulary. Both backends keep at most one
//! term per (vocabulary, name).

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::models::PublishYear;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub type TermId = i64;
pub type BookId = i64;

pub const AUTHORS_VOCABULARY: &str = "authors";
pub const BOOK_BUNDLE: &str = "book";
pub const PLAIN_TEXT_FORMAT: &str = "plain_text";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorTerm {
    pub id: TermId,
    pub name: String,
    pub vocabulary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Body {
    pub value: String,
    pub format: String,
}

impl Body {
    pub fn plain_text(value: &str) -> Self {
        Self {
            value: value.to_string(),
            format: PLAIN_TEXT_FORMAT.to_string(),
        }
    }
}

/// A book about to be created
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewBook {
    pub title: String,
    pub author_refs: Vec<TermId>,
    pub first_publish_year: PublishYear,
    pub body: Body,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookEntity {
    pub id: BookId,
    pub bundle: String,
    pub title: String,
    pub author_refs: Vec<TermId>,
    pub first_publish_year: PublishYear,
    pub body: Body,
    pub created_at: DateTime<Utc>,
}

/// Dedup lookup: exact title, optionally narrowed to books referencing one author term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookQuery {
    pub title: String,
    pub author_ref: Option<TermId>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Unknown taxonomy term {0}")]
    UnknownTerm(TermId),

    #[error("Invalid stored value: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub trait EntityStore {
    fn find_term(&self, vocabulary: &str, name: &str) -> StoreResult<Option<AuthorTerm>>;

    /// Return the existing term for (vocabulary, name) or create it, as one atomic step.
    fn find_or_create_term(&mut self, vocabulary: &str, name: &str) -> StoreResult<AuthorTerm>;

    fn load_term(&self, id: TermId) -> StoreResult<Option<AuthorTerm>>;

    /// Ids of `book` entities matching the query, oldest first
    fn find_books(&self, query: &BookQuery) -> StoreResult<Vec<BookId>>;

    fn create_book(&mut self, book: NewBook) -> StoreResult<BookEntity>;

    fn list_books(&self) -> StoreResult<Vec<BookEntity>>;
}
