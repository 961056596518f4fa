use super::{
    AuthorTerm, BookEntity, BookId, BookQuery, Body, EntityStore, NewBook, StoreError,
    StoreResult, TermId, BOOK_BUNDLE,
};
use crate::models::PublishYear;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS taxonomy_terms (
        id INTEGER PRIMARY KEY,
        vocabulary TEXT NOT NULL,
        name TEXT NOT NULL,
        UNIQUE (vocabulary, name)
    );

    CREATE TABLE IF NOT EXISTS books (
        id INTEGER PRIMARY KEY,
        bundle TEXT NOT NULL,
        title TEXT NOT NULL,
        first_publish_year TEXT,
        body_value TEXT NOT NULL,
        body_format TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_books_bundle_title ON books (bundle, title);

    CREATE TABLE IF NOT EXISTS book_authors (
        book_id INTEGER NOT NULL REFERENCES books (id) ON DELETE CASCADE,
        term_id INTEGER NOT NULL REFERENCES taxonomy_terms (id),
        delta INTEGER NOT NULL,
        PRIMARY KEY (book_id, delta)
    );
";

/// SQLite-backed store. `UNIQUE (vocabulary, name)` makes term creation safe
/// across processes sharing the same database file.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    fn author_refs(&self, book_id: BookId) -> StoreResult<Vec<TermId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT term_id FROM book_authors WHERE book_id = ?1 ORDER BY delta")?;
        let refs = stmt
            .query_map([book_id], |row| row.get(0))?
            .collect::<Result<Vec<TermId>, _>>()?;
        Ok(refs)
    }

    fn book_from_row(&self, row: BookRow) -> StoreResult<BookEntity> {
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|e| StoreError::Corrupt(format!("created_at '{}': {}", row.created_at, e)))?
            .with_timezone(&Utc);

        Ok(BookEntity {
            id: row.id,
            bundle: row.bundle,
            title: row.title,
            author_refs: self.author_refs(row.id)?,
            first_publish_year: PublishYear::from_stored(row.first_publish_year),
            body: Body {
                value: row.body_value,
                format: row.body_format,
            },
            created_at,
        })
    }
}

struct BookRow {
    id: BookId,
    bundle: String,
    title: String,
    first_publish_year: Option<String>,
    body_value: String,
    body_format: String,
    created_at: String,
}

impl BookRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            bundle: row.get(1)?,
            title: row.get(2)?,
            first_publish_year: row.get(3)?,
            body_value: row.get(4)?,
            body_format: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

fn term_from_row(row: &Row<'_>) -> rusqlite::Result<AuthorTerm> {
    Ok(AuthorTerm {
        id: row.get(0)?,
        name: row.get(1)?,
        vocabulary: row.get(2)?,
    })
}

impl EntityStore for SqliteStore {
    fn find_term(&self, vocabulary: &str, name: &str) -> StoreResult<Option<AuthorTerm>> {
        let term = self
            .conn
            .query_row(
                "SELECT id, name, vocabulary FROM taxonomy_terms WHERE vocabulary = ?1 AND name = ?2",
                params![vocabulary, name],
                term_from_row,
            )
            .optional()?;
        Ok(term)
    }

    fn find_or_create_term(&mut self, vocabulary: &str, name: &str) -> StoreResult<AuthorTerm> {
        let inserted = self.conn.execute(
            "INSERT INTO taxonomy_terms (vocabulary, name) VALUES (?1, ?2)
             ON CONFLICT (vocabulary, name) DO NOTHING",
            params![vocabulary, name],
        )?;

        let term = self.conn.query_row(
            "SELECT id, name, vocabulary FROM taxonomy_terms WHERE vocabulary = ?1 AND name = ?2",
            params![vocabulary, name],
            term_from_row,
        )?;

        if inserted > 0 {
            tracing::debug!(target: "store", "Created term {} '{}' in {}", term.id, name, vocabulary);
        }
        Ok(term)
    }

    fn load_term(&self, id: TermId) -> StoreResult<Option<AuthorTerm>> {
        let term = self
            .conn
            .query_row(
                "SELECT id, name, vocabulary FROM taxonomy_terms WHERE id = ?1",
                [id],
                term_from_row,
            )
            .optional()?;
        Ok(term)
    }

    fn find_books(&self, query: &BookQuery) -> StoreResult<Vec<BookId>> {
        let ids = match query.author_ref {
            Some(term_id) => {
                let mut stmt = self.conn.prepare(
                    "SELECT b.id FROM books b
                     WHERE b.bundle = ?1 AND b.title = ?2
                       AND EXISTS (SELECT 1 FROM book_authors ba
                                   WHERE ba.book_id = b.id AND ba.term_id = ?3)
                     ORDER BY b.id",
                )?;
                let rows = stmt.query_map(params![BOOK_BUNDLE, query.title, term_id], |row| {
                    row.get(0)
                })?;
                rows.collect::<Result<Vec<BookId>, _>>()?
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare("SELECT id FROM books WHERE bundle = ?1 AND title = ?2 ORDER BY id")?;
                let rows = stmt.query_map(params![BOOK_BUNDLE, query.title], |row| row.get(0))?;
                rows.collect::<Result<Vec<BookId>, _>>()?
            }
        };
        Ok(ids)
    }

    fn create_book(&mut self, book: NewBook) -> StoreResult<BookEntity> {
        let created_at = Utc::now();
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO books (bundle, title, first_publish_year, body_value, body_format, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                BOOK_BUNDLE,
                book.title,
                book.first_publish_year.as_stored(),
                book.body.value,
                book.body.format,
                created_at.to_rfc3339(),
            ],
        )?;
        let id = tx.last_insert_rowid();

        for (delta, term_id) in book.author_refs.iter().enumerate() {
            let known: bool = tx.query_row(
                "SELECT EXISTS (SELECT 1 FROM taxonomy_terms WHERE id = ?1)",
                [term_id],
                |row| row.get(0),
            )?;
            if !known {
                // Dropping the transaction rolls the book insert back.
                return Err(StoreError::UnknownTerm(*term_id));
            }
            tx.execute(
                "INSERT INTO book_authors (book_id, term_id, delta) VALUES (?1, ?2, ?3)",
                params![id, term_id, delta as i64],
            )?;
        }

        tx.commit()?;
        tracing::debug!(target: "store", "Created book {} '{}'", id, book.title);

        Ok(BookEntity {
            id,
            bundle: BOOK_BUNDLE.to_string(),
            title: book.title,
            author_refs: book.author_refs,
            first_publish_year: book.first_publish_year,
            body: book.body,
            created_at,
        })
    }

    fn list_books(&self) -> StoreResult<Vec<BookEntity>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, bundle, title, first_publish_year, body_value, body_format, created_at
             FROM books ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], BookRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(|row| self.book_from_row(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AUTHORS_VOCABULARY;

    #[test]
    fn test_schema_is_reentrant() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.conn.execute_batch(SCHEMA).unwrap();
    }

    #[test]
    fn test_unique_term_per_vocabulary() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let first = store.find_or_create_term(AUTHORS_VOCABULARY, "Frank Herbert").unwrap();
        let again = store.find_or_create_term(AUTHORS_VOCABULARY, "Frank Herbert").unwrap();
        assert_eq!(first.id, again.id);

        let duplicate = store.conn.execute(
            "INSERT INTO taxonomy_terms (vocabulary, name) VALUES (?1, ?2)",
            params![AUTHORS_VOCABULARY, "Frank Herbert"],
        );
        assert!(duplicate.is_err());
    }

    #[test]
    fn test_create_book_round_trips_fields() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let term = store.find_or_create_term(AUTHORS_VOCABULARY, "Frank Herbert").unwrap();
        let created = store
            .create_book(NewBook {
                title: "Dune".to_string(),
                author_refs: vec![term.id],
                first_publish_year: PublishYear::Year(1965),
                body: Body::plain_text("Spice."),
            })
            .unwrap();

        let books = store.list_books().unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].id, created.id);
        assert_eq!(books[0].bundle, BOOK_BUNDLE);
        assert_eq!(books[0].author_refs, vec![term.id]);
        assert_eq!(books[0].first_publish_year, PublishYear::Year(1965));
        assert_eq!(books[0].body, Body::plain_text("Spice."));
    }

    #[test]
    fn test_unknown_term_rolls_back_book() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .create_book(NewBook {
                title: "Orphan".to_string(),
                author_refs: vec![99],
                first_publish_year: PublishYear::Unknown,
                body: Body::plain_text(""),
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownTerm(99)));
        assert!(store.list_books().unwrap().is_empty());
    }
}
