use crate::api_client::{HttpFetcher, QueryClient};
use crate::messenger::MessageSink;
use crate::models::BookRecord;
use crate::store::{
    BookEntity, BookQuery, Body, EntityStore, NewBook, TermId, AUTHORS_VOCABULARY,
};
use anyhow::Result;

pub const MAX_TITLE_LENGTH: usize = 255;
pub const TITLE_ELLIPSIS: &str = "...";
pub const NO_BOOKS_FOUND: &str = "No books found for the given search criteria.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Number of book entities created
    Created(usize),
    /// A book with the searched title (and author term, when known) already exists
    Duplicate,
    NoResults,
    /// The fetch failed; holds the message shown to the user
    Failed(String),
}

impl SyncOutcome {
    pub fn created(&self) -> bool {
        matches!(self, SyncOutcome::Created(_))
    }
}

/// Fetches books and writes the missing ones, with their author terms, into the store.
pub struct SyncEngine<F, S, M> {
    client: QueryClient<F>,
    store: S,
    messenger: M,
}

impl<F, S, M> SyncEngine<F, S, M>
where
    F: HttpFetcher,
    S: EntityStore,
    M: MessageSink,
{
    pub fn new(client: QueryClient<F>, store: S, messenger: M) -> Self {
        Self {
            client,
            store,
            messenger,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn client(&self) -> &QueryClient<F> {
        &self.client
    }

    /// Fetch, then create every returned book unless the search already produced one.
    ///
    /// Fetch failures and empty results become warnings on the message sink;
    /// only store failures are returned as errors.
    pub fn sync(&mut self, title: &str, author: &str) -> Result<SyncOutcome> {
        let books = match self.client.fetch(title, author) {
            Ok(books) => books,
            Err(e) => {
                let message = e.to_string();
                self.messenger.warning(&message);
                return Ok(SyncOutcome::Failed(message));
            }
        };

        if books.is_empty() {
            tracing::info!(target: "sync", "Nothing to sync for title='{}' author='{}'", title, author);
            self.messenger.warning(NO_BOOKS_FOUND);
            return Ok(SyncOutcome::NoResults);
        }

        if self.exists_already(title, author)? {
            tracing::info!(target: "sync", "'{}' by '{}' already synced, skipping", title, author);
            return Ok(SyncOutcome::Duplicate);
        }

        for record in &books {
            self.create_book(record)?;
        }

        tracing::info!(target: "sync", "Created {} book(s) for title='{}' author='{}'", books.len(), title, author);
        Ok(SyncOutcome::Created(books.len()))
    }

    /// Dedup check keyed on the searched title and, if its term exists, the searched author.
    ///
    /// A stored book whose title differs from the search text (API wording,
    /// truncation) is not considered a match.
    pub fn exists_already(&self, title: &str, author: &str) -> Result<bool> {
        let query = BookQuery {
            title: title.to_string(),
            author_ref: self.author_term_id(author)?,
        };
        Ok(!self.store.find_books(&query)?.is_empty())
    }

    pub fn author_term_id(&self, author: &str) -> Result<Option<TermId>> {
        if author.is_empty() {
            return Ok(None);
        }
        let term = self.store.find_term(AUTHORS_VOCABULARY, author)?;
        Ok(term.map(|term| term.id))
    }

    pub fn get_or_create_author_term(&mut self, name: &str) -> Result<TermId> {
        let term = self.store.find_or_create_term(AUTHORS_VOCABULARY, name)?;
        Ok(term.id)
    }

    fn create_book(&mut self, record: &BookRecord) -> Result<BookEntity> {
        let mut author_refs = Vec::new();
        for name in record.author.names() {
            let term_id = self.get_or_create_author_term(name)?;
            if !author_refs.contains(&term_id) {
                author_refs.push(term_id);
            }
        }

        let book = NewBook {
            title: truncate_title(&record.title),
            author_refs,
            first_publish_year: record.first_publish_year.clone(),
            body: Body::plain_text(&record.description),
        };
        Ok(self.store.create_book(book)?)
    }
}

/// Cap a title at 255 characters, the last three being the ellipsis.
pub fn truncate_title(title: &str) -> String {
    if title.chars().count() <= MAX_TITLE_LENGTH {
        return title.to_string();
    }

    let keep = MAX_TITLE_LENGTH - TITLE_ELLIPSIS.chars().count();
    let mut truncated: String = title.chars().take(keep).collect();
    truncated.push_str(TITLE_ELLIPSIS);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_title_untouched() {
        assert_eq!(truncate_title("Dune"), "Dune");
        let exact = "a".repeat(MAX_TITLE_LENGTH);
        assert_eq!(truncate_title(&exact), exact);
    }

    #[test]
    fn test_long_title_truncated_to_limit() {
        let long = "x".repeat(300);
        let truncated = truncate_title(&long);
        assert_eq!(truncated.chars().count(), MAX_TITLE_LENGTH);
        assert!(truncated.ends_with(TITLE_ELLIPSIS));
        assert!(truncated.starts_with(&"x".repeat(252)));
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        let long = "é".repeat(256);
        let truncated = truncate_title(&long);
        assert_eq!(truncated.chars().count(), MAX_TITLE_LENGTH);
        assert_eq!(truncated.chars().filter(|c| *c == 'é').count(), 252);
    }

    #[test]
    fn test_outcome_created_flag() {
        assert!(SyncOutcome::Created(2).created());
        assert!(!SyncOutcome::Duplicate.created());
        assert!(!SyncOutcome::NoResults.created());
        assert!(!SyncOutcome::Failed("boom".to_string()).created());
    }
}
