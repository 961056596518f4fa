use super::{
    AuthorTerm, BookEntity, BookId, BookQuery, EntityStore, NewBook, StoreError, StoreResult,
    TermId, BOOK_BUNDLE,
};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};

/// In-process store. Find-or-create runs under a single `&mut` borrow so it cannot race.
#[derive(Debug, Default)]
pub struct MemoryStore {
    terms: BTreeMap<TermId, AuthorTerm>,
    term_index: HashMap<(String, String), TermId>,
    books: BTreeMap<BookId, BookEntity>,
    next_term_id: TermId,
    next_book_id: BookId,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn book_count(&self) -> usize {
        self.books.len()
    }
}

impl EntityStore for MemoryStore {
    fn find_term(&self, vocabulary: &str, name: &str) -> StoreResult<Option<AuthorTerm>> {
        let key = (vocabulary.to_string(), name.to_string());
        Ok(self
            .term_index
            .get(&key)
            .and_then(|id| self.terms.get(id))
            .cloned())
    }

    fn find_or_create_term(&mut self, vocabulary: &str, name: &str) -> StoreResult<AuthorTerm> {
        let key = (vocabulary.to_string(), name.to_string());
        if let Some(term) = self.term_index.get(&key).and_then(|id| self.terms.get(id)) {
            return Ok(term.clone());
        }

        self.next_term_id += 1;
        let term = AuthorTerm {
            id: self.next_term_id,
            name: name.to_string(),
            vocabulary: vocabulary.to_string(),
        };
        self.term_index.insert(key, term.id);
        self.terms.insert(term.id, term.clone());
        tracing::debug!(target: "store", "Created term {} '{}' in {}", term.id, name, vocabulary);
        Ok(term)
    }

    fn load_term(&self, id: TermId) -> StoreResult<Option<AuthorTerm>> {
        Ok(self.terms.get(&id).cloned())
    }

    fn find_books(&self, query: &BookQuery) -> StoreResult<Vec<BookId>> {
        Ok(self
            .books
            .values()
            .filter(|book| book.bundle == BOOK_BUNDLE && book.title == query.title)
            .filter(|book| match query.author_ref {
                Some(term_id) => book.author_refs.contains(&term_id),
                None => true,
            })
            .map(|book| book.id)
            .collect())
    }

    fn create_book(&mut self, book: NewBook) -> StoreResult<BookEntity> {
        if let Some(missing) = book
            .author_refs
            .iter()
            .find(|id| !self.terms.contains_key(*id))
        {
            return Err(StoreError::UnknownTerm(*missing));
        }

        self.next_book_id += 1;
        let entity = BookEntity {
            id: self.next_book_id,
            bundle: BOOK_BUNDLE.to_string(),
            title: book.title,
            author_refs: book.author_refs,
            first_publish_year: book.first_publish_year,
            body: book.body,
            created_at: Utc::now(),
        };
        self.books.insert(entity.id, entity.clone());
        tracing::debug!(target: "store", "Created book {} '{}'", entity.id, entity.title);
        Ok(entity)
    }

    fn list_books(&self) -> StoreResult<Vec<BookEntity>> {
        Ok(self.books.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PublishYear;
    use crate::store::{Body, AUTHORS_VOCABULARY};

    fn new_book(title: &str, author_refs: Vec<TermId>) -> NewBook {
        NewBook {
            title: title.to_string(),
            author_refs,
            first_publish_year: PublishYear::Unknown,
            body: Body::plain_text(""),
        }
    }

    #[test]
    fn test_find_or_create_term_is_idempotent() {
        let mut store = MemoryStore::new();
        let first = store.find_or_create_term(AUTHORS_VOCABULARY, "Octavia E. Butler").unwrap();
        let second = store.find_or_create_term(AUTHORS_VOCABULARY, "Octavia E. Butler").unwrap();
        assert_eq!(first, second);
        assert_eq!(store.term_count(), 1);
    }

    #[test]
    fn test_terms_are_scoped_by_vocabulary() {
        let mut store = MemoryStore::new();
        let author = store.find_or_create_term(AUTHORS_VOCABULARY, "Dune").unwrap();
        let tag = store.find_or_create_term("tags", "Dune").unwrap();
        assert_ne!(author.id, tag.id);
        assert!(store.find_term("genres", "Dune").unwrap().is_none());
    }

    #[test]
    fn test_find_books_by_title_and_author() {
        let mut store = MemoryStore::new();
        let herbert = store.find_or_create_term(AUTHORS_VOCABULARY, "Frank Herbert").unwrap();
        let other = store.find_or_create_term(AUTHORS_VOCABULARY, "Someone Else").unwrap();
        let book = store.create_book(new_book("Dune", vec![herbert.id])).unwrap();

        let by_title = BookQuery { title: "Dune".to_string(), author_ref: None };
        assert_eq!(store.find_books(&by_title).unwrap(), vec![book.id]);

        let by_other = BookQuery { title: "Dune".to_string(), author_ref: Some(other.id) };
        assert!(store.find_books(&by_other).unwrap().is_empty());

        let wrong_title = BookQuery { title: "dune".to_string(), author_ref: Some(herbert.id) };
        assert!(store.find_books(&wrong_title).unwrap().is_empty());
    }

    #[test]
    fn test_create_book_rejects_unknown_term() {
        let mut store = MemoryStore::new();
        let err = store.create_book(new_book("Dune", vec![42])).unwrap_err();
        assert!(matches!(err, StoreError::UnknownTerm(42)));
        assert_eq!(store.book_count(), 0);
    }
}
