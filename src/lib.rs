//! Search the Open Library catalogue and sync the results into a book store.
//!
//! [`api_client::QueryClient`] turns a title/author search into normalized
//! [`models::BookRecord`]s; [`sync_engine::SyncEngine`] deduplicates them
//! against an [`store::EntityStore`] and creates books plus author terms.

pub mod api_client;
pub mod config;
pub mod messenger;
pub mod models;
pub mod store;
pub mod sync_engine;
pub mod utils;

pub use api_client::{FetchError, FetchOutcome, HttpFetcher, HttpResponse, QueryClient, ReqwestFetcher};
pub use messenger::{CollectingSink, MessageLevel, MessageSink, TracingSink};
pub use models::{AuthorField, BookRecord, PublishYear, SearchQuery};
pub use store::{EntityStore, MemoryStore, SqliteStore};
pub use sync_engine::{SyncEngine, SyncOutcome};
