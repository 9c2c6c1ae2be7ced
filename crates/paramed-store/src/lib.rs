//! SQLite-backed skill catalogue, step/question persistence, messaging, and
//! document loaders feeding the extraction pipeline.

pub mod document;
pub mod error;
pub mod messages;
pub mod sqlite;
pub mod types;

pub use error::StoreError;
pub use messages::{InMemoryMessageStore, MessageStore};
pub use sqlite::SqliteStore;
