//! Loaders turning instructor handouts into plain text for extraction.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

pub mod error;
pub mod loader;
pub mod reader;
pub mod types;

pub use error::DocumentError;
pub use loader::{DocxLoader, TextLoader};
pub use reader::DocumentReader;
pub use types::{Document, DocumentFormat};

#[cfg(feature = "pdf")]
pub use loader::PdfLoader;

/// Handouts above 50 MiB are refused before they are opened.
pub const MAX_HANDOUT_BYTES: u64 = 50 * 1024 * 1024;

pub type LoadFuture<'a> = Pin<Box<dyn Future<Output = Result<Document, DocumentError>> + Send + 'a>>;

pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> LoadFuture<'_>;

    /// Lowercase extensions without the dot.
    fn supported_extensions(&self) -> &[&str];
}
