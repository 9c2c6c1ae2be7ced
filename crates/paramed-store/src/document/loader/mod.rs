use std::path::{Path, PathBuf};

use super::DocumentError;

pub(crate) mod docx;
#[cfg(feature = "pdf")]
mod pdf;
mod text;

pub use docx::DocxLoader;
#[cfg(feature = "pdf")]
pub use pdf::PdfLoader;
pub use text::TextLoader;

async fn ensure_within(path: &Path, limit: u64) -> Result<(), DocumentError> {
    let size = tokio::fs::metadata(path).await?.len();
    if size > limit {
        return Err(DocumentError::TooLarge {
            path: path.to_path_buf(),
            size,
            limit,
        });
    }
    Ok(())
}

/// Size-check `path`, then run a synchronous parser on the blocking pool.
async fn parse_blocking<F>(path: PathBuf, limit: u64, parse: F) -> Result<String, DocumentError>
where
    F: FnOnce(&Path) -> Result<String, DocumentError> + Send + 'static,
{
    ensure_within(&path, limit).await?;
    tokio::task::spawn_blocking(move || parse(&path)).await?
}
