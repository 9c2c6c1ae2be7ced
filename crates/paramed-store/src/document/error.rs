use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("cannot read handout: {0}")]
    Io(#[from] std::io::Error),

    #[error("no loader for {}", .0.display())]
    Unsupported(PathBuf),

    #[error("{} is {size} bytes, limit is {limit}", path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("not a Word archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Word archive has no {0}")]
    MissingPart(&'static str),

    #[error("extraction task aborted: {0}")]
    Aborted(#[from] tokio::task::JoinError),

    #[cfg(feature = "pdf")]
    #[error("PDF text extraction failed: {0}")]
    Pdf(String),
}
