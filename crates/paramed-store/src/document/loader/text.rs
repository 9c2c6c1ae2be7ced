use std::path::Path;

use super::super::{
    Document, DocumentError, DocumentFormat, DocumentLoader, LoadFuture, MAX_HANDOUT_BYTES,
};
use super::ensure_within;

/// Plain-text and markdown handouts, read as-is.
#[derive(Debug, Clone, Copy)]
pub struct TextLoader {
    pub limit: u64,
}

impl Default for TextLoader {
    fn default() -> Self {
        Self {
            limit: MAX_HANDOUT_BYTES,
        }
    }
}

fn format_of(path: &Path) -> DocumentFormat {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("md" | "markdown") => DocumentFormat::Markdown,
        _ => DocumentFormat::PlainText,
    }
}

impl DocumentLoader for TextLoader {
    fn load(&self, path: &Path) -> LoadFuture<'_> {
        let source = path.to_path_buf();
        Box::pin(async move {
            ensure_within(&source, self.limit).await?;
            let text = tokio::fs::read_to_string(&source).await?;
            Ok(Document {
                text,
                format: format_of(&source),
                source,
            })
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["txt", "md", "markdown"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("CPR.txt");
        std::fs::write(&file, "Check responsiveness\nCall for help").unwrap();

        let doc = TextLoader::default().load(&file).await.unwrap();
        assert_eq!(doc.text, "Check responsiveness\nCall for help");
        assert_eq!(doc.format, DocumentFormat::PlainText);
        assert_eq!(doc.stem(), "CPR");
    }

    #[tokio::test]
    async fn markdown_extension_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("airway.MD");
        std::fs::write(&file, "# Airway").unwrap();

        let doc = TextLoader::default().load(&file).await.unwrap();
        assert_eq!(doc.format, DocumentFormat::Markdown);
    }

    #[tokio::test]
    async fn missing_handout_is_io_error() {
        let result = TextLoader::default()
            .load(Path::new("/nonexistent/handout.txt"))
            .await;
        assert!(matches!(result, Err(DocumentError::Io(_))));
    }

    #[tokio::test]
    async fn over_limit_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("long.txt");
        std::fs::write(&file, "abc").unwrap();

        let result = TextLoader { limit: 2 }.load(&file).await;
        assert!(matches!(
            result,
            Err(DocumentError::TooLarge { size: 3, limit: 2, .. })
        ));
    }
}
