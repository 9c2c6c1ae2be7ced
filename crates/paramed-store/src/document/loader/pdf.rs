use std::path::Path;

use super::super::{
    Document, DocumentError, DocumentFormat, DocumentLoader, LoadFuture, MAX_HANDOUT_BYTES,
};
use super::parse_blocking;

/// PDF handouts. Image-only pages yield no text.
#[derive(Debug, Clone, Copy)]
pub struct PdfLoader {
    pub limit: u64,
}

impl Default for PdfLoader {
    fn default() -> Self {
        Self {
            limit: MAX_HANDOUT_BYTES,
        }
    }
}

impl DocumentLoader for PdfLoader {
    fn load(&self, path: &Path) -> LoadFuture<'_> {
        let source = path.to_path_buf();
        Box::pin(async move {
            let text = parse_blocking(source.clone(), self.limit, |p| {
                pdf_extract::extract_text(p).map_err(|e| DocumentError::Pdf(e.to_string()))
            })
            .await?;
            Ok(Document {
                text,
                source,
                format: DocumentFormat::Pdf,
            })
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }
}
