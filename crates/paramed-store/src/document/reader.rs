use std::path::{Path, PathBuf};

use super::{Document, DocumentError, DocumentLoader, DocxLoader, TextLoader};

/// Dispatches handouts to the loader registered for their extension.
pub struct DocumentReader {
    loaders: Vec<Box<dyn DocumentLoader>>,
}

impl Default for DocumentReader {
    #[cfg_attr(not(feature = "pdf"), allow(unused_mut))]
    fn default() -> Self {
        let mut loaders: Vec<Box<dyn DocumentLoader>> =
            vec![Box::new(DocxLoader::default()), Box::new(TextLoader::default())];
        #[cfg(feature = "pdf")]
        loaders.push(Box::new(super::PdfLoader::default()));
        Self { loaders }
    }
}

impl DocumentReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_loader(mut self, loader: Box<dyn DocumentLoader>) -> Self {
        self.loaders.push(loader);
        self
    }

    fn loader_for(&self, path: &Path) -> Option<&dyn DocumentLoader> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.loaders
            .iter()
            .find(|l| l.supported_extensions().contains(&ext.as_str()))
            .map(|l| &**l)
    }

    #[must_use]
    pub fn supports(&self, path: &Path) -> bool {
        self.loader_for(path).is_some()
    }

    /// # Errors
    ///
    /// Returns `Unsupported` for unknown extensions, or the loader's error.
    pub async fn load(&self, path: &Path) -> Result<Document, DocumentError> {
        let loader = self
            .loader_for(path)
            .ok_or_else(|| DocumentError::Unsupported(path.to_path_buf()))?;
        loader.load(path).await
    }

    /// Text of `path`, or an empty string if it cannot be read.
    pub async fn read_text(&self, path: &Path) -> String {
        match self.load(path).await {
            Ok(doc) => doc.text,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read document");
                String::new()
            }
        }
    }

    /// Supported files directly inside `dir`, sorted by file name.
    ///
    /// Word lock files (`~$...`) are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub async fn list_documents(&self, dir: &Path) -> Result<Vec<PathBuf>, DocumentError> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_lock_file = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("~$"));
            if is_lock_file || !entry.file_type().await?.is_file() || !self.supports(&path) {
                continue;
            }
            files.push(path);
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        tracing::debug!(dir = %dir.display(), count = files.len(), "listed documents");
        Ok(files)
    }
}
