use std::path::{Path, PathBuf};

/// Container a handout was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Docx,
    PlainText,
    Markdown,
    Pdf,
}

impl DocumentFormat {
    #[must_use]
    pub fn media_type(self) -> &'static str {
        match self {
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::PlainText => "text/plain",
            Self::Markdown => "text/markdown",
            Self::Pdf => "application/pdf",
        }
    }
}

/// Text pulled out of one handout.
#[derive(Debug, Clone)]
pub struct Document {
    pub text: String,
    pub source: PathBuf,
    pub format: DocumentFormat,
}

impl Document {
    /// File name without its extension, used as a fallback skill name.
    #[must_use]
    pub fn stem(&self) -> &str {
        self.source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }
}
