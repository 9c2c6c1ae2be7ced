/// Failures that abort a whole pipeline run or seeding pass.
///
/// Per-document extraction and validation problems never surface here; they
/// become a `DocumentOutcome` instead.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] paramed_store::StoreError),

    #[error(transparent)]
    Document(#[from] paramed_store::document::DocumentError),

    #[error("invalid catalogue: {0}")]
    Catalogue(String),
}

/// A decoded model response that does not describe usable content.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("invalid extraction: {0}")]
    Invalid(String),
}
