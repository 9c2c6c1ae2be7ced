#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("catalogue database: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("schema migration: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A JSON list column (objectives, key points, options...) could not be encoded.
    #[error("list column encoding: {0}")]
    ListColumn(#[from] serde_json::Error),

    #[error("row position out of range: {0}")]
    Position(#[from] std::num::TryFromIntError),

    #[error("in-memory message store poisoned by a panicking writer")]
    Poisoned,
}
