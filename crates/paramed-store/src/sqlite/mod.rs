mod catalog;
mod messages;
mod quiz;
mod steps;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

use crate::error::StoreError;

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the `SQLite` database and run migrations.
    ///
    /// Enables foreign key constraints at connection level so that deleting a
    /// skill cascades to its steps and questions. WAL mode lets the progress
    /// monitor read while an extraction run writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let in_memory = path == ":memory:";
        let url = if in_memory {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let opts = SqliteConnectOptions::from_str(&url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            // every in-memory connection would be a separate database
            .max_connections(if in_memory { 1 } else { 5 })
            .connect_with(opts)
            .await?;

        Self::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Expose the underlying pool for ad hoc administrative queries.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run all migrations on the given pool.
    ///
    /// # Errors
    ///
    /// Returns an error if any migration fails.
    pub async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreError> {
        sqlx::migrate!("../../migrations").run(pool).await?;
        Ok(())
    }
}

pub(crate) fn encode_list(items: &[String]) -> Result<String, StoreError> {
    Ok(serde_json::to_string(items)?)
}

/// Lists are stored as JSON text; rows written by older tools may hold junk.
pub(crate) fn decode_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_database_survives_reopen_in_wal_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paramed.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteStore::new(path).await.unwrap();
            sqlx::query("INSERT INTO categories (name, description) VALUES ('Cardiac', '')")
                .execute(store.pool())
                .await
                .unwrap();
        }

        let reopened = SqliteStore::new(path).await.unwrap();
        let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(reopened.pool())
            .await
            .unwrap();
        assert_eq!(mode, "wal");
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(reopened.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn migrations_create_tables() {
        let store = SqliteStore::new(":memory:").await.unwrap();
        let tables: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(store.pool())
                .await
                .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        for expected in [
            "categories",
            "messages",
            "quiz_questions",
            "skill_steps",
            "skills",
            "subjects",
        ] {
            assert!(names.contains(&expected), "missing table {expected}: {names:?}");
        }
    }

    #[test]
    fn decode_list_tolerates_garbage() {
        assert!(decode_list("not json").is_empty());
        assert_eq!(decode_list(r#"["a","b"]"#), vec!["a", "b"]);
    }

    #[test]
    fn encode_list_produces_json_array() {
        let encoded = encode_list(&["one".to_owned(), "two".to_owned()]).unwrap();
        assert_eq!(encoded, r#"["one","two"]"#);
    }
}
