//! SQLite connection pools for the builder database.
//!
//! SQLite serializes writers, so builder-session writes go through a single
//! connection while reads fan out over a small pool. Both sides share one
//! WAL-mode database file, which lets readers proceed during a write.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// File name of the builder database inside the data directory.
pub const DATABASE_FILE: &str = "kbatlas.db";

const READER_CONNECTIONS: u32 = 8;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Reader and writer pools over the same SQLite file.
#[derive(Clone)]
pub struct DatabasePool {
    /// Read-only connections for loads and listings.
    pub reader: SqlitePool,
    /// The single read-write connection. Migrations run here.
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open `kbatlas.db` inside `data_dir`, creating it if needed.
    pub async fn open(data_dir: &Path) -> Result<Self, sqlx::Error> {
        Self::new(&database_url(data_dir)).await
    }

    /// Connect to `database_url` and bring the schema up to date.
    ///
    /// The reader pool is opened only after migrations have run, so it
    /// never observes a half-migrated schema.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await?;
        sqlx::migrate!("../../migrations").run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(READER_CONNECTIONS)
            .connect_with(options.read_only(true))
            .await?;

        tracing::debug!(database_url, "Opened builder database");
        Ok(Self { reader, writer })
    }

    /// Close both pools, waiting for in-flight queries.
    pub async fn close(&self) {
        self.writer.close().await;
        self.reader.close().await;
    }
}

/// `sqlite://` URL of the builder database inside `data_dir`.
pub fn database_url(data_dir: &Path) -> String {
    format!("sqlite://{}", data_dir.join(DATABASE_FILE).display())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn table_names(pool: &DatabasePool) -> Vec<String> {
        sqlx::query_scalar(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations' \
             ORDER BY name",
        )
        .fetch_all(&pool.reader)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_open_migrates_builder_schema() {
        let dir = tempfile::tempdir().unwrap();
        let pool = DatabasePool::open(dir.path()).await.unwrap();

        assert_eq!(table_names(&pool).await, vec!["agent_templates", "builder_states"]);
        assert!(dir.path().join(DATABASE_FILE).exists());
    }

    #[tokio::test]
    async fn test_writer_uses_wal_journal() {
        let dir = tempfile::tempdir().unwrap();
        let pool = DatabasePool::open(dir.path()).await.unwrap();

        let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(&pool.writer)
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn test_reader_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let pool = DatabasePool::open(dir.path()).await.unwrap();

        let result = sqlx::query("DELETE FROM agent_templates")
            .execute(&pool.reader)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_reopen_after_close() {
        let dir = tempfile::tempdir().unwrap();
        DatabasePool::open(dir.path()).await.unwrap().close().await;

        let pool = DatabasePool::open(dir.path()).await.unwrap();
        assert_eq!(table_names(&pool).await.len(), 2);
    }

    #[test]
    fn test_database_url_points_into_data_dir() {
        assert_eq!(
            database_url(Path::new("/tmp/kb")),
            "sqlite:///tmp/kb/kbatlas.db"
        );
    }
}
