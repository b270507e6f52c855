//! Database connection and pool management.

use exn::ResultExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use tracing::{info, instrument};

use crate::error::{ErrorKind, Result, SqlxResultExt};

/// Embedded migrations that are run automatically on connect.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Schema version this build understands. Stamped into the `lookup` table
/// when the file is created; checked on every connect after migrations ran.
pub const SCHEMA_VERSION: i64 = 1;

// Script processes run their queries sequentially; one spare connection
// covers housekeeping running next to a read.
const MAX_CONNECTIONS: u32 = 2;

/// Connection pool for the shared keystore file.
///
/// This is the entry point for interacting with the store. Several script
/// processes may hold a pool onto the same file at once; SQLite's own
/// transactional locking serializes the writers.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn new(options: SqliteConnectOptions, max: Option<u32>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max.unwrap_or(MAX_CONNECTIONS))
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool };
        db.migrate().await?;
        db.verify_version().await?;
        info!("connected to keystore");
        Ok(db)
    }

    /// Connect to the store at the given path.
    ///
    /// Creates the file (and any missing parent directories) if it doesn't
    /// exist and brings the schema up to date.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Database)?;
        }
        let options = Self::base_options().filename(path).create_if_missing(true);
        Self::new(options, None).await
    }

    /// Wipe any existing store at the given path and connect to a fresh one.
    ///
    /// Used when the caller asked for a reset, and to recover from a file
    /// whose stamp this build cannot interpret.
    pub async fn recreate(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        // WAL mode leaves sidecar files next to the store; drop those too.
        for suffix in ["", "-wal", "-shm"] {
            let mut file = path.as_os_str().to_owned();
            file.push(suffix);
            _ = tokio::fs::remove_file(Path::new(&file)).await;
        }
        Self::connect(path).await
    }

    /// Connect to an in-memory database (useful for testing).
    ///
    /// Note:
    /// - In-memory databases are destroyed when the connection closes.
    /// - Do NOT apply `#[cfg(test)]` so that other crates can also use this in their tests.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = Self::base_options().filename(":memory:");
        // In-memory databases must be limited to one connection, otherwise
        // parallel connections see different databases with different data.
        Self::new(options, Some(1)).await
    }

    /// Base connection options shared between file and in-memory databases.
    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            // WAL mode: sibling script processes read while one writes
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            // PRAGMA synchronous = NORMAL (balance between safety and speed)
            .synchronous(SqliteSynchronous::Normal)
            // PRAGMA busy_timeout = 1500ms
            // Bounds the wait on a sibling process holding the write lock;
            // contention past the window surfaces as a failed operation
            // instead of a hang.
            .busy_timeout(std::time::Duration::from_millis(1500))
    }

    /// Run database migrations.
    ///
    /// Called automatically by the connect constructors. An older file is
    /// brought forward here; a file whose applied migrations this build
    /// doesn't know is rejected.
    #[instrument(name = "performing keystore migrations")]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    /// Compare the version stamped in the `lookup` table with the version
    /// this build expects.
    ///
    /// Migrations already ran by the time this is checked, so a mismatch
    /// means the file was written by a newer build (or the stamp is gone).
    /// Rows from such a file must not be interpreted.
    async fn verify_version(&self) -> Result<()> {
        let stamp: Option<String> = sqlx::query_scalar(include_str!("../queries/get_lookup.sql"))
            .bind("SCHEMA_VERSION")
            .fetch_optional(&self.pool)
            .await
            .or_classify()?;
        let found = stamp.and_then(|value| value.parse::<i64>().ok()).unwrap_or(0);
        if found != SCHEMA_VERSION {
            exn::bail!(ErrorKind::Schema { found, expected: SCHEMA_VERSION });
        }
        Ok(())
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the connection pool.
    ///
    /// Waits for all connections to be returned and then closes them. No
    /// entry data is lost on close; persistence is durable.
    pub async fn close(&self) {
        // Let SQLite update query planner statistics
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_in_memory() {
        let db = Database::connect_in_memory().await.unwrap();
        assert!(!db.pool().is_closed());
        db.close().await;
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = Database::connect_in_memory().await.unwrap();
        db.migrate().await.unwrap();
        db.close().await;
    }

    #[tokio::test]
    async fn test_schema_version_is_stamped() {
        let db = Database::connect_in_memory().await.unwrap();
        let stamp: String = sqlx::query_scalar("SELECT value FROM lookup WHERE key = 'SCHEMA_VERSION'")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(stamp.parse::<i64>().unwrap(), SCHEMA_VERSION);
        db.close().await;
    }

    #[tokio::test]
    async fn test_future_stamp_is_rejected() {
        let db = Database::connect_in_memory().await.unwrap();
        sqlx::query("UPDATE lookup SET value = '99' WHERE key = 'SCHEMA_VERSION'")
            .execute(db.pool())
            .await
            .unwrap();
        let err = db.verify_version().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Schema { found: 99, expected: SCHEMA_VERSION }));
        db.close().await;
    }

    #[tokio::test]
    async fn test_recreate_wipes_existing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keystore.db");
        let db = Database::connect(&path).await.unwrap();
        sqlx::query("INSERT INTO keystore (container, category, key, value, last_update) VALUES ('c', 'config', 'K', 'v', 0)")
            .execute(db.pool())
            .await
            .unwrap();
        db.close().await;

        let db = Database::recreate(&path).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM keystore").fetch_one(db.pool()).await.unwrap();
        assert_eq!(count, 0);
        db.close().await;
    }
}
