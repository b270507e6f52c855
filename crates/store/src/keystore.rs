//! Container-scoped key/value operations.
//!
//! Every method on [`Keystore`] follows the same contract: storage failures
//! are logged and folded into the return value (`None`/`false`), they never
//! escape as errors. A persistence hiccup must not abort the host script's
//! primary task, so the caller gets a sentinel and carries on with its other
//! configuration layers.

use crate::Database;
use crate::error::{Result, SqlxResultExt};
use crate::models::{Category, Entry};
use nzbkit_env::{Value, normalize};
use sqlx::SqlitePool;
use time::UtcDateTime;
use tracing::{debug, warn};

/// Retention window stamped into new stores, in seconds.
///
/// Entries are transient hand-off state between script invocations; there is
/// no reason to let them linger longer than half a day.
pub const DEFAULT_PRUNE_AGE_SECS: i64 = 60 * 60 * 12;

/// Key/value operations scoped to one container.
///
/// The container id ties a set of rows to one logical job (typically derived
/// from the job's unique filename); two scripts sharing a container id share
/// state, everything else is isolated.
#[derive(Debug, Clone)]
pub struct Keystore {
    pool: SqlitePool,
    container: String,
}

impl Keystore {
    /// Scope keystore operations to the given container.
    pub fn new(db: &Database, container: impl Into<String>) -> Self {
        Self { pool: db.pool().clone(), container: container.into() }
    }

    /// The container id this handle is scoped to.
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Look up a key within the container and category.
    ///
    /// Returns `None` for an absent key (distinct from an empty string), for
    /// a key that normalizes to nothing, and for storage failures.
    pub async fn get(&self, key: &str, category: Category) -> Option<String> {
        let Some(key) = normalize(key) else {
            warn!(key, "rejecting unusable keystore key");
            return None;
        };
        match self.fetch(&key, category).await {
            Ok(value) => value,
            Err(err) => {
                warn!(%err, %key, "keystore read failed");
                None
            }
        }
    }

    /// Store a key/value pair, overwriting any previous value for the same
    /// `(container, category, key)` triple.
    ///
    /// Returns `false` for a key that normalizes to nothing and for storage
    /// failures; the caller decides whether that matters.
    pub async fn set(&self, key: &str, value: impl Into<Value>, category: Category) -> bool {
        let Some(key) = normalize(key) else {
            warn!(key, "rejecting unusable keystore key");
            return false;
        };
        let value: Value = value.into();
        match self.upsert(&key, &value.to_string(), category).await {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, %key, "keystore write failed");
                false
            }
        }
    }

    /// Remove a key from the container and category.
    ///
    /// Idempotent: returns `true` whether or not a row existed.
    pub async fn unset(&self, key: &str, category: Category) -> bool {
        let Some(key) = normalize(key) else {
            warn!(key, "rejecting unusable keystore key");
            return false;
        };
        match self.delete(&key, category).await {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, %key, "keystore delete failed");
                false
            }
        }
    }

    /// Sweep entries older than `max_age_secs` out of the store, across all
    /// containers, then compact the file.
    ///
    /// An age of `0` removes every accumulated entry; used for housekeeping
    /// between unrelated job runs.
    pub async fn prune(&self, max_age_secs: i64) -> bool {
        match self.sweep(max_age_secs).await {
            Ok(removed) => {
                debug!(removed, max_age_secs, "pruned keystore");
                true
            }
            Err(err) => {
                warn!(%err, "keystore prune failed");
                false
            }
        }
    }

    /// Prune with the retention window stamped in the store's `lookup` table.
    ///
    /// If the `PRUNE_AGE` row was removed by an operator, housekeeping is
    /// skipped entirely.
    pub async fn prune_expired(&self) -> bool {
        match self.retention().await {
            Ok(Some(age)) => self.prune(age).await,
            Ok(None) => {
                debug!("no retention window configured; skipping prune");
                true
            }
            Err(err) => {
                warn!(%err, "could not read keystore retention window");
                false
            }
        }
    }

    /// List every key/value pair in the container and category.
    pub async fn entries(&self, category: Category) -> Vec<Entry> {
        match self.list(category).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(%err, "keystore listing failed");
                Vec::new()
            }
        }
    }

    async fn fetch(&self, key: &str, category: Category) -> Result<Option<String>> {
        sqlx::query_scalar(include_str!("../queries/get_value.sql"))
            .bind(&self.container)
            .bind(category.as_str())
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .or_classify()
    }

    async fn upsert(&self, key: &str, value: &str, category: Category) -> Result<()> {
        sqlx::query(include_str!("../queries/upsert_value.sql"))
            .bind(&self.container)
            .bind(category.as_str())
            .bind(key)
            .bind(value)
            .bind(UtcDateTime::now().unix_timestamp())
            .execute(&self.pool)
            .await
            .or_classify()?;
        Ok(())
    }

    async fn delete(&self, key: &str, category: Category) -> Result<()> {
        sqlx::query(include_str!("../queries/delete_value.sql"))
            .bind(&self.container)
            .bind(category.as_str())
            .bind(key)
            .execute(&self.pool)
            .await
            .or_classify()?;
        Ok(())
    }

    async fn sweep(&self, max_age_secs: i64) -> Result<u64> {
        let cutoff = UtcDateTime::now().unix_timestamp() - max_age_secs;
        let result = sqlx::query(include_str!("../queries/prune_expired.sql"))
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .or_classify()?;
        sqlx::query("VACUUM").execute(&self.pool).await.or_classify()?;
        Ok(result.rows_affected())
    }

    async fn retention(&self) -> Result<Option<i64>> {
        let value: Option<String> = sqlx::query_scalar(include_str!("../queries/get_lookup.sql"))
            .bind("PRUNE_AGE")
            .fetch_optional(&self.pool)
            .await
            .or_classify()?;
        Ok(value.and_then(|age| age.parse().ok()))
    }

    async fn list(&self, category: Category) -> Result<Vec<Entry>> {
        sqlx::query_as(include_str!("../queries/list_entries.sql"))
            .bind(&self.container)
            .bind(category.as_str())
            .fetch_all(&self.pool)
            .await
            .or_classify()
    }
}
