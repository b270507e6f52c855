//! Persistence capability behind the resolver.
//!
//! Whether the keystore is usable is decided exactly once per context, on the
//! first operation that needs it. The outcome is expressed as one of two
//! [`StateStore`] implementations: the real SQLite adapter, or a stub that
//! behaves like a store with nothing in it that accepts nothing. The resolver
//! never branches on availability again after that.

use async_trait::async_trait;
use nzbkit_store::error::ErrorKind;
use nzbkit_store::{Category, Database, Keystore};
use std::path::Path;
use tracing::{info, warn};

/// The interface the resolver persists through.
#[async_trait]
pub(crate) trait StateStore: Send + Sync {
    async fn load(&self, key: &str, category: Category) -> Option<String>;
    async fn store(&self, key: &str, value: &str, category: Category) -> bool;
    async fn remove(&self, key: &str, category: Category) -> bool;
    async fn close(&self);
}

/// Real adapter over the container-scoped keystore.
pub(crate) struct KeystoreState {
    db: Database,
    keys: Keystore,
}

#[async_trait]
impl StateStore for KeystoreState {
    async fn load(&self, key: &str, category: Category) -> Option<String> {
        self.keys.get(key, category).await
    }

    async fn store(&self, key: &str, value: &str, category: Category) -> bool {
        self.keys.set(key, value, category).await
    }

    async fn remove(&self, key: &str, category: Category) -> bool {
        self.keys.unset(key, category).await
    }

    async fn close(&self) {
        self.db.close().await;
    }
}

/// Stub installed when the store cannot be opened.
///
/// Absent keys and rejected writes are exactly what the resolver's soft
/// contract already tolerates, so nothing downstream has to care.
pub(crate) struct DisabledState;

#[async_trait]
impl StateStore for DisabledState {
    async fn load(&self, _key: &str, _category: Category) -> Option<String> {
        None
    }

    async fn store(&self, _key: &str, _value: &str, _category: Category) -> bool {
        false
    }

    async fn remove(&self, _key: &str, _category: Category) -> bool {
        true
    }

    async fn close(&self) {}
}

/// One-shot capability check: open the store at `path`, scoped to
/// `container`, falling back to the disabled stub.
///
/// The outcome is final for the life of the resolver. A stamp written by
/// another build gets one recovery attempt against a wiped file; the store
/// only ever holds transient hand-off state, so wiping beats refusing to run.
pub(crate) async fn connect(path: &Path, container: &str) -> Box<dyn StateStore> {
    let db = match Database::connect(path).await {
        Ok(db) => db,
        Err(err) if matches!(&*err, ErrorKind::Schema { .. }) => {
            warn!(%err, "keystore stamp mismatch; recreating the file");
            match Database::recreate(path).await {
                Ok(db) => db,
                Err(err) => {
                    warn!(%err, "shared state persistence disabled");
                    return Box::new(DisabledState);
                }
            }
        }
        Err(err) => {
            warn!(%err, "shared state persistence disabled");
            return Box::new(DisabledState);
        }
    };
    let keys = Keystore::new(&db, container);
    // Keep accumulated state from growing between unrelated runs.
    keys.prune_expired().await;
    info!(container, "shared state persistence ready");
    Box::new(KeystoreState { db, keys })
}
