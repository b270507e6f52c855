//! The script context: one coherent `get`/`set` surface over the four
//! configuration layers.

use crate::mode::Mode;
use crate::state::{self, StateStore};
use nzbkit_env::{self as env, CONFIG_PREFIX, HOST_MESSAGE_PREFIX, Layers, SHARED_PREFIX, Snapshot, Value, normalize};
use nzbkit_store::Category;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

const STORE_DIRECTORY: &str = "nzbkit";
const STORE_FILENAME: &str = "keystore.db";

/// Layer flags for [`ScriptContext::get_with`].
///
/// Flags disable individual layers; they never reorder them. The resolution
/// order is fixed: system, then config, then the keystore, then shared.
#[derive(Debug, Clone, Copy)]
pub struct GetOptions {
    /// Consult the host-injected system layer.
    pub system: bool,
    /// Consult the keystore (only meaningful with a container id).
    pub database: bool,
    /// Consult values pushed by prior cooperating processes.
    pub shared: bool,
    /// Keystore category to look in.
    pub category: Category,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self { system: true, database: true, shared: true, category: Category::Config }
    }
}

/// Mirror flags for [`ScriptContext::set_with`] and
/// [`ScriptContext::unset_with`].
#[derive(Debug, Clone, Copy)]
pub struct SetOptions {
    /// Mirror the value into the process environment so sub-invocations
    /// relying on the same convention observe it.
    pub environment: bool,
    /// Write through to the keystore (only meaningful with a container id).
    pub database: bool,
    /// Keystore category to write to.
    pub category: Category,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self { environment: true, database: true, category: Category::Config }
    }
}

/// Builder for [`ScriptContext`].
///
/// Everything is optional: without a container id persistence stays off,
/// without explicit layers the process environment is snapshotted, and the
/// store path defaults to the host's temp directory (or the per-user cache
/// directory outside a host invocation).
#[derive(Debug, Default)]
pub struct ContextBuilder {
    container: Option<String>,
    store_path: Option<PathBuf>,
    layers: Option<Layers>,
    mode: Option<Mode>,
}

impl ContextBuilder {
    /// Scope keystore state to this container id (typically the job's unique
    /// nzb filename). Without one, no backing store is ever opened.
    pub fn container(mut self, id: impl Into<String>) -> Self {
        self.container = Some(id.into());
        self
    }

    /// Override the keystore file location.
    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }

    /// Use pre-built layer snapshots instead of reading the environment.
    pub fn layers(mut self, layers: Layers) -> Self {
        self.layers = Some(layers);
        self
    }

    /// Force the invocation mode instead of detecting it.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn build(self) -> ScriptContext {
        let layers = self.layers.unwrap_or_else(Layers::from_env);
        let store_path = self.store_path.unwrap_or_else(|| default_store_path(&layers.system));
        let mode = self.mode.unwrap_or_else(Mode::from_env);
        ScriptContext {
            layers,
            container: self.container,
            store_path,
            mode,
            state: OnceCell::new(),
        }
    }
}

/// Configuration owned by one script invocation.
///
/// Construction takes an explicit snapshot of the prefixed environment
/// layers; after that, the context is the single authority on configuration
/// for the process. Values resolve across four layers in fixed priority
/// order:
///
/// 1. `system`: host-injected (`NZBOP_*`), read-only,
/// 2. `config`: script directives (`NZBPO_*`), mutated by [`set`](Self::set),
/// 3. the keystore: cross-process state, keyed by the container id,
/// 4. `shared`: values pushed by prior cooperating processes (`NZBR_*`).
///
/// The keystore is opened lazily on the first operation that needs it, once.
/// If it cannot be opened, persistence stays silently off for the life of the
/// context and the remaining layers carry on; no operation on this type
/// returns an error.
pub struct ScriptContext {
    layers: Layers,
    container: Option<String>,
    store_path: PathBuf,
    mode: Mode,
    state: OnceCell<Box<dyn StateStore>>,
}

impl ScriptContext {
    /// Build a context from the current process environment.
    pub fn from_env() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// What the host invoked this script as.
    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// The container id keystore state is scoped to, if one was configured.
    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    /// The layer snapshots this context resolves against.
    pub fn layers(&self) -> &Layers {
        &self.layers
    }

    /// Resolve a key across all enabled layers.
    pub async fn get(&self, key: &str) -> Option<String> {
        self.get_with(key, GetOptions::default()).await
    }

    /// Resolve a key, falling back to `default` when every layer misses.
    pub async fn get_or(&self, key: &str, default: impl Into<String>) -> String {
        self.get(key).await.unwrap_or_else(|| default.into())
    }

    /// Resolve a key with individual layers disabled.
    ///
    /// The first layer producing a value wins; disabled layers are skipped,
    /// never reordered.
    pub async fn get_with(&self, key: &str, options: GetOptions) -> Option<String> {
        let Some(key) = normalize(key) else {
            warn!(key, "rejecting unusable key");
            return None;
        };
        if options.system
            && let Some(value) = self.layers.system.get(&key)
        {
            debug!(%key, value, "get(system)");
            return Some(value.to_string());
        }
        if let Some(value) = self.layers.config.get(&key) {
            debug!(%key, value, "get(config)");
            return Some(value.to_string());
        }
        if options.database {
            if let Some(state) = self.state().await
                && let Some(value) = state.load(&key, options.category).await
            {
                debug!(%key, %value, "get(database)");
                return Some(value);
            }
        }
        if options.shared
            && let Some(value) = self.layers.shared.get(&key)
        {
            debug!(%key, value, "get(shared)");
            return Some(value.to_string());
        }
        debug!(%key, "get() missed every layer");
        None
    }

    /// Set a key in the config layer, mirroring to the environment and the
    /// keystore.
    pub async fn set(&mut self, key: &str, value: impl Into<Value>) -> bool {
        self.set_with(key, value, SetOptions::default()).await
    }

    /// Set a key with individual mirrors disabled.
    ///
    /// The in-memory config layer is always written and is authoritative for
    /// the remainder of this process; the return value reflects that write
    /// alone. Mirror failures are logged and swallowed.
    pub async fn set_with(&mut self, key: &str, value: impl Into<Value>, options: SetOptions) -> bool {
        let Some(key) = normalize(key) else {
            warn!(key, "rejecting unusable key");
            return false;
        };
        if self.layers.system.contains(&key) {
            warn!(%key, "set() called with a system key");
        }
        let value: Value = value.into();
        let rendered = value.to_string();
        debug!(%key, value = %rendered, "set()");

        if options.database
            && let Some(state) = self.state().await
        {
            state.store(&key, &rendered, options.category).await;
        }
        if options.environment {
            env::export(&format!("{CONFIG_PREFIX}{key}"), &rendered);
        }
        self.layers.config.insert(key, rendered);
        true
    }

    /// Remove a key from the config layer, the environment mirror, and the
    /// keystore.
    ///
    /// Idempotent: removing a key that is absent everywhere is a success.
    pub async fn unset(&mut self, key: &str) -> bool {
        self.unset_with(key, SetOptions::default()).await
    }

    /// Remove a key with individual mirrors disabled.
    pub async fn unset_with(&mut self, key: &str, options: SetOptions) -> bool {
        let Some(key) = normalize(key) else {
            warn!(key, "rejecting unusable key");
            return false;
        };
        let mut removed = true;
        if options.database
            && let Some(state) = self.state().await
        {
            removed &= state.remove(&key, options.category).await;
        }
        if options.environment {
            env::unexport(&format!("{CONFIG_PREFIX}{key}"));
        }
        self.layers.config.remove(&key);
        removed
    }

    /// Push a key/value pair to the host.
    ///
    /// The value lands in three places: the config layer (visible to this
    /// process), the `NZBR_*` environment mirror (visible to sub-invocations),
    /// and the host's stdout protocol (visible to sibling scripts the host
    /// starts later). Pushing does not persist to the keystore.
    pub fn push(&mut self, key: &str, value: impl Into<Value>) -> bool {
        let Some(key) = normalize(key) else {
            warn!(key, "rejecting unusable key");
            return false;
        };
        let value: Value = value.into();
        let rendered = value.to_string();
        env::export(&format!("{SHARED_PREFIX}{key}"), &rendered);
        // The host consumes this line from stdout; the format is a
        // byte-for-byte contract.
        println!("{HOST_MESSAGE_PREFIX}{SHARED_PREFIX}{key}={rendered}");
        self.layers.config.insert(key, rendered);
        true
    }

    /// Close the keystore connection if one was ever opened.
    pub async fn shutdown(&self) {
        if let Some(state) = self.state.get() {
            state.close().await;
        }
    }

    /// The keystore binding, created on first use.
    ///
    /// Returns `None` when no container id is configured: with nothing to
    /// scope rows to, a backing file must never be created.
    async fn state(&self) -> Option<&dyn StateStore> {
        let container = self.container.as_deref()?;
        let state = self
            .state
            .get_or_init(|| state::connect(&self.store_path, container))
            .await;
        Some(state.as_ref())
    }
}

fn default_store_path(system: &Snapshot) -> PathBuf {
    // Inside a host invocation, share the host's temp directory so sibling
    // scripts land on the same file.
    if let Some(tempdir) = system.get("TEMPDIR") {
        return Path::new(tempdir).join(STORE_DIRECTORY).join(STORE_FILENAME);
    }
    match directories::ProjectDirs::from("", "", STORE_DIRECTORY) {
        Some(dirs) => dirs.cache_dir().join(STORE_FILENAME),
        None => std::env::temp_dir().join(STORE_DIRECTORY).join(STORE_FILENAME),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_store_path_prefers_host_tempdir() {
        let system: Snapshot = [("TEMPDIR", "/tmp/host")].into_iter().collect();
        let path = default_store_path(&system);
        assert_eq!(path, Path::new("/tmp/host").join(STORE_DIRECTORY).join(STORE_FILENAME));
    }

    #[test]
    fn test_default_store_path_outside_host() {
        let path = default_store_path(&Snapshot::default());
        assert!(path.ends_with(STORE_FILENAME));
    }
}
