//! Environment layer snapshots.
//!
//! A script process takes one snapshot of each prefixed environment layer at
//! construction time and works off those maps for the rest of its life.
//! Writing back to the real environment is an explicit step ([`export`]),
//! opted into by the caller, never a side effect of touching a snapshot.

use regex::Regex;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::sync::LazyLock;
use tracing::debug;

/// Host-injected system options (read-only from a script's perspective).
pub const SYSTEM_PREFIX: &str = "NZBOP_";
/// Script-specific configuration directives.
pub const CONFIG_PREFIX: &str = "NZBPO_";
/// Values pushed by this or a prior cooperating script.
pub const SHARED_PREFIX: &str = "NZBR_";
/// Prefix for messages the host consumes from a script's stdout.
pub const HOST_MESSAGE_PREFIX: &str = "[NZB] ";

// Option names after the prefix; the host only generates these.
static OPTION_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z0-9_]+$").unwrap());

/// A point-in-time snapshot of one prefixed environment layer.
///
/// Keys are stored with their prefix stripped; values are trimmed of
/// surrounding whitespace the way the host pads them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: BTreeMap<String, String>,
}

impl Snapshot {
    /// Snapshot every environment variable carrying the given prefix.
    ///
    /// Variables whose name or value is not valid Unicode are skipped; the
    /// host never generates those.
    pub fn from_env(prefix: &str) -> Self {
        let snapshot: Self = std::env::vars_os()
            .filter_map(|(name, value)| {
                let name = name.into_string().ok()?;
                let key = name.strip_prefix(prefix)?;
                let value = value.into_string().ok()?;
                OPTION_NAME.is_match(key).then(|| (key.to_string(), value.trim().to_string()))
            })
            .collect();
        debug!(prefix, options = snapshot.len(), "snapshotted environment layer");
        snapshot
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert an entry, returning the previous value if one existed.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Remove an entry, returning its value if one existed.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// The three environment layers a script resolves configuration against,
/// snapshotted together at construction time.
#[derive(Debug, Clone, Default)]
pub struct Layers {
    /// `NZBOP_*`: host-injected, highest priority.
    pub system: Snapshot,
    /// `NZBPO_*`: script configuration directives.
    pub config: Snapshot,
    /// `NZBR_*`: pushed by prior cooperating processes, lowest priority.
    pub shared: Snapshot,
}

impl Layers {
    /// Snapshot all three layers from the current process environment.
    pub fn from_env() -> Self {
        Self {
            system: Snapshot::from_env(SYSTEM_PREFIX),
            config: Snapshot::from_env(CONFIG_PREFIX),
            shared: Snapshot::from_env(SHARED_PREFIX),
        }
    }
}

/// Write a variable into the real process environment so that spawned or
/// sibling processes following the same convention observe it.
pub fn export(name: &str, value: &str) {
    // SAFETY: script processes are single-threaded while configuration is
    // being mutated; no other thread touches the environment concurrently.
    unsafe { std::env::set_var(name, value) }
}

/// Remove a variable from the real process environment.
pub fn unexport(name: &str) {
    // SAFETY: as for `export`.
    unsafe { std::env::remove_var(name) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_strips_prefix_and_trims() {
        export("NZBOP_LAYERTEST_A", "  padded  ");
        export("NZBOP_LAYERTEST_B", "plain");
        let snapshot = Snapshot::from_env(SYSTEM_PREFIX);
        unexport("NZBOP_LAYERTEST_A");
        unexport("NZBOP_LAYERTEST_B");
        assert_eq!(snapshot.get("LAYERTEST_A"), Some("padded"));
        assert_eq!(snapshot.get("LAYERTEST_B"), Some("plain"));
    }

    #[test]
    fn test_snapshot_ignores_lowercase_suffixes() {
        export("NZBOP_layertest_lower", "nope");
        let snapshot = Snapshot::from_env(SYSTEM_PREFIX);
        unexport("NZBOP_layertest_lower");
        assert!(!snapshot.contains("layertest_lower"));
        assert!(!snapshot.contains("LAYERTEST_LOWER"));
    }

    #[test]
    fn test_snapshot_is_a_point_in_time_copy() {
        let mut snapshot: Snapshot = [("KEY", "one")].into_iter().collect();
        export("NZBR_LAYERTEST_LATE", "late");
        assert!(!snapshot.contains("LAYERTEST_LATE"));
        unexport("NZBR_LAYERTEST_LATE");

        assert_eq!(snapshot.insert("KEY", "two"), Some("one".to_string()));
        assert_eq!(snapshot.get("KEY"), Some("two"));
        assert_eq!(snapshot.remove("KEY"), Some("two".to_string()));
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_layers_from_env_partitions_by_prefix() {
        export("NZBOP_LAYERTEST_SYS", "s");
        export("NZBPO_LAYERTEST_CFG", "c");
        export("NZBR_LAYERTEST_SHR", "r");
        let layers = Layers::from_env();
        unexport("NZBOP_LAYERTEST_SYS");
        unexport("NZBPO_LAYERTEST_CFG");
        unexport("NZBR_LAYERTEST_SHR");
        assert_eq!(layers.system.get("LAYERTEST_SYS"), Some("s"));
        assert_eq!(layers.config.get("LAYERTEST_CFG"), Some("c"));
        assert_eq!(layers.shared.get("LAYERTEST_SHR"), Some("r"));
        assert!(!layers.system.contains("LAYERTEST_CFG"));
        assert!(!layers.config.contains("LAYERTEST_SHR"));
    }
}
