//! SQLite keystore for sharing state between script invocations.
//!
//! Each script execution is a fresh process; anything that has to survive
//! between invocations goes through this store (or through pushed environment
//! variables). The store is a single file holding one table of
//! `(container, category, key) → value` rows plus a metadata table carrying
//! the schema version stamp and the prune retention window.
//!
//! Scripts should not depend on one another. The intent is not to set a
//! variable here so another script can fetch it later as an API; it is to
//! share results that a sibling script would otherwise have to recompute.
//!
//! # Contract
//! [`Database`] constructors return errors (a schema stamp the build cannot
//! interpret is something the caller must decide about), but once connected,
//! every [`Keystore`] operation degrades soft: failures become `None`/`false`
//! plus a logged warning and never propagate.

mod db;
pub mod error;
mod keystore;
mod models;

pub use crate::db::{Database, SCHEMA_VERSION};
pub use crate::keystore::{DEFAULT_PRUNE_AGE_SECS, Keystore};
pub use crate::models::{Category, Entry};
