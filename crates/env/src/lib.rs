//! NZBGet environment-variable calling convention.
//!
//! NZBGet talks to external scripts exclusively through the process
//! environment: every option is handed over as a `PREFIX_NAME=value` variable,
//! and scripts hand values back by exporting variables under the shared prefix
//! and printing `[NZB] ...` directives on stdout. This crate pins down that
//! convention in one place:
//!
//! - the three well-known variable prefixes and the host message prefix,
//! - key normalization (the host only accepts a restricted character set),
//! - construction-time [`Layers`] snapshots of the prefixed environment,
//! - [`Value`] coercion (booleans travel as `0`/`1` on the wire),
//! - list/boolean parsing for option values.
//!
//! The prefixes and casing are an external contract shared with the host and
//! with every other script in the chain. Do not change them.

mod key;
mod layers;
mod parse;
mod value;

pub use crate::key::normalize;
pub use crate::layers::{
    CONFIG_PREFIX, HOST_MESSAGE_PREFIX, Layers, SHARED_PREFIX, SYSTEM_PREFIX, Snapshot, export,
    unexport,
};
pub use crate::parse::{parse_bool, parse_list};
pub use crate::value::Value;
