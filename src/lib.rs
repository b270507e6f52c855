//! Script-authoring toolkit for NZBGet-style download-automation hosts.
//!
//! The host calls external scripts with everything passed through prefixed
//! environment variables, expects results back through stdout directives, and
//! starts every script as a fresh process. This crate wraps that convention
//! in a structured API:
//!
//! - [`ScriptContext`]: one coherent `get`/`set`/`unset`/`push` surface over
//!   the host's configuration layers, with a fixed resolution order
//!   (system > config > keystore > shared),
//! - [`Mode`]: what the script was invoked as (post-process, scan,
//!   scheduler), with the mode-specific payload attached,
//! - a SQLite keystore ([`Database`]/[`Keystore`], re-exported from
//!   `nzbkit-store`) for state that has to survive between invocations.
//!
//! Persistence is strictly best-effort: a missing or broken keystore logs a
//! warning and disappears behind the remaining layers. Nothing in this crate
//! aborts the script's primary task over a persistence hiccup.
//!
//! ```no_run
//! use nzbkit::{Mode, ScriptContext};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let ctx = ScriptContext::from_env();
//! if let Mode::PostProcess(job) = ctx.mode() {
//!     let container = job.nzb_filename.clone().unwrap_or_default();
//!     let mut ctx = ScriptContext::builder().container(container).build();
//!     if ctx.get("ALREADY_SORTED").await.is_none() {
//!         // ... do the expensive work once ...
//!         ctx.set("ALREADY_SORTED", true).await;
//!     }
//!     ctx.shutdown().await;
//! }
//! # }
//! ```

mod context;
mod mode;
mod state;

pub use crate::context::{ContextBuilder, GetOptions, ScriptContext, SetOptions};
pub use crate::mode::{
    Mode, POSTPROCESS_PREFIX, PostProcessJob, SCAN_PREFIX, SCHEDULER_PREFIX, ScanJob, SchedulerTask,
};
pub use nzbkit_env::{
    CONFIG_PREFIX, HOST_MESSAGE_PREFIX, Layers, SHARED_PREFIX, SYSTEM_PREFIX, Snapshot, Value,
    parse_bool, parse_list,
};
pub use nzbkit_store::{Category, Database, Entry, Keystore};
