//! settings-sync core library.
//!
//! This crate provides everything behind the `settings-sync` CLI: the
//! environment snapshot and path expansion, the config tokenizer and typed
//! normalization, path-type probing, copy executors, and the sync director
//! that decides which way each entry is copied.

pub mod config;
pub mod copy;
pub mod env;
pub mod errors;
pub mod models;
pub mod probe;
pub mod sync_engine;

// Re-exports for convenience.
pub use config::SyncConfig;
pub use copy::{CopyExecutor, CopyRequest, DryRunExecutor, RsyncExecutor};
pub use env::Environment;
pub use models::{Action, DefaultSource, PathType, SyncDirection, SyncEntry};
pub use sync_engine::{EntryOutcome, SyncDirector};
