//! Error types for the settings-sync core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Copy(#[from] CopyError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from locating, tokenizing, and normalizing the sync config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("required environment variable '{var}' is not set ({purpose})")]
    EnvVarMissing { var: String, purpose: String },

    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// An entry is missing a required key.
    #[error("entry '{entry}' is missing required field '{field}'")]
    MissingField { entry: String, field: String },

    /// Two entries share the same name.
    #[error("duplicate entry name '{0}'")]
    DuplicateEntry(String),

    /// A `sync_direction` value outside the accepted set.
    #[error(
        "invalid sync_direction '{value}' for {label} \
         (expected local_to_repo, repo_to_local, or both)"
    )]
    InvalidDirection { label: String, value: String },

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Copy errors
// ---------------------------------------------------------------------------

/// Errors from a single copy subprocess.
#[derive(Debug, Error)]
pub enum CopyError {
    /// The copy binary was not found on `$PATH`.
    #[error("copy binary not found: {0}")]
    BinaryNotFound(String),

    /// The copy subprocess exited with a non-zero status.
    #[error("copy failed with exit code {exit_code}")]
    Failed { exit_code: i32 },

    /// Generic I/O wrapper (spawn failures, directory creation).
    #[error("copy I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Sync errors
// ---------------------------------------------------------------------------

/// Errors from deciding and carrying out an action on an entry.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An explicit push/pull against an entry restricted to the other way.
    #[error(
        "entry '{entry}' is configured as {direction}; refusing to {action} \
         (pass --force to override)"
    )]
    DirectionNotAllowed {
        entry: String,
        action: String,
        direction: String,
    },

    /// The requested name matched no configured entry.
    #[error("no entries matched \"{0}\"; try \"list\" to see available entries")]
    NoMatchingEntry(String),

    /// Stat failed for a reason other than the path not existing.
    #[error("failed to inspect '{}': {source}", .path.display())]
    Probe {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A copy subprocess failed while handling an entry.
    #[error("entry '{entry}': {source}")]
    Copy {
        entry: String,
        #[source]
        source: CopyError,
    },
}
