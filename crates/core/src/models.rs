//! Domain model types used throughout settings-sync.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Sync direction
// ---------------------------------------------------------------------------

/// Which way(s) an entry is allowed to flow.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    LocalToRepo,
    RepoToLocal,
    #[default]
    Both,
}

impl SyncDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocalToRepo => "local_to_repo",
            Self::RepoToLocal => "repo_to_local",
            Self::Both => "both",
        }
    }

    /// Normalize an optional raw value.
    ///
    /// Absent or empty values take `fallback`. Anything outside the three
    /// accepted spellings is an error naming `label`.
    pub fn normalize(
        value: Option<&str>,
        fallback: SyncDirection,
        label: &str,
    ) -> Result<SyncDirection, ConfigError> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(fallback),
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidDirection {
                label: label.to_string(),
                value: v.to_string(),
            }),
        }
    }
}

impl FromStr for SyncDirection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local_to_repo" => Ok(Self::LocalToRepo),
            "repo_to_local" => Ok(Self::RepoToLocal),
            "both" => Ok(Self::Both),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Default source
// ---------------------------------------------------------------------------

/// Which side wins a bidirectional file sync when mtimes are equal.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DefaultSource {
    #[default]
    Local,
    Repo,
}

impl DefaultSource {
    /// `repo` selects the repo side; every other value selects local.
    pub fn from_value(value: &str) -> Self {
        if value.trim() == "repo" {
            Self::Repo
        } else {
            Self::Local
        }
    }
}

impl fmt::Display for DefaultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Repo => write!(f, "repo"),
        }
    }
}

// ---------------------------------------------------------------------------
// Path type
// ---------------------------------------------------------------------------

/// Whether an entry is copied as a single file or a mirrored directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathType {
    File,
    Dir,
}

impl fmt::Display for PathType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Dir => write!(f, "dir"),
        }
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// A user-requested operation on one or more entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Local to repo.
    Push,
    /// Repo to local.
    Pull,
    /// Direction-aware reconciliation.
    Sync,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push => write!(f, "push"),
            Self::Pull => write!(f, "pull"),
            Self::Sync => write!(f, "sync"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sync entry
// ---------------------------------------------------------------------------

/// A normalized, named pairing of a local path and a repo path.
///
/// Both paths are absolute and the direction is always resolved.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SyncEntry {
    pub name: String,
    pub description: Option<String>,
    pub local_path: PathBuf,
    pub repo_path: PathBuf,
    pub sync_direction: SyncDirection,
    pub default_source: DefaultSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_round_trip_names() {
        for d in [
            SyncDirection::LocalToRepo,
            SyncDirection::RepoToLocal,
            SyncDirection::Both,
        ] {
            assert_eq!(d.as_str().parse::<SyncDirection>(), Ok(d));
        }
    }

    #[test]
    fn test_normalize_absent_uses_fallback() {
        let d = SyncDirection::normalize(None, SyncDirection::RepoToLocal, "defaults").unwrap();
        assert_eq!(d, SyncDirection::RepoToLocal);
        let d = SyncDirection::normalize(Some("  "), SyncDirection::Both, "defaults").unwrap();
        assert_eq!(d, SyncDirection::Both);
    }

    #[test]
    fn test_normalize_rejects_unknown() {
        let err = SyncDirection::normalize(Some("Both"), SyncDirection::Both, "entry 'x'")
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidDirection { ref label, ref value }
                if label == "entry 'x'" && value == "Both"
        ));
    }

    #[test]
    fn test_default_source_from_value() {
        assert_eq!(DefaultSource::from_value("repo"), DefaultSource::Repo);
        assert_eq!(DefaultSource::from_value("local"), DefaultSource::Local);
        assert_eq!(DefaultSource::from_value("whatever"), DefaultSource::Local);
    }

    #[test]
    fn test_serialize_snake_case() {
        let json = serde_json::to_string(&SyncDirection::LocalToRepo).unwrap();
        assert_eq!(json, "\"local_to_repo\"");
    }
}
