//! Configuration loading for settings-sync.
//!
//! Loading is a two-stage pipeline: [`parser::tokenize`] turns the file into
//! an untyped [`RawConfig`], then [`SyncConfig::from_raw`] validates it and
//! resolves every path against the captured [`Environment`].

pub mod parser;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::env::{Environment, SETTINGS_DIR_VAR};
use crate::errors::ConfigError;
use crate::models::{DefaultSource, SyncDirection, SyncEntry};

pub use parser::{tokenize, RawConfig, RawEntry};

/// File name of the config inside the settings directory.
pub const CONFIG_FILE_NAME: &str = "settings-sync.yaml";

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Resolved `defaults:` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    /// Root for relative `local_path` values (default `$HOME`).
    pub local_root: PathBuf,
    /// Root for relative `repo_path` values (default `$SETTINGS_DIR/settings`).
    pub repo_root: PathBuf,
    pub sync_direction: SyncDirection,
    pub default_source: DefaultSource,
}

// ---------------------------------------------------------------------------
// SyncConfig
// ---------------------------------------------------------------------------

/// Normalized configuration. Immutable once built.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    defaults: Defaults,
    entries: Vec<SyncEntry>,
}

impl SyncConfig {
    /// Resolve the settings directory from an explicit override or the
    /// `SETTINGS_DIR` variable.
    ///
    /// A relative value is taken relative to the current directory, so the
    /// result is always absolute.
    pub fn settings_dir(
        explicit: Option<&Path>,
        env: &Environment,
    ) -> Result<PathBuf, ConfigError> {
        let dir = explicit
            .map(Path::to_path_buf)
            .or_else(|| env.var(SETTINGS_DIR_VAR).map(PathBuf::from))
            .ok_or_else(|| ConfigError::EnvVarMissing {
                var: SETTINGS_DIR_VAR.into(),
                purpose: format!("it locates {}", CONFIG_FILE_NAME),
            })?;

        if dir.is_absolute() {
            return Ok(dir);
        }
        let absolute = std::env::current_dir()?.join(&dir);
        debug!(from = %dir.display(), to = %absolute.display(), "settings directory made absolute");
        Ok(absolute)
    }

    /// Read, tokenize, and normalize `<settings_dir>/settings-sync.yaml`.
    pub fn load(settings_dir: &Path, env: &Environment) -> Result<Self, ConfigError> {
        let path = settings_dir.join(CONFIG_FILE_NAME);
        info!(path = %path.display(), "loading sync configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(&path)?;
        Self::from_str_with_env(&contents, settings_dir, env)
    }

    /// Tokenize and normalize config text.
    pub fn from_str_with_env(
        text: &str,
        settings_dir: &Path,
        env: &Environment,
    ) -> Result<Self, ConfigError> {
        Self::from_raw(tokenize(text), settings_dir, env)
    }

    /// Validate a [`RawConfig`] and resolve it into typed entries.
    pub fn from_raw(
        raw: RawConfig,
        settings_dir: &Path,
        env: &Environment,
    ) -> Result<Self, ConfigError> {
        let defaults = resolve_defaults(&raw, settings_dir, env)?;

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(raw.entries.len());
        for (index, raw_entry) in raw.entries.iter().enumerate() {
            let entry = normalize_entry(raw_entry, index, &defaults, env)?;
            if !seen.insert(entry.name.clone()) {
                return Err(ConfigError::DuplicateEntry(entry.name));
            }
            entries.push(entry);
        }

        debug!(entries = entries.len(), "sync configuration normalized");
        Ok(Self {
            defaults,
            entries,
        })
    }

    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[SyncEntry] {
        &self.entries
    }

    /// Entries selected by `target`; `None` selects every entry.
    pub fn select(&self, target: Option<&str>) -> Vec<&SyncEntry> {
        match target {
            None => self.entries.iter().collect(),
            Some(name) => self.entries.iter().filter(|e| e.name == name).collect(),
        }
    }

    /// Generate a commented config template.
    pub fn default_template() -> &'static str {
        r#"# settings-sync configuration
#
# Relative local paths resolve against local_root, relative repo paths
# against repo_root. `~`, $VAR and ${VAR} are expanded.

defaults:
  local_root: $HOME
  repo_root: $SETTINGS_DIR/settings
  sync_direction: both        # local_to_repo | repo_to_local | both
  default_source: local       # tie-breaker for equal mtimes: local | repo

entries:
  - name: shell-rc
    description: Zsh startup file
    local_path: .zshrc
    repo_path: zsh/.zshrc
  # - name: nvim
  #   description: Neovim config
  #   local_path: .config/nvim/
  #   repo_path: nvim
  #   sync_direction: repo_to_local
"#
    }
}

fn resolve_defaults(
    raw: &RawConfig,
    settings_dir: &Path,
    env: &Environment,
) -> Result<Defaults, ConfigError> {
    let get = |key: &str| raw.defaults.get(key).map(String::as_str).filter(|v| !v.is_empty());

    let local_root = match get("local_root") {
        Some(v) => PathBuf::from(env.expand(v)),
        None => env.home().ok_or_else(|| ConfigError::EnvVarMissing {
            var: "HOME".into(),
            purpose: "it is the default local_root".into(),
        })?,
    };
    let repo_root = match get("repo_root") {
        Some(v) => PathBuf::from(env.expand(v)),
        None => settings_dir.join("settings"),
    };

    for (field, root) in [("defaults.local_root", &local_root), ("defaults.repo_root", &repo_root)] {
        if !root.is_absolute() {
            return Err(ConfigError::InvalidValue {
                field: field.into(),
                detail: format!("'{}' does not expand to an absolute path", root.display()),
            });
        }
    }

    let sync_direction =
        SyncDirection::normalize(get("sync_direction"), SyncDirection::Both, "defaults")?;
    let default_source = get("default_source")
        .map(|v| parse_default_source(v, "defaults"))
        .unwrap_or_default();

    Ok(Defaults {
        local_root,
        repo_root,
        sync_direction,
        default_source,
    })
}

fn normalize_entry(
    raw: &RawEntry,
    index: usize,
    defaults: &Defaults,
    env: &Environment,
) -> Result<SyncEntry, ConfigError> {
    let get = |key: &str| raw.get(key).map(String::as_str).filter(|v| !v.is_empty());

    let name = get("name")
        .ok_or_else(|| ConfigError::MissingField {
            entry: format!("#{}", index + 1),
            field: "name".into(),
        })?
        .to_string();
    let required = |field: &str| {
        get(field).ok_or_else(|| ConfigError::MissingField {
            entry: name.clone(),
            field: field.into(),
        })
    };

    let local_path = env.resolve_with_root(required("local_path")?, &defaults.local_root);
    let repo_path = env.resolve_with_root(required("repo_path")?, &defaults.repo_root);

    let label = format!("entry '{}'", name);
    let sync_direction =
        SyncDirection::normalize(get("sync_direction"), defaults.sync_direction, &label)?;
    let default_source = get("default_source")
        .map(|v| parse_default_source(v, &label))
        .unwrap_or(defaults.default_source);

    debug!(
        name = %name,
        local = %local_path.display(),
        repo = %repo_path.display(),
        direction = %sync_direction,
        "normalized entry"
    );

    Ok(SyncEntry {
        name,
        description: get("description").map(str::to_string),
        local_path,
        repo_path,
        sync_direction,
        default_source,
    })
}

fn parse_default_source(value: &str, label: &str) -> DefaultSource {
    if !matches!(value, "local" | "repo") {
        warn!(label, value, "unknown default_source; using local");
    }
    DefaultSource::from_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Environment {
        Environment::new(
            [("HOME", "/home/kit"), ("SETTINGS_DIR", "/srv/dots")],
            Some(PathBuf::from("/home/kit")),
        )
    }

    fn load(text: &str) -> Result<SyncConfig, ConfigError> {
        SyncConfig::from_str_with_env(text, Path::new("/srv/dots"), &env())
    }

    #[test]
    fn test_defaults_applied() {
        let config = load("entries:\n  - name: a\n    local_path: .a\n    repo_path: a\n").unwrap();
        let d = config.defaults();
        assert_eq!(d.local_root, PathBuf::from("/home/kit"));
        assert_eq!(d.repo_root, PathBuf::from("/srv/dots/settings"));
        assert_eq!(d.sync_direction, SyncDirection::Both);
        assert_eq!(d.default_source, DefaultSource::Local);

        let e = &config.entries()[0];
        assert_eq!(e.local_path, PathBuf::from("/home/kit/.a"));
        assert_eq!(e.repo_path, PathBuf::from("/srv/dots/settings/a"));
        assert_eq!(e.sync_direction, SyncDirection::Both);
        assert_eq!(e.description, None);
    }

    #[test]
    fn test_entry_overrides_defaults() {
        let text = "\
defaults:
  repo_root: ${SETTINGS_DIR}/files
  sync_direction: local_to_repo
  default_source: repo
entries:
  - name: a
    local_path: ~/x/.a
    repo_path: /abs/a
    sync_direction: repo_to_local
    default_source: local
  - name: b
    local_path: .b
    repo_path: b
";
        let config = load(text).unwrap();
        let a = &config.entries()[0];
        assert_eq!(a.local_path, PathBuf::from("/home/kit/x/.a"));
        assert_eq!(a.repo_path, PathBuf::from("/abs/a"));
        assert_eq!(a.sync_direction, SyncDirection::RepoToLocal);
        assert_eq!(a.default_source, DefaultSource::Local);

        let b = &config.entries()[1];
        assert_eq!(b.repo_path, PathBuf::from("/srv/dots/files/b"));
        assert_eq!(b.sync_direction, SyncDirection::LocalToRepo);
        assert_eq!(b.default_source, DefaultSource::Repo);
    }

    #[test]
    fn test_invalid_direction_names_entry() {
        let text = "entries:\n  - name: shell-rc\n    local_path: .zshrc\n    repo_path: zsh/.zshrc\n    sync_direction: invalid_value\n";
        let err = load(text).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidDirection { ref label, ref value }
                if label.contains("shell-rc") && value == "invalid_value"
        ));
        assert!(err.to_string().contains("shell-rc"));
    }

    #[test]
    fn test_invalid_default_direction() {
        let err = load("defaults:\n  sync_direction: up\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDirection { ref label, .. } if label == "defaults"));
    }

    #[test]
    fn test_missing_fields() {
        let err = load("entries:\n  - local_path: .a\n    repo_path: a\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { ref field, .. } if field == "name"));

        let err = load("entries:\n  - name: a\n    local_path: .a\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField { ref entry, ref field } if entry == "a" && field == "repo_path"
        ));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let text = "entries:\n  - name: a\n    local_path: .a\n    repo_path: a\n  - name: a\n    local_path: .b\n    repo_path: b\n";
        assert!(matches!(load(text), Err(ConfigError::DuplicateEntry(ref n)) if n == "a"));
    }

    #[test]
    fn test_relative_root_rejected() {
        let err = load("defaults:\n  local_root: $UNSET_ROOT\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "defaults.local_root"
        ));
    }

    #[test]
    fn test_settings_dir_resolution() {
        let empty = Environment::new(Vec::<(String, String)>::new(), None);
        assert!(matches!(
            SyncConfig::settings_dir(None, &empty),
            Err(ConfigError::EnvVarMissing { ref var, .. }) if var == "SETTINGS_DIR"
        ));
        assert_eq!(
            SyncConfig::settings_dir(Some(Path::new("/x")), &empty).unwrap(),
            PathBuf::from("/x")
        );
        assert_eq!(
            SyncConfig::settings_dir(None, &env()).unwrap(),
            PathBuf::from("/srv/dots")
        );
    }

    #[test]
    fn test_relative_settings_dir_is_made_absolute() {
        let env = env().with_var(SETTINGS_DIR_VAR, "dots");
        let dir = SyncConfig::settings_dir(None, &env).unwrap();
        assert!(dir.is_absolute());
        assert_eq!(dir, std::env::current_dir().unwrap().join("dots"));

        let config = SyncConfig::from_str_with_env("entries:\n", &dir, &env).unwrap();
        assert_eq!(config.defaults().repo_root, dir.join("settings"));
    }

    #[test]
    fn test_select() {
        let text = "entries:\n  - name: a\n    local_path: .a\n    repo_path: a\n  - name: b\n    local_path: .b\n    repo_path: b\n";
        let config = load(text).unwrap();
        assert_eq!(config.select(None).len(), 2);
        assert_eq!(config.select(Some("b"))[0].name, "b");
        assert!(config.select(Some("zzz")).is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), SyncConfig::default_template()).unwrap();
        let config = SyncConfig::load(dir.path(), &env()).unwrap();
        assert_eq!(config.entries().len(), 1);
        assert_eq!(config.entries()[0].name, "shell-rc");
    }

    #[test]
    fn test_file_not_found() {
        let result = SyncConfig::load(Path::new("/nonexistent/dots"), &env());
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
