//! Process-environment snapshot and path expansion.
//!
//! The environment is captured once at startup into an [`Environment`] and
//! handed to config normalization by reference. Nothing below the CLI reads
//! `std::env` directly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex_lite::{Captures, Regex};
use tracing::debug;

/// Environment variable naming the settings directory.
pub const SETTINGS_DIR_VAR: &str = "SETTINGS_DIR";

/// Variables and home directory captured from the running process.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
    home: Option<PathBuf>,
}

impl Environment {
    /// Snapshot the current process environment.
    pub fn from_process() -> Self {
        let vars: HashMap<String, String> = std::env::vars().collect();
        let home = dirs::home_dir();
        debug!(vars = vars.len(), home = ?home, "captured process environment");
        Self { vars, home }
    }

    /// Build an environment from explicit values.
    pub fn new<I, K, V>(vars: I, home: Option<PathBuf>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            home,
        }
    }

    /// Override (or add) a single variable.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Look up a variable; empty values count as unset.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// The home directory, falling back to `$HOME`.
    pub fn home(&self) -> Option<PathBuf> {
        self.home
            .clone()
            .or_else(|| self.var("HOME").map(PathBuf::from))
    }

    /// Expand a leading `~` and `$NAME` / `${NAME}` references.
    ///
    /// Unknown variables are left verbatim.
    pub fn expand(&self, value: &str) -> String {
        let mut expanded = value.to_string();

        if let Some(rest) = value.strip_prefix('~') {
            if rest.is_empty() || rest.starts_with('/') {
                if let Some(home) = self.home() {
                    expanded = format!("{}{}", home.display(), rest);
                }
            }
        }

        let expanded = bare_var_re().replace_all(&expanded, |caps: &Captures| {
            self.var(&caps[1])
                .map(str::to_string)
                .unwrap_or_else(|| caps[0].to_string())
        });
        let expanded = braced_var_re().replace_all(&expanded, |caps: &Captures| {
            self.var(&caps[1])
                .map(str::to_string)
                .unwrap_or_else(|| caps[0].to_string())
        });

        expanded.into_owned()
    }

    /// Expand `value` and join it onto `root` unless it is already absolute.
    pub fn resolve_with_root(&self, value: &str, root: &Path) -> PathBuf {
        let expanded = self.expand(value);
        let path = Path::new(&expanded);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    }
}

fn bare_var_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$([A-Z0-9_]+)").expect("valid regex"))
}

fn braced_var_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([A-Z0-9_]+)\}").expect("valid regex"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_env() -> Environment {
        Environment::new(
            [("HOME", "/home/kit"), ("XDG", "/home/kit/.config"), ("EMPTY", "")],
            Some(PathBuf::from("/home/kit")),
        )
    }

    #[test]
    fn test_expand_tilde() {
        let env = sample_env();
        assert_eq!(env.expand("~"), "/home/kit");
        assert_eq!(env.expand("~/.zshrc"), "/home/kit/.zshrc");
        // Only a bare tilde or tilde-slash is expanded.
        assert_eq!(env.expand("~other/file"), "~other/file");
    }

    #[test]
    fn test_expand_vars() {
        let env = sample_env();
        assert_eq!(env.expand("$XDG/nvim"), "/home/kit/.config/nvim");
        assert_eq!(env.expand("${XDG}/nvim"), "/home/kit/.config/nvim");
        assert_eq!(env.expand("$HOME"), "/home/kit");
    }

    #[test]
    fn test_unknown_vars_left_verbatim() {
        let env = sample_env();
        assert_eq!(env.expand("$NOPE/x"), "$NOPE/x");
        assert_eq!(env.expand("${NOPE}/x"), "${NOPE}/x");
        assert_eq!(env.expand("$EMPTY/x"), "$EMPTY/x");
        // Lowercase names are not variable references.
        assert_eq!(env.expand("$home/x"), "$home/x");
    }

    #[test]
    fn test_resolve_with_root() {
        let env = sample_env();
        let root = Path::new("/home/kit");
        assert_eq!(
            env.resolve_with_root(".zshrc", root),
            PathBuf::from("/home/kit/.zshrc")
        );
        assert_eq!(
            env.resolve_with_root("/etc/hosts", root),
            PathBuf::from("/etc/hosts")
        );
        assert_eq!(
            env.resolve_with_root("$XDG/kitty", root),
            PathBuf::from("/home/kit/.config/kitty")
        );
    }

    #[test]
    fn test_with_var_overrides() {
        let env = sample_env().with_var("XDG", "/elsewhere");
        assert_eq!(env.expand("$XDG/a"), "/elsewhere/a");
    }

    #[test]
    fn test_home_falls_back_to_var() {
        let env = Environment::new([("HOME", "/srv/home")], None);
        assert_eq!(env.home(), Some(PathBuf::from("/srv/home")));
    }
}
