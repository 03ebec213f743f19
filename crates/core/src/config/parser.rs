//! Tolerant line tokenizer for `settings-sync.yaml`.
//!
//! The accepted dialect is deliberately narrow:
//!
//! ```yaml
//! defaults:
//!   local_root: $HOME
//!   sync_direction: both
//!
//! entries:
//!   - name: shell-rc          # trailing comments are stripped
//!     local_path: .zshrc
//!     repo_path: "zsh/.zshrc"
//! ```
//!
//! Two-space keys under `defaults:`, `- ` items at two spaces under
//! `entries:` with their keys at four spaces. Anything else is skipped.

use std::collections::BTreeMap;

use tracing::debug;

const INDENT: usize = 2;

/// One entry's raw key/value pairs, before validation.
pub type RawEntry = BTreeMap<String, String>;

/// Untyped result of tokenizing a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawConfig {
    pub defaults: BTreeMap<String, String>,
    /// Entries in declaration order.
    pub entries: Vec<RawEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Defaults,
    Entries,
}

/// Tokenize config text into a [`RawConfig`]. Never fails.
pub fn tokenize(text: &str) -> RawConfig {
    let mut config = RawConfig::default();
    let mut section: Option<Section> = None;
    let mut in_entry = false;

    for raw_line in text.lines() {
        let line = strip_inline_comment(raw_line);
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let indent = line.len() - line.trim_start_matches(' ').len();

        if indent == 0 {
            let Some((key, _)) = parse_key_value(trimmed) else {
                continue;
            };
            section = match key.as_str() {
                "defaults" => Some(Section::Defaults),
                "entries" => Some(Section::Entries),
                other => {
                    debug!(key = other, "ignoring unknown top-level key");
                    None
                }
            };
            in_entry = false;
            continue;
        }

        match section {
            Some(Section::Defaults) if indent == INDENT => {
                if let Some((key, value)) = parse_key_value(trimmed) {
                    config.defaults.insert(key, value);
                }
            }
            Some(Section::Entries) => {
                if indent == INDENT {
                    if let Some(item) = trimmed.strip_prefix("- ") {
                        let mut entry = RawEntry::new();
                        if let Some((key, value)) = parse_key_value(item) {
                            entry.insert(key, value);
                        }
                        config.entries.push(entry);
                        in_entry = true;
                    }
                } else if indent == 2 * INDENT && in_entry {
                    if let (Some(entry), Some((key, value))) =
                        (config.entries.last_mut(), parse_key_value(trimmed))
                    {
                        entry.insert(key, value);
                    }
                }
            }
            _ => {}
        }
    }

    debug!(
        defaults = config.defaults.len(),
        entries = config.entries.len(),
        "tokenized config"
    );
    config
}

/// Drop a `#` comment that is preceded by whitespace.
fn strip_inline_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'#' && i > 0 && bytes[i - 1].is_ascii_whitespace() {
            return line[..i].trim_end();
        }
    }
    line
}

/// Split `key: value`, trimming both and stripping matching quotes.
fn parse_key_value(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim().to_string();
    let value = value.trim();
    Some((key, unquote(value).to_string()))
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 {
        let quoted = (value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\''));
        if quoted {
            return &value[1..value.len() - 1];
        }
    }
    value
}
