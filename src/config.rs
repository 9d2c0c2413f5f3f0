//! Compiler configuration.
//!
//! A [`Config`] starts from built-in defaults and can be changed in two
//! ways: programmatically through the `with_*` builders, or from source via
//! `[Configuration]` blocks, whose `KEY = value;` entries go through
//! [`Config::set`].

use indexmap::IndexMap;
use thiserror::Error;

/// A configuration value that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value {value:?} for {key}: expected {expected}")]
pub struct ConfigError {
    pub key: String,
    pub value: String,
    pub expected: &'static str,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Options that steer parsing and generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Raise per-stage summaries from `debug` to `info` level.
    pub debug_mode: bool,
    /// Don't add a `class` attribute from local style selectors.
    pub disable_style_auto_add_class: bool,
    /// Don't add an `id` attribute from local style selectors.
    pub disable_style_auto_add_id: bool,
    /// Don't add a `class` attribute from `{{.name}}` in scripts.
    pub disable_script_auto_add_class: bool,
    /// Don't add an `id` attribute from `{{#name}}` in scripts.
    pub disable_script_auto_add_id: bool,
    /// Index of the first element in `tag[N]` specialization targets.
    pub index_initial_count: usize,
    /// Keys without built-in meaning, including `[Name]` and
    /// `[OriginType]` entries, in declaration order.
    pub extra: IndexMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug_mode: false,
            disable_style_auto_add_class: false,
            disable_style_auto_add_id: false,
            disable_script_auto_add_class: true,
            disable_script_auto_add_id: true,
            index_initial_count: 0,
            extra: IndexMap::new(),
        }
    }
}

impl Config {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set debug mode (builder).
    pub fn with_debug_mode(mut self, debug: bool) -> Self {
        self.debug_mode = debug;
        self
    }

    /// Enable or disable style-driven class/id insertion (builder).
    pub fn with_style_auto_add(mut self, class: bool, id: bool) -> Self {
        self.disable_style_auto_add_class = !class;
        self.disable_style_auto_add_id = !id;
        self
    }

    /// Enable or disable script-driven class/id insertion (builder).
    pub fn with_script_auto_add(mut self, class: bool, id: bool) -> Self {
        self.disable_script_auto_add_class = !class;
        self.disable_script_auto_add_id = !id;
        self
    }

    /// Set the first specialization index (builder).
    pub fn with_index_initial_count(mut self, index: usize) -> Self {
        self.index_initial_count = index;
        self
    }

    /// Apply one `KEY = value` entry.
    ///
    /// Known keys are validated; on error the current value is kept.
    /// Unknown keys are stored in [`Config::extra`].
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match key {
            "DEBUG_MODE" => self.debug_mode = parse_bool(key, value)?,
            "DISABLE_STYLE_AUTO_ADD_CLASS" => {
                self.disable_style_auto_add_class = parse_bool(key, value)?
            }
            "DISABLE_STYLE_AUTO_ADD_ID" => self.disable_style_auto_add_id = parse_bool(key, value)?,
            "DISABLE_SCRIPT_AUTO_ADD_CLASS" => {
                self.disable_script_auto_add_class = parse_bool(key, value)?
            }
            "DISABLE_SCRIPT_AUTO_ADD_ID" => {
                self.disable_script_auto_add_id = parse_bool(key, value)?
            }
            "INDEX_INITIAL_COUNT" => {
                self.index_initial_count = value.parse().map_err(|_| ConfigError {
                    key: key.to_string(),
                    value: value.to_string(),
                    expected: "a non-negative integer",
                })?
            }
            _ => {
                self.extra.insert(key.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    /// Look up a pass-through entry.
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError {
            key: key.to_string(),
            value: value.to_string(),
            expected: "true or false",
        }),
    }
}
