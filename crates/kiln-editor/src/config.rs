//! Configuration and the editor context built from it.
//!
//! `kiln.toml` (or the file named by `$KILN_CONFIG`) is read once at
//! startup. Every section is optional; present keys are merged over the
//! built-in defaults key by key, so a `[colors]` table naming one style
//! leaves the other styles alone.
//!
//! ```toml
//! [editor]
//! tab_size = 2
//! use_spaces = true
//! autosave_interval_secs = 30
//! undo_limit = 5000
//!
//! [editor.lint_command]
//! python = ["ruff", "check"]
//!
//! [keybindings]
//! redo = "ctrl+y"
//!
//! [colors]
//! keyword = "bold blue"
//! search_highlight = "black on cyan"
//!
//! [supported_formats]
//! rust = ["rs"]
//! ```
//!
//! A bad config never stops the editor: [`Config::load`] hands back the
//! defaults together with the error, and the caller shows it once.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kiln_term::style::Style;
use serde::Deserialize;

use crate::action::Keymap;
use crate::error::{EditorError, Result};
use crate::highlight::StyleId;

pub const CONFIG_ENV: &str = "KILN_CONFIG";
pub const CONFIG_FILE: &str = "kiln.toml";

const MAX_TAB_SIZE: usize = 16;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorSettings {
    pub tab_size: usize,
    pub use_spaces: bool,
    pub use_system_clipboard: bool,
    pub autosave_interval_secs: u64,
    /// Undo history cap; absent or 0 keeps everything.
    pub undo_limit: Option<usize>,
    pub command_timeout_secs: u64,
    /// Lint argv per language. The file to check is appended.
    pub lint_command: BTreeMap<String, Vec<String>>,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            tab_size: 4,
            use_spaces: true,
            use_system_clipboard: true,
            autosave_interval_secs: 60,
            undo_limit: None,
            command_timeout_secs: 30,
            lint_command: BTreeMap::new(),
        }
    }
}

impl EditorSettings {
    #[must_use]
    pub const fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }

    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub editor: EditorSettings,
    /// Action name → key string. Actions not listed keep their default key.
    pub keybindings: BTreeMap<String, String>,
    /// Style name → style spec (`"bold yellow"`, `"black on red"`).
    pub colors: BTreeMap<String, String>,
    /// Language → icon shown in the status line.
    pub file_icons: BTreeMap<String, String>,
    /// Language → file extensions (without the dot).
    pub supported_formats: BTreeMap<String, Vec<String>>,
}

/// On-disk shape: every table optional and merged over the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    editor: EditorSettings,
    keybindings: BTreeMap<String, String>,
    colors: BTreeMap<String, String>,
    file_icons: BTreeMap<String, String>,
    supported_formats: BTreeMap<String, Vec<String>>,
}

fn string_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn default_colors() -> BTreeMap<String, String> {
    string_map(&[
        ("default", "default"),
        ("comment", "blue"),
        ("keyword", "green"),
        ("string", "magenta"),
        ("number", "yellow"),
        ("function", "cyan"),
        ("type", "yellow"),
        ("constant", "magenta"),
        ("decorator", "cyan"),
        ("operator", "white"),
        ("line_number", "yellow"),
        ("status", "bold bright_white"),
        ("message", "default"),
        ("error", "bold black on red"),
        ("search_highlight", "black on yellow"),
        ("selection", "reverse"),
        ("matching_bracket", "reverse"),
    ])
}

fn default_icons() -> BTreeMap<String, String> {
    string_map(&[
        ("python", "🐍"),
        ("javascript", "📜"),
        ("rust", "🦀"),
        ("html", "🌐"),
        ("css", "🎨"),
        ("shell", "🐚"),
        ("toml", "⚙"),
        ("text", "📝"),
    ])
}

fn default_formats() -> BTreeMap<String, Vec<String>> {
    let formats: &[(&str, &[&str])] = &[
        ("python", &["py", "pyw"]),
        ("javascript", &["js", "mjs", "cjs", "jsx"]),
        ("typescript", &["ts", "tsx"]),
        ("rust", &["rs"]),
        ("c", &["c", "h"]),
        ("cpp", &["cpp", "cc", "hpp"]),
        ("go", &["go"]),
        ("java", &["java"]),
        ("shell", &["sh", "bash"]),
        ("toml", &["toml"]),
        ("yaml", &["yaml", "yml"]),
        ("html", &["html", "htm"]),
        ("css", &["css"]),
        ("text", &["txt"]),
    ];
    formats
        .iter()
        .map(|(lang, exts)| {
            (
                (*lang).to_string(),
                exts.iter().map(|e| (*e).to_string()).collect(),
            )
        })
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            editor: EditorSettings::default(),
            keybindings: BTreeMap::new(),
            colors: default_colors(),
            file_icons: default_icons(),
            supported_formats: default_formats(),
        }
    }
}

impl Config {
    /// Parse TOML text and merge it over the defaults.
    ///
    /// # Errors
    ///
    /// [`EditorError::Config`] for malformed TOML or wrongly typed values.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|e| EditorError::Config(e.message().to_string()))?;

        let mut config = Self {
            editor: file.editor,
            ..Self::default()
        };
        config.keybindings.extend(file.keybindings);
        config.colors.extend(file.colors);
        config.file_icons.extend(file.file_icons);
        config.supported_formats.extend(file.supported_formats);

        let tab = config.editor.tab_size;
        if !(1..=MAX_TAB_SIZE).contains(&tab) {
            config.editor.tab_size = tab.clamp(1, MAX_TAB_SIZE);
            tracing::warn!(target: "kiln::io", tab_size = tab, "tab_size out of range; clamped");
        }
        Ok(config)
    }

    /// Read and parse one file.
    ///
    /// # Errors
    ///
    /// [`EditorError::Io`] when the file cannot be read, otherwise as for
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| EditorError::io(path, e))?;
        Self::from_toml_str(&text).map_err(|e| match e {
            EditorError::Config(msg) => EditorError::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Where the config is looked for: `$KILN_CONFIG`, else `./kiln.toml`.
    #[must_use]
    pub fn path() -> PathBuf {
        env::var_os(CONFIG_ENV).map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from)
    }

    /// Load the config, falling back to the defaults on any failure. The
    /// failure is logged and returned for a one-time status message.
    #[must_use]
    pub fn load() -> (Self, Option<EditorError>) {
        let path = Self::path();
        match Self::load_from(&path) {
            Ok(config) => {
                tracing::info!(target: "kiln::io", path = %path.display(), "config loaded");
                (config, None)
            }
            Err(e) => {
                tracing::warn!(target: "kiln::io", path = %path.display(), error = %e, "using default config");
                let err = match e {
                    EditorError::Io { path, source } => {
                        EditorError::Config(format!("{}: {source}; using defaults", path.display()))
                    }
                    other => other,
                };
                (Self::default(), Some(err))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Theme
// ---------------------------------------------------------------------------

/// Resolved [`Style`] for every [`StyleId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    styles: [Style; StyleId::ALL.len()],
}

impl Theme {
    /// Resolve `[colors]`. Unknown style names and unparsable specs are
    /// logged and skipped; the style keeps its built-in default.
    #[must_use]
    pub fn from_colors(colors: &BTreeMap<String, String>) -> Self {
        let defaults = default_colors();
        let mut styles = [Style::DEFAULT; StyleId::ALL.len()];

        for id in StyleId::ALL {
            let builtin = defaults
                .get(id.name())
                .map(String::as_str)
                .and_then(Style::parse)
                .unwrap_or(Style::DEFAULT);
            styles[id as usize] = match colors.get(id.name()) {
                Some(spec) => Style::parse(spec).unwrap_or_else(|| {
                    tracing::warn!(target: "kiln::io", style = id.name(), %spec, "bad color spec");
                    builtin
                }),
                None => builtin,
            };
        }
        for name in colors.keys() {
            if StyleId::from_name(name).is_none() {
                tracing::debug!(target: "kiln::io", style = %name, "color for unknown style ignored");
            }
        }
        Self { styles }
    }

    #[must_use]
    pub const fn style(&self, id: StyleId) -> Style {
        self.styles[id as usize]
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_colors(&default_colors())
    }
}

// ---------------------------------------------------------------------------
// EditorContext
// ---------------------------------------------------------------------------

/// Everything derived from the config, built once and handed to each
/// component at construction.
#[derive(Debug, Clone)]
pub struct EditorContext {
    pub config: Config,
    pub keymap: Keymap,
    pub theme: Theme,
}

impl EditorContext {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let keymap = Keymap::from_bindings(&config.keybindings);
        let theme = Theme::from_colors(&config.colors);
        Self {
            config,
            keymap,
            theme,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &EditorSettings {
        &self.config.editor
    }

    /// Language of `path` by extension; `"text"` when nothing matches.
    #[must_use]
    pub fn language_for(&self, path: Option<&Path>) -> String {
        let ext = path
            .and_then(Path::extension)
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);
        ext.and_then(|ext| {
            self.config
                .supported_formats
                .iter()
                .find(|(_, exts)| exts.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
                .map(|(lang, _)| lang.clone())
        })
        .unwrap_or_else(|| "text".to_string())
    }

    #[must_use]
    pub fn icon_for(&self, language: &str) -> &str {
        self.config
            .file_icons
            .get(language)
            .or_else(|| self.config.file_icons.get("text"))
            .map_or("", String::as_str)
    }

    /// The lint argv configured for `language`, if any.
    #[must_use]
    pub fn lint_command(&self, language: &str) -> Option<&[String]> {
        self.config
            .editor
            .lint_command
            .get(language)
            .map(Vec::as_slice)
            .filter(|argv| !argv.is_empty())
    }
}

impl Default for EditorContext {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
