use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use directories::BaseDirs;
use serde::de::Deserializer;
use serde::Deserialize;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_NAME: &str = "supercontacts";
pub const DEFAULT_JOKE_ENDPOINT: &str = "https://api.chucknorris.io/jokes/random";
const DEFAULT_JOKE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    /// Where the configuration was read from, if a file existed
    pub config_path: Option<PathBuf>,
    /// Seed file for the in-memory store
    pub contacts: Option<PathBuf>,
    pub joke: JokeConfig,
    pub form: FormConfig,
    pub log: LogConfig,
    pub keys: Keys,
    pub ui: UiConfig,
}

impl Default for Config {
    fn default() -> Self {
        ConfigFile::default().into_config(None)
    }
}

#[derive(Debug, Clone)]
pub struct JokeConfig {
    pub endpoint: String,
    /// Request timeout in seconds, 0 disables it
    pub timeout_secs: u64,
}

impl JokeConfig {
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }
}

impl Default for JokeConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_JOKE_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_JOKE_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FormConfig {
    /// Reset name and phone inputs after a successful add
    pub clear_on_submit: bool,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    pub dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub colors: UiColors,
}

#[derive(Debug, Clone)]
pub struct UiColors {
    pub border: RgbColor,
    pub selection_bg: RgbColor,
    pub selection_fg: RgbColor,
    pub separator: RgbColor,
    pub status_fg: RgbColor,
    pub status_bg: RgbColor,
    pub favorite: RgbColor,
    pub disabled: RgbColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Expand ~ to home directory in paths
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = home::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

// =============================================================================
// Key Bindings - Context-aware with multiple bindings per action
// =============================================================================

/// All key bindings organized by context
#[derive(Debug, Clone)]
pub struct Keys {
    /// Work in every context
    pub global: GlobalKeys,
    /// While the search box has focus
    pub search: SearchKeys,
    /// While the contact table has focus
    pub table: TableKeys,
    /// While the name or phone input has focus
    pub form: FormKeys,
}

#[derive(Debug, Clone)]
pub struct GlobalKeys {
    pub help: Vec<String>,
    pub joke: Vec<String>,
    pub focus_next: Vec<String>,
    pub focus_prev: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SearchKeys {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TableKeys {
    pub quit: Vec<String>,
    pub search: Vec<String>,
    pub add: Vec<String>,
    pub next: Vec<String>,
    pub prev: Vec<String>,
    pub page_down: Vec<String>,
    pub page_up: Vec<String>,
    pub favorite: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FormKeys {
    pub submit: Vec<String>,
    pub cancel: Vec<String>,
}

impl Default for Keys {
    fn default() -> Self {
        Self {
            global: GlobalKeys::default(),
            search: SearchKeys::default(),
            table: TableKeys::default(),
            form: FormKeys::default(),
        }
    }
}

impl Default for GlobalKeys {
    fn default() -> Self {
        Self {
            help: vec!["F1".into()],
            joke: vec!["F2".into()],
            focus_next: vec!["Tab".into()],
            focus_prev: vec!["Backtab".into()],
        }
    }
}

impl Default for SearchKeys {
    fn default() -> Self {
        Self {
            confirm: vec!["Enter".into(), "Down".into()],
            cancel: vec!["Escape".into()],
        }
    }
}

impl Default for TableKeys {
    fn default() -> Self {
        Self {
            quit: vec!["q".into()],
            search: vec!["/".into()],
            add: vec!["a".into()],
            next: vec!["j".into(), "Down".into()],
            prev: vec!["k".into(), "Up".into()],
            page_down: vec!["PageDown".into()],
            page_up: vec!["PageUp".into()],
            favorite: vec!["f".into(), "Space".into(), "Enter".into()],
        }
    }
}

impl Default for FormKeys {
    fn default() -> Self {
        Self {
            submit: vec!["Enter".into()],
            cancel: vec!["Escape".into()],
        }
    }
}

// =============================================================================
// Serde deserialization types (support both single string and array)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum KeyBinding {
    Single(String),
    Multiple(Vec<String>),
}

impl KeyBinding {
    fn into_vec(self) -> Vec<String> {
        match self {
            KeyBinding::Single(s) => vec![s],
            KeyBinding::Multiple(v) => v,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct KeysFile {
    global: GlobalKeysFile,
    search: SearchKeysFile,
    table: TableKeysFile,
    form: FormKeysFile,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GlobalKeysFile {
    help: KeyBinding,
    joke: KeyBinding,
    focus_next: KeyBinding,
    focus_prev: KeyBinding,
}

impl Default for GlobalKeysFile {
    fn default() -> Self {
        let defaults = GlobalKeys::default();
        Self {
            help: KeyBinding::Multiple(defaults.help),
            joke: KeyBinding::Multiple(defaults.joke),
            focus_next: KeyBinding::Multiple(defaults.focus_next),
            focus_prev: KeyBinding::Multiple(defaults.focus_prev),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SearchKeysFile {
    confirm: KeyBinding,
    cancel: KeyBinding,
}

impl Default for SearchKeysFile {
    fn default() -> Self {
        let defaults = SearchKeys::default();
        Self {
            confirm: KeyBinding::Multiple(defaults.confirm),
            cancel: KeyBinding::Multiple(defaults.cancel),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct TableKeysFile {
    quit: KeyBinding,
    search: KeyBinding,
    add: KeyBinding,
    next: KeyBinding,
    prev: KeyBinding,
    page_down: KeyBinding,
    page_up: KeyBinding,
    favorite: KeyBinding,
}

impl Default for TableKeysFile {
    fn default() -> Self {
        let defaults = TableKeys::default();
        Self {
            quit: KeyBinding::Multiple(defaults.quit),
            search: KeyBinding::Multiple(defaults.search),
            add: KeyBinding::Multiple(defaults.add),
            next: KeyBinding::Multiple(defaults.next),
            prev: KeyBinding::Multiple(defaults.prev),
            page_down: KeyBinding::Multiple(defaults.page_down),
            page_up: KeyBinding::Multiple(defaults.page_up),
            favorite: KeyBinding::Multiple(defaults.favorite),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FormKeysFile {
    submit: KeyBinding,
    cancel: KeyBinding,
}

impl Default for FormKeysFile {
    fn default() -> Self {
        let defaults = FormKeys::default();
        Self {
            submit: KeyBinding::Multiple(defaults.submit),
            cancel: KeyBinding::Multiple(defaults.cancel),
        }
    }
}

impl From<KeysFile> for Keys {
    fn from(file: KeysFile) -> Self {
        Self {
            global: GlobalKeys {
                help: file.global.help.into_vec(),
                joke: file.global.joke.into_vec(),
                focus_next: file.global.focus_next.into_vec(),
                focus_prev: file.global.focus_prev.into_vec(),
            },
            search: SearchKeys {
                confirm: file.search.confirm.into_vec(),
                cancel: file.search.cancel.into_vec(),
            },
            table: TableKeys {
                quit: file.table.quit.into_vec(),
                search: file.table.search.into_vec(),
                add: file.table.add.into_vec(),
                next: file.table.next.into_vec(),
                prev: file.table.prev.into_vec(),
                page_down: file.table.page_down.into_vec(),
                page_up: file.table.page_up.into_vec(),
                favorite: file.table.favorite.into_vec(),
            },
            form: FormKeys {
                submit: file.form.submit.into_vec(),
                cancel: file.form.cancel.into_vec(),
            },
        }
    }
}

// =============================================================================
// Key binding validation
// =============================================================================

/// Normalize a key binding string to a canonical form for collision detection.
/// Single characters preserve case (since 'M' means Shift+m, different from 'm').
/// Multi-character key names are case-insensitive (Enter, ENTER, enter are the same).
fn normalize_binding(binding: &str) -> String {
    let trimmed = binding.trim();
    if trimmed.chars().count() == 1 {
        trimmed.to_string()
    } else {
        match trimmed.to_ascii_lowercase().as_str() {
            "esc" => "escape".to_string(),
            "shift+tab" => "backtab".to_string(),
            "page_up" => "pageup".to_string(),
            "page_down" => "pagedown".to_string(),
            other => other.to_string(),
        }
    }
}

/// Check for collisions within a single context. Global bindings take part
/// in every context since they are matched first.
fn check_context_collisions(bindings: &[(&str, &[String])], context_name: &str) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();

    for (action_name, keys) in bindings {
        for key in *keys {
            let normalized = normalize_binding(key);
            if normalized.is_empty() {
                continue;
            }
            if let Some(existing_action) = seen.get(&normalized) {
                bail!(
                    "key binding collision in [keys.{}]: '{}' is bound to both '{}' and '{}'",
                    context_name,
                    key,
                    existing_action,
                    action_name
                );
            }
            seen.insert(normalized, action_name);
        }
    }

    Ok(())
}

fn validate_key_bindings(keys: &Keys) -> Result<()> {
    let global: [(&str, &[String]); 4] = [
        ("global.help", &keys.global.help),
        ("global.joke", &keys.global.joke),
        ("global.focus_next", &keys.global.focus_next),
        ("global.focus_prev", &keys.global.focus_prev),
    ];

    check_context_collisions(&global, "global")?;

    let mut search = global.to_vec();
    search.extend([
        ("confirm", keys.search.confirm.as_slice()),
        ("cancel", keys.search.cancel.as_slice()),
    ]);
    check_context_collisions(&search, "search")?;

    let mut table = global.to_vec();
    table.extend([
        ("quit", keys.table.quit.as_slice()),
        ("search", keys.table.search.as_slice()),
        ("add", keys.table.add.as_slice()),
        ("next", keys.table.next.as_slice()),
        ("prev", keys.table.prev.as_slice()),
        ("page_down", keys.table.page_down.as_slice()),
        ("page_up", keys.table.page_up.as_slice()),
        ("favorite", keys.table.favorite.as_slice()),
    ]);
    check_context_collisions(&table, "table")?;

    let mut form = global.to_vec();
    form.extend([
        ("submit", keys.form.submit.as_slice()),
        ("cancel", keys.form.cancel.as_slice()),
    ]);
    check_context_collisions(&form, "form")?;

    Ok(())
}

// =============================================================================
// Config file structure
// =============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    contacts: Option<PathBuf>,
    joke: JokeFile,
    form: FormFile,
    log: LogFile,
    keys: KeysFile,
    ui: UiFile,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct JokeFile {
    endpoint: String,
    timeout_secs: u64,
}

impl Default for JokeFile {
    fn default() -> Self {
        let defaults = JokeConfig::default();
        Self {
            endpoint: defaults.endpoint,
            timeout_secs: defaults.timeout_secs,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FormFile {
    clear_on_submit: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct LogFile {
    level: String,
    dir: Option<PathBuf>,
}

impl Default for LogFile {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

impl ConfigFile {
    fn into_config(self, config_path: Option<PathBuf>) -> Config {
        let endpoint = self.joke.endpoint.trim();
        let endpoint = if endpoint.is_empty() {
            DEFAULT_JOKE_ENDPOINT.to_string()
        } else {
            endpoint.to_string()
        };

        let log_dir = self
            .log
            .dir
            .map(|dir| expand_tilde(&dir))
            .unwrap_or_else(default_log_dir);

        Config {
            config_path,
            contacts: self.contacts.map(|path| expand_tilde(&path)),
            joke: JokeConfig {
                endpoint,
                timeout_secs: self.joke.timeout_secs,
            },
            form: FormConfig {
                clear_on_submit: self.form.clear_on_submit,
            },
            log: LogConfig {
                level: self.log.level,
                dir: log_dir,
            },
            keys: self.keys.into(),
            ui: self.ui.into(),
        }
    }
}

fn config_root() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine base directories")?;
    Ok(base.config_dir().join(APP_NAME))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_root()?.join(CONFIG_FILE_NAME))
}

fn default_log_dir() -> PathBuf {
    BaseDirs::new()
        .map(|base| base.data_dir().join(APP_NAME).join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join(APP_NAME).join("logs"))
}

/// Load configuration. An explicitly given path must exist; the default
/// location may be absent, in which case defaults apply.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("configuration file not found at {}", path.display());
            }
            path.to_path_buf()
        }
        None => {
            let path = config_path()?;
            if !path.exists() {
                return Ok(Config::default());
            }
            path
        }
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration file at {}", path.display()))?;
    let config = parse(&raw).with_context(|| format!("invalid configuration in {}", path.display()))?;
    Ok(Config {
        config_path: Some(path),
        ..config
    })
}

/// Parse configuration from TOML text.
pub fn parse(raw: &str) -> Result<Config> {
    let value: toml::Value = toml::from_str(raw).context("failed to parse configuration as TOML")?;

    warn_unknown_keys(&value);

    let cfg_file: ConfigFile = value
        .try_into()
        .context("failed to deserialize configuration")?;
    let config = cfg_file.into_config(None);

    validate_key_bindings(&config.keys)?;
    Ok(config)
}

// =============================================================================
// Unknown key warnings
// =============================================================================

fn warn_unknown_keys(value: &toml::Value) {
    let Some(table) = value.as_table() else {
        return;
    };

    warn_unknown_in_context(value, "", &["contacts", "joke", "form", "log", "keys", "ui"]);

    if let Some(joke) = table.get("joke") {
        warn_unknown_in_context(joke, "joke", &["endpoint", "timeout_secs"]);
    }
    if let Some(form) = table.get("form") {
        warn_unknown_in_context(form, "form", &["clear_on_submit"]);
    }
    if let Some(log) = table.get("log") {
        warn_unknown_in_context(log, "log", &["level", "dir"]);
    }
    if let Some(keys) = table.get("keys") {
        warn_unknown_keys_section(keys);
    }
    if let Some(ui) = table.get("ui") {
        warn_unknown_in_context(ui, "ui", &["colors"]);
        if let Some(colors) = ui.get("colors") {
            warn_unknown_in_context(
                colors,
                "ui.colors",
                &[
                    "border",
                    "selection_bg",
                    "selection_fg",
                    "separator",
                    "status_fg",
                    "status_bg",
                    "favorite",
                    "disabled",
                ],
            );
        }
    }
}

fn warn_unknown_keys_section(value: &toml::Value) {
    let Some(table) = value.as_table() else {
        return;
    };

    let known_contexts = HashSet::from(["global", "search", "table", "form"]);
    for key in table.keys() {
        if !known_contexts.contains(key.as_str()) {
            eprintln!("warning: unknown key context `keys.{}`", key);
        }
    }

    if let Some(ctx) = table.get("global") {
        warn_unknown_in_context(ctx, "keys.global", &["help", "joke", "focus_next", "focus_prev"]);
    }
    if let Some(ctx) = table.get("search") {
        warn_unknown_in_context(ctx, "keys.search", &["confirm", "cancel"]);
    }
    if let Some(ctx) = table.get("table") {
        warn_unknown_in_context(
            ctx,
            "keys.table",
            &["quit", "search", "add", "next", "prev", "page_down", "page_up", "favorite"],
        );
    }
    if let Some(ctx) = table.get("form") {
        warn_unknown_in_context(ctx, "keys.form", &["submit", "cancel"]);
    }
}

fn warn_unknown_in_context(value: &toml::Value, context: &str, known: &[&str]) {
    let Some(table) = value.as_table() else {
        return;
    };
    for key in table.keys() {
        if !known.contains(&key.as_str()) {
            if context.is_empty() {
                eprintln!("warning: unknown configuration key `{}`", key);
            } else {
                eprintln!("warning: unknown configuration key `{}.{}`", context, key);
            }
        }
    }
}

// =============================================================================
// UI config types
// =============================================================================

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct UiFile {
    colors: UiColorsFile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct UiColorsFile {
    border: RgbColor,
    selection_bg: RgbColor,
    selection_fg: RgbColor,
    separator: RgbColor,
    status_fg: RgbColor,
    status_bg: RgbColor,
    favorite: RgbColor,
    disabled: RgbColor,
}

impl Default for UiColorsFile {
    fn default() -> Self {
        Self {
            border: RgbColor::new(255, 165, 0),
            selection_bg: RgbColor::new(255, 165, 0),
            selection_fg: RgbColor::new(0, 0, 0),
            separator: RgbColor::new(255, 165, 0),
            status_fg: RgbColor::new(255, 165, 0),
            status_bg: RgbColor::new(0, 0, 0),
            favorite: RgbColor::new(255, 215, 0),
            disabled: RgbColor::new(96, 96, 96),
        }
    }
}

impl From<UiFile> for UiConfig {
    fn from(file: UiFile) -> Self {
        let c = file.colors;
        Self {
            colors: UiColors {
                border: c.border,
                selection_bg: c.selection_bg,
                selection_fg: c.selection_fg,
                separator: c.separator,
                status_fg: c.status_fg,
                status_bg: c.status_bg,
                favorite: c.favorite,
                disabled: c.disabled,
            },
        }
    }
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl<'de> serde::Deserialize<'de> for RgbColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Array([u8; 3]),
            Map { r: u8, g: u8, b: u8 },
        }

        let helper = Helper::deserialize(deserializer)?;
        let (r, g, b) = match helper {
            Helper::Array(values) => (values[0], values[1], values[2]),
            Helper::Map { r, g, b } => (r, g, b),
        };
        Ok(RgbColor { r, g, b })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.joke.endpoint, DEFAULT_JOKE_ENDPOINT);
        assert_eq!(config.joke.timeout(), Some(Duration::from_secs(10)));
        assert!(!config.form.clear_on_submit);
        assert!(config.contacts.is_none());
        assert_eq!(config.log.level, "info");
        assert_eq!(config.keys.table.quit, vec!["q".to_string()]);
    }

    #[test]
    fn test_full_config() {
        let raw = r#"
contacts = "/tmp/contacts.toml"

[joke]
endpoint = "http://localhost:8080/joke"
timeout_secs = 0

[form]
clear_on_submit = true

[log]
level = "debug"
dir = "/tmp/logs"

[keys.table]
quit = "Q"
favorite = ["s", "Enter"]

[ui.colors]
border = [1, 2, 3]
favorite = { r = 4, g = 5, b = 6 }
"#;
        let config = parse(raw).unwrap();
        assert_eq!(config.contacts, Some(PathBuf::from("/tmp/contacts.toml")));
        assert_eq!(config.joke.endpoint, "http://localhost:8080/joke");
        assert_eq!(config.joke.timeout(), None);
        assert!(config.form.clear_on_submit);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.dir, PathBuf::from("/tmp/logs"));
        assert_eq!(config.keys.table.quit, vec!["Q".to_string()]);
        assert_eq!(
            config.keys.table.favorite,
            vec!["s".to_string(), "Enter".to_string()]
        );
        // Untouched bindings keep their defaults
        assert_eq!(config.keys.table.next, TableKeys::default().next);
        assert_eq!(config.ui.colors.border, RgbColor::new(1, 2, 3));
        assert_eq!(config.ui.colors.favorite, RgbColor::new(4, 5, 6));
    }

    #[test]
    fn test_blank_endpoint_falls_back_to_default() {
        let config = parse("[joke]\nendpoint = \"  \"\n").unwrap();
        assert_eq!(config.joke.endpoint, DEFAULT_JOKE_ENDPOINT);
    }

    #[test]
    fn test_collision_within_context_is_rejected() {
        let err = parse("[keys.table]\nquit = \"j\"\n").unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("[keys.table]"), "{message}");
        assert!(message.contains("'quit'"), "{message}");
    }

    #[test]
    fn test_collision_with_global_binding_is_rejected() {
        let err = parse("[keys.form]\nsubmit = \"tab\"\n").unwrap_err();
        assert!(format!("{:#}", err).contains("global.focus_next"));
    }

    #[test]
    fn test_same_key_in_different_contexts_is_allowed() {
        // Enter confirms search, toggles favorite and submits the form
        assert!(validate_key_bindings(&Keys::default()).is_ok());
    }

    #[test]
    fn test_normalize_binding() {
        assert_eq!(normalize_binding("M"), "M");
        assert_eq!(normalize_binding("m"), "m");
        assert_eq!(normalize_binding("ENTER"), "enter");
        assert_eq!(normalize_binding("Esc"), "escape");
        assert_eq!(normalize_binding("Shift+Tab"), "backtab");
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_explicit_file_records_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[form]\nclear_on_submit = true\n").unwrap();
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.config_path.as_deref(), Some(path.as_path()));
        assert!(config.form.clear_on_submit);
    }
}
