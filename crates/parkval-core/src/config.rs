//! Configuration resolution for parkval.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/parkval/settings.json)
//! 3. Project config (.parkval/settings.json)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binaries)
//!
//! Config files are deep-merged, so a project file that only sets
//! `terminal.port` keeps the host from the global file.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Complete parkval configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub terminal: TerminalConfig,
    pub request: RequestConfig,
    pub notification: NotificationConfig,
    pub log_level: String,
    /// Environment overrides that did not parse and were left at their
    /// previous value. Filled in before logging is up, so the caller reports them.
    #[serde(skip)]
    pub ignored_env: Vec<IgnoredEnv>,
}

/// An environment variable whose value was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoredEnv {
    pub key: &'static str,
    pub value: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            terminal: TerminalConfig::default(),
            request: RequestConfig::default(),
            notification: NotificationConfig::default(),
            log_level: "info".to_string(),
            ignored_env: Vec::new(),
        }
    }
}

/// Where the validation terminal server lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub host: String,
    pub port: u16,
    /// Bound on DNS resolution plus TCP connect (milliseconds).
    pub connect_timeout_ms: u64,
    /// Bound on the whole send + receive cycle (milliseconds).
    pub exchange_timeout_ms: u64,
    /// Largest response length prefix accepted before the read is aborted.
    pub max_response_bytes: usize,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            connect_timeout_ms: 3_000,
            exchange_timeout_ms: 10_000,
            max_response_bytes: 10 * 4096,
        }
    }
}

impl TerminalConfig {
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub const fn exchange_timeout(&self) -> Duration {
        Duration::from_millis(self.exchange_timeout_ms)
    }
}

/// Defaults applied to every discount request built from this config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Fiscal document (CNPJ) sent in the header signature field.
    pub fiscal_signature: String,
    /// POS terminal number used when none is given on the command line.
    pub terminal_id: Option<u32>,
    /// Printer line width requested from the terminal.
    pub printer_line_len: u32,
    /// Reject fiscal signatures whose CNPJ check digits do not verify.
    pub validate_cnpj: bool,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            fiscal_signature: "04558054000173".to_string(),
            terminal_id: None,
            printer_line_len: 40,
            validate_cnpj: false,
        }
    }
}

/// Outbound notification of discount results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub url: String,
    pub timeout_secs: u64,
    /// Outbox database for notifications that could not be delivered.
    pub database_path: Option<PathBuf>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "http://localhost:8080".to_string(),
            timeout_secs: 5,
            database_path: None,
        }
    }
}

impl NotificationConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(project_dir: Option<&Path>) -> Result<Config> {
    let mut files = Vec::new();
    if let Some(global_path) = global_config_path() {
        files.push(global_path);
    }
    if let Some(dir) = project_dir {
        files.push(dir.join(".parkval").join("settings.json"));
    }
    resolve_config(&files, |key| std::env::var(key).ok())
}

/// Merge the given config files (missing files are skipped) over the
/// defaults, then apply environment overrides looked up through `env`.
pub fn resolve_config<F>(files: &[PathBuf], env: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut merged = serde_json::to_value(Config::default())?;

    for path in files {
        if path.exists() {
            let overlay = load_config_value(path)?;
            merge_json(&mut merged, overlay);
        }
    }

    let mut config: Config = serde_json::from_value(merged)?;

    apply_env_overrides(&mut config, env);

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("settings.json"))
}

/// Get the default path of the notification outbox database.
pub fn database_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("outbox.db"))
}

fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".parkval"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/parkval"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("parkval"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

fn load_config_value(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Recursively merge `overlay` into `base`. Objects merge key by key,
/// anything else replaces the base value.
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn apply_env_overrides<F>(config: &mut Config, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    let mut ignored = Vec::new();

    if let Some(port) = parse_env(&env, "PARKVAL_PORT", &mut ignored) {
        config.terminal.port = port;
    }
    if let Some(ms) = parse_env(&env, "PARKVAL_CONNECT_TIMEOUT_MS", &mut ignored) {
        config.terminal.connect_timeout_ms = ms;
    }
    if let Some(ms) = parse_env(&env, "PARKVAL_EXCHANGE_TIMEOUT_MS", &mut ignored) {
        config.terminal.exchange_timeout_ms = ms;
    }
    if let Some(id) = parse_env(&env, "PARKVAL_TERMINAL_ID", &mut ignored) {
        config.request.terminal_id = Some(id);
    }

    if let Some(val) = env("PARKVAL_HOST") {
        config.terminal.host = val;
    }
    if let Some(val) = env("PARKVAL_FISCAL_SIGNATURE") {
        config.request.fiscal_signature = val;
    }
    if let Some(val) = env("PARKVAL_NOTIFY_URL") {
        config.notification.url = val;
    }
    if let Some(val) = env("PARKVAL_LOG_LEVEL") {
        config.log_level = val;
    }
    config.ignored_env = ignored;
}

fn parse_env<F, T>(env: &F, key: &'static str, ignored: &mut Vec<IgnoredEnv>) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let value = env(key)?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            ignored.push(IgnoredEnv { key, value });
            None
        }
    }
}
