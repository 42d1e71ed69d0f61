//! Configuration management
//!
//! Settings live in settings.json inside the data directory:
//! ```json
//! {
//!   "import": { "allowDuplicates": true, "headerScanRows": 30, "commitMode": "atomic" },
//!   "accountAliases": { "main": "itau-checking-0001" }
//! }
//! ```
//! Keys this crate does not manage are preserved on save.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::services::import::{CommitMode, ImportOptions, DEFAULT_SCAN_ROWS};

/// Env var overriding `import.allowDuplicates`
pub const ALLOW_DUPLICATES_ENV: &str = "RECONCILE_ALLOW_DUPLICATES";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    import: ImportSettings,
    #[serde(default)]
    account_aliases: HashMap<String, String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportSettings {
    #[serde(default = "default_true")]
    allow_duplicates: bool,
    #[serde(default = "default_scan_rows")]
    header_scan_rows: usize,
    #[serde(default)]
    commit_mode: CommitMode,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            allow_duplicates: true,
            header_scan_rows: DEFAULT_SCAN_ROWS,
            commit_mode: CommitMode::default(),
            other: HashMap::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_scan_rows() -> usize {
    DEFAULT_SCAN_ROWS
}

/// Parse a boolean env value; `None` for anything unrecognized
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim() {
        "true" | "1" | "yes" | "TRUE" | "YES" => Some(true),
        "false" | "0" | "no" | "FALSE" | "NO" => Some(false),
        _ => None,
    }
}

/// Engine configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    /// Permissive mode; `false` means strict deduplication by default
    pub allow_duplicates: bool,
    pub header_scan_rows: usize,
    pub commit_mode: CommitMode,
    pub account_aliases: HashMap<String, String>,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allow_duplicates: true,
            header_scan_rows: DEFAULT_SCAN_ROWS,
            commit_mode: CommitMode::default(),
            account_aliases: HashMap::new(),
            _raw_settings: SettingsFile::default(),
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// A missing or unreadable settings file yields defaults.
    /// `RECONCILE_ALLOW_DUPLICATES` overrides the file.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        let allow_duplicates = std::env::var(ALLOW_DUPLICATES_ENV)
            .ok()
            .as_deref()
            .and_then(parse_flag)
            .unwrap_or(raw.import.allow_duplicates);

        Ok(Self {
            allow_duplicates,
            header_scan_rows: raw.import.header_scan_rows.max(1),
            commit_mode: raw.import.commit_mode,
            account_aliases: raw.account_aliases.clone(),
            _raw_settings: raw,
        })
    }

    /// Save config to the data directory, preserving unmanaged settings
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join("settings.json");

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        settings.import.allow_duplicates = self.allow_duplicates;
        settings.import.header_scan_rows = self.header_scan_rows;
        settings.import.commit_mode = self.commit_mode;
        settings.account_aliases = self.account_aliases.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// Map an alias to its account id; unknown names pass through
    pub fn resolve_account(&self, name: &str) -> String {
        let name = name.trim();
        self.account_aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Point `alias` at `account`, replacing any previous target
    pub fn set_alias(&mut self, alias: &str, account: &str) -> Result<()> {
        let alias = alias.trim();
        let account = account.trim();
        if alias.is_empty() || account.is_empty() {
            anyhow::bail!("Alias and account id must not be empty");
        }
        self.account_aliases.insert(alias.to_string(), account.to_string());
        Ok(())
    }

    /// Drop an alias; returns the account it pointed at
    pub fn remove_alias(&mut self, alias: &str) -> Option<String> {
        self.account_aliases.remove(alias.trim())
    }

    /// Commit options for `account` using the configured defaults
    pub fn import_options(&self, account: &str) -> ImportOptions {
        ImportOptions {
            account: self.resolve_account(account),
            allow_duplicates: self.allow_duplicates,
            commit_mode: self.commit_mode,
        }
    }
}
