use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::filter::{parse_list, FilterMode, FilterSpec};
use crate::headings::NumberingScheme;
use crate::retry::{Backoff, Fallback, RetryPolicy};
use crate::tree::Separator;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub count: CountConfig,
    #[serde(default)]
    pub wipe: WipeConfig,
    #[serde(default)]
    pub headings: HeadingsConfig,
    #[serde(default)]
    pub db: DbConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TreeConfig {
    #[serde(default = "default_tree_ignored_files")]
    pub ignored_files: Vec<String>,
    #[serde(default = "default_ignored_folders")]
    pub ignored_folders: Vec<String>,
    #[serde(default)]
    pub ignored_extensions: Vec<String>,
    #[serde(default = "default_true")]
    pub hide_dot_entries: bool,
    #[serde(default)]
    pub separator: Separator,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            ignored_files: default_tree_ignored_files(),
            ignored_folders: default_ignored_folders(),
            ignored_extensions: Vec::new(),
            hide_dot_entries: true,
            separator: Separator::default(),
        }
    }
}

fn default_tree_ignored_files() -> Vec<String> {
    vec![
        "desktop.ini".to_string(),
        ".DS_Store".to_string(),
        "_folder_tree.txt".to_string(),
        ".gitattributes".to_string(),
    ]
}

fn default_ignored_folders() -> Vec<String> {
    vec![".git".to_string()]
}

fn default_true() -> bool {
    true
}

/// Default filter applied by `clerk list` when no filter flags are given.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ListingConfig {
    #[serde(default)]
    pub mode: FilterMode,
    #[serde(default)]
    pub extensions: String,
    #[serde(default)]
    pub names: String,
    #[serde(default)]
    pub full_names: String,
}

impl ListingConfig {
    pub fn filter(&self) -> FilterSpec {
        FilterSpec::from_lists(&self.extensions, &self.names, &self.full_names, self.mode)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CountConfig {
    #[serde(default = "default_ignored_folders")]
    pub ignored_folders: Vec<String>,
    #[serde(default = "default_count_ignored_files")]
    pub ignored_files: Vec<String>,
}

impl Default for CountConfig {
    fn default() -> Self {
        Self {
            ignored_folders: default_ignored_folders(),
            ignored_files: default_count_ignored_files(),
        }
    }
}

fn default_count_ignored_files() -> Vec<String> {
    vec!["desktop.ini".to_string(), ".gitattributes".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct WipeConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default)]
    pub backoff: Backoff,
    #[serde(default)]
    pub fallback: Fallback,
    #[serde(default = "default_true")]
    pub use_trash: bool,
    #[serde(default)]
    pub trash_dir: Option<PathBuf>,
}

impl Default for WipeConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
            backoff: Backoff::default(),
            fallback: Fallback::default(),
            use_trash: true,
            trash_dir: None,
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_delay_ms() -> u64 {
    100
}

impl WipeConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: Duration::from_millis(self.delay_ms),
            backoff: self.backoff,
            fallback: self.fallback,
        }
    }

    /// Trash directory from config, or `<data_dir>/desk-clerk/trash`.
    pub fn resolved_trash_dir(&self) -> Option<PathBuf> {
        self.trash_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("desk-clerk").join("trash")))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HeadingsConfig {
    #[serde(default)]
    pub scheme: NumberingScheme,
    #[serde(default = "default_heading_pattern")]
    pub pattern: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for HeadingsConfig {
    fn default() -> Self {
        Self {
            scheme: NumberingScheme::default(),
            pattern: default_heading_pattern(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_heading_pattern() -> String {
    "*.docx".to_string()
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_extensions")]
    pub extensions: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            extensions: default_db_extensions(),
        }
    }
}

fn default_db_extensions() -> String {
    ".sqlite, .sqlite3, .db".to_string()
}

impl DbConfig {
    pub fn extension_list(&self) -> Vec<String> {
        parse_list(&self.extensions)
    }
}

impl Config {
    /// Defaults for every section, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.wipe.max_attempts == 0 {
        anyhow::bail!("wipe.max_attempts must be >= 1");
    }

    if config.wipe.delay_ms > 60_000 {
        anyhow::bail!("wipe.delay_ms must be <= 60000");
    }

    if config.headings.pattern.trim().is_empty() {
        anyhow::bail!("headings.pattern must not be empty");
    }

    if config.db.extension_list().is_empty() {
        anyhow::bail!("db.extensions must list at least one extension");
    }

    Ok(())
}
