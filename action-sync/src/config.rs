//! # Sync Configuration
//!
//! Values are layered lowest precedence first: built-in defaults, an optional
//! TOML file, then environment variables. The CLI applies its flags on top.
//!
//! ## Environment Variables
//! - `NOTION_API_KEY`: task store integration token
//! - `NOTION_DATABASE_ID`: task store database id
//! - `ANTHROPIC_API_KEY`: extraction model API key
//! - `ACTIONSYNC_NOTES_DIR`: directory holding exported meeting notes
//! - `ACTIONSYNC_LOOKBACK_DAYS`: days before today to include (default: 1)
//! - `ACTIONSYNC_MODEL`: extraction model name
//! - `ACTIONSYNC_OWNER`: person whose action items are extracted

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::iter::Take;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub notes: NotesConfig,
    #[serde(default)]
    pub store: NotionConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub retry: RetryConfig
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesConfig {
    #[serde(default = "default_notes_dir")]
    pub directory: PathBuf,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    #[serde(default = "default_extension")]
    pub extension: String
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotionConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub database_id: String,
    #[serde(default = "default_notion_base_url")]
    pub base_url: String,
    #[serde(default = "default_notion_version")]
    pub notion_version: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Checkbox property that marks an item done.
    #[serde(default = "default_completion_property")]
    pub completion_property: String,
    #[serde(default = "default_store_timeout")]
    pub timeout_seconds: u64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    pub owner: Option<String>,
    #[serde(default = "default_extraction_timeout")]
    pub timeout_seconds: u64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64
}

fn default_notes_dir() -> PathBuf {
    PathBuf::from("~/Documents/granola-daily")
}

fn default_lookback_days() -> u32 {
    1
}

fn default_extension() -> String {
    "md".to_string()
}

fn default_notion_base_url() -> String {
    "https://api.notion.com/v1".to_string()
}

fn default_notion_version() -> String {
    "2022-06-28".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_completion_property() -> String {
    "status".to_string()
}

fn default_store_timeout() -> u64 {
    30
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_model() -> String {
    "claude-haiku-4-5-20251001".to_string()
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_extraction_timeout() -> u64 {
    120
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            directory: default_notes_dir(),
            lookback_days: default_lookback_days(),
            extension: default_extension()
        }
    }
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            database_id: String::new(),
            base_url: default_notion_base_url(),
            notion_version: default_notion_version(),
            page_size: default_page_size(),
            completion_property: default_completion_property(),
            timeout_seconds: default_store_timeout()
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_anthropic_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            owner: None,
            timeout_seconds: default_extraction_timeout()
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 10_000
        }
    }
}

impl RetryConfig {
    /// Exponential delays starting at `initial_backoff_ms`, doubling, capped.
    pub fn strategy(&self) -> Take<ExponentialBackoff> {
        ExponentialBackoff::from_millis(2)
            .factor((self.initial_backoff_ms / 2).max(1))
            .max_delay(Duration::from_millis(self.max_backoff_ms))
            .take(self.max_retries as usize)
    }
}

impl NotionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl ExtractionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl SyncConfig {
    /// Defaults, then `path` when given, then the environment.
    pub fn load(path: Option<&Path>) -> SyncResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_toml_file(&path)?,
                None => Self::default()
            }
        };
        config.apply_env()?;
        config.notes.directory = expand_home(&config.notes.directory);
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> SyncResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SyncError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> SyncResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn apply_env(&mut self) -> SyncResult<()> {
        if let Ok(key) = env::var("NOTION_API_KEY") {
            self.store.api_key = key;
        }
        if let Ok(id) = env::var("NOTION_DATABASE_ID") {
            self.store.database_id = id;
        }
        if let Ok(key) = env::var("ANTHROPIC_API_KEY") {
            self.extraction.api_key = key;
        }
        if let Ok(dir) = env::var("ACTIONSYNC_NOTES_DIR") {
            self.notes.directory = PathBuf::from(dir);
        }
        if let Some(days) = parse_env("ACTIONSYNC_LOOKBACK_DAYS")? {
            self.notes.lookback_days = days;
        }
        if let Ok(model) = env::var("ACTIONSYNC_MODEL") {
            self.extraction.model = model;
        }
        if let Ok(owner) = env::var("ACTIONSYNC_OWNER") {
            self.extraction.owner = Some(owner);
        }
        Ok(())
    }

    /// Checks store settings, needed by every command that talks to the store.
    pub fn validate_store(&self) -> SyncResult<()> {
        if self.store.api_key.trim().is_empty() {
            return Err(SyncError::ConfigError(
                "store api_key is not set (NOTION_API_KEY)".to_string()
            ));
        }
        if self.store.database_id.trim().is_empty() {
            return Err(SyncError::ConfigError(
                "store database_id is not set (NOTION_DATABASE_ID)".to_string()
            ));
        }
        if self.store.page_size == 0 || self.store.page_size > 100 {
            return Err(SyncError::ConfigError(format!(
                "store page_size must be between 1 and 100, got {}",
                self.store.page_size
            )));
        }
        Ok(())
    }

    /// Full check before a sync run.
    pub fn validate(&self) -> SyncResult<()> {
        self.validate_store()?;
        if self.extraction.api_key.trim().is_empty() {
            return Err(SyncError::ConfigError(
                "extraction api_key is not set (ANTHROPIC_API_KEY)".to_string()
            ));
        }
        if self.notes.extension.trim().is_empty() {
            return Err(SyncError::ConfigError(
                "notes extension must not be empty".to_string()
            ));
        }
        Ok(())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("actionsync").join("config.toml"))
}

pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf()
        },
        Err(_) => path.to_path_buf()
    }
}

fn parse_env<T: FromStr>(key: &str) -> SyncResult<Option<T>> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| SyncError::ConfigError(format!("{} has invalid value {:?}", key, value))),
        Err(_) => Ok(None)
    }
}
