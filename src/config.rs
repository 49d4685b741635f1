//! Configuration loading and management
//!
//! Handles parsing of `.dayplan.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use chrono::Weekday;

use crate::error::{Error, Result};
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE: &str = ".dayplan.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub mail: MailConfig,

    #[serde(default)]
    pub views: ViewsConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

/// Where state lives on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory; platform default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// How long to wait for the data-directory lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

/// Outgoing mail settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailConfig {
    /// Base URL used to build verification links
    #[serde(default = "default_app_url")]
    pub app_url: String,

    /// Sender address
    #[serde(default = "default_from")]
    pub from: String,

    /// Receives a notice whenever a user verifies their email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_address: Option<String>,

    /// Relay host recorded on spooled messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_host: Option<String>,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// Spool file; `<data_dir>/outbox.jsonl` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbox: Option<PathBuf>,
}

fn default_app_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_from() -> String {
    "Day Planner <noreply@localhost>".to_string()
}

fn default_smtp_port() -> u16 {
    465
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            app_url: default_app_url(),
            from: default_from(),
            notify_address: None,
            smtp_host: None,
            smtp_port: default_smtp_port(),
            outbox: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewsConfig {
    /// First day of the week: `monday` or `sunday`
    #[serde(default = "default_week_start")]
    pub week_start: String,
}

fn default_week_start() -> String {
    "monday".to_string()
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            week_start: default_week_start(),
        }
    }
}

impl ViewsConfig {
    pub fn first_weekday(&self) -> Result<Weekday> {
        match self.week_start.trim().to_ascii_lowercase().as_str() {
            "monday" => Ok(Weekday::Mon),
            "sunday" => Ok(Weekday::Sun),
            other => Err(Error::InvalidConfig(format!(
                "views.week_start must be monday or sunday, got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Task, topic and view commands need a logged-in user
    #[serde(default = "default_true")]
    pub require_login: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            require_login: default_true(),
        }
    }
}

impl Config {
    /// Load configuration from a `.dayplan.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load an explicit file, else `.dayplan.toml` under `dir`, else defaults.
    ///
    /// An explicit path must exist; the implicit one is optional.
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::InvalidConfig(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Self::load(path);
        }
        let implicit = dir.join(CONFIG_FILE);
        if implicit.exists() {
            Self::load(&implicit)
        } else {
            Ok(Self::default())
        }
    }

    /// Data directory: explicit override, then config, then platform default.
    pub fn data_dir(&self, explicit: Option<&Path>) -> PathBuf {
        if let Some(dir) = explicit {
            return dir.to_path_buf();
        }
        if let Some(dir) = &self.storage.data_dir {
            return dir.clone();
        }
        directories::ProjectDirs::from("", "", "dayplan")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".dayplan"))
    }

    fn validate(&self) -> Result<()> {
        self.storage.validate()?;
        self.mail.validate()?;
        self.views.first_weekday()?;
        Ok(())
    }
}

impl StorageConfig {
    fn validate(&self) -> Result<()> {
        if self.lock_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "storage.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        if matches!(&self.data_dir, Some(dir) if dir.as_os_str().is_empty()) {
            return Err(Error::InvalidConfig(
                "storage.data_dir cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl MailConfig {
    fn validate(&self) -> Result<()> {
        let url = self.app_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::InvalidConfig(
                "mail.app_url must start with http:// or https://".to_string(),
            ));
        }
        if self.from.trim().is_empty() {
            return Err(Error::InvalidConfig("mail.from cannot be empty".to_string()));
        }
        if self.smtp_port == 0 {
            return Err(Error::InvalidConfig("mail.smtp_port must be > 0".to_string()));
        }
        if let Some(address) = &self.notify_address {
            if !address.contains('@') {
                return Err(Error::InvalidConfig(format!(
                    "mail.notify_address is not an email address: '{address}'"
                )));
            }
        }
        Ok(())
    }

    /// Verification link for `token`.
    pub fn verify_url(&self, token: &str) -> String {
        format!("{}/verify?token={}", self.app_url.trim_end_matches('/'), token)
    }
}
