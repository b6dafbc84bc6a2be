use std::time::Duration;

use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;

/// Configuration for the application
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Draft storage location
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Directory exported PDFs are written to
    #[serde(default = "default_export_dir")]
    pub export_dir: String,

    /// Quiet period after the last edit before an autosave runs
    #[serde(default = "default_autosave_delay_ms")]
    pub autosave_delay_ms: u64,

    /// Log output; the terminal belongs to the editor
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

fn default_database_url() -> String {
    "sqlite://invoice_drafts.db?mode=rwc".to_string()
}

fn default_export_dir() -> String {
    ".".to_string()
}

fn default_autosave_delay_ms() -> u64 {
    2000
}

fn default_log_file() -> String {
    "invoice_editor.log".to_string()
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// This function will:
    /// 1. Load variables from .env file if it exists
    /// 2. Deserialize environment variables into Config struct
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let config = envy::from_env::<Config>()?;

        Ok(config)
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    Config::load()
}
