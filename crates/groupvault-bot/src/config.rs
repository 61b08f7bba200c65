//! Bot daemon configuration.

use std::path::PathBuf;

use groupvault_providers::google::{GoogleConfig, OAuthCredentials};

use crate::cli::Cli;
use crate::error::{BotError, BotResult};

/// Resolved daemon configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram bot token.
    pub bot_token: String,

    /// Application name, used as the Drive root-folder prefix.
    pub app_name: String,

    /// Directory for the state document and credential blobs.
    pub data_dir: PathBuf,

    /// Scratch directory for in-flight media downloads.
    pub scratch_dir: PathBuf,

    /// Google provider configuration.
    pub google: GoogleConfig,
}

impl BotConfig {
    /// Builds the daemon configuration from parsed CLI arguments.
    ///
    /// Reads and validates the Google client credentials file; any
    /// missing or malformed setting is fatal here rather than at first
    /// use.
    pub fn from_cli(cli: &Cli) -> BotResult<Self> {
        if cli.bot_token.trim().is_empty() {
            return Err(BotError::config("bot token must not be empty"));
        }

        let credentials = OAuthCredentials::from_file(&cli.google_credentials)
            .map_err(BotError::config)?;

        let data_dir = cli
            .data_dir
            .clone()
            .unwrap_or_else(GoogleConfig::default_data_dir);
        let scratch_dir = cli
            .scratch_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("groupvault"));

        let google = GoogleConfig::new(credentials).with_data_dir(&data_dir);
        google.validate().map_err(BotError::config)?;

        Ok(Self {
            bot_token: cli.bot_token.clone(),
            app_name: cli.app_name.clone(),
            data_dir,
            scratch_dir,
            google,
        })
    }

    /// Path of the persisted state document.
    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join("state.json")
    }
}
