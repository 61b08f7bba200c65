//! Command-line interface definition.

use std::path::PathBuf;

use clap::Parser;

/// groupvault - archive Telegram group chats into Google Drive
#[derive(Debug, Parser)]
#[command(name = "groupvault")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Telegram bot token
    #[arg(long, env = "GROUPVAULT_BOT_TOKEN")]
    pub bot_token: String,

    /// Path to the Google OAuth client credentials JSON
    #[arg(long, env = "GROUPVAULT_GOOGLE_CREDENTIALS")]
    pub google_credentials: PathBuf,

    /// Application name used as the Drive root-folder prefix
    #[arg(long, env = "GROUPVAULT_APP_NAME", default_value = "GroupVault")]
    pub app_name: String,

    /// Directory for the state document and credential blobs
    #[arg(long, env = "GROUPVAULT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Scratch directory for in-flight media downloads
    #[arg(long, env = "GROUPVAULT_SCRATCH_DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,
}
