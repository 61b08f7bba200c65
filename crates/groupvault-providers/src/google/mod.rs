//! Google Drive and Sheets provider implementation.
//!
//! This module provides the Google-backed storage and identity stack:
//! device-flow authorization, per-identity credential blobs, and a
//! [`GoogleStorage`] implementation of the storage trait over the
//! Drive v3 and Sheets v4 APIs.
//!
//! # Authentication Flow
//!
//! 1. User provides their own OAuth client ID/secret (required by
//!    Google; the client must be of the "TV and limited input" type)
//! 2. A device-authorization request yields a user code and a
//!    verification URL
//! 3. The user enters the code on another device while the bot polls
//!    the token endpoint
//! 4. Granted tokens are persisted per identity and refreshed on read
//!
//! # Example
//!
//! ```ignore
//! use groupvault_providers::google::{
//!     CredentialStore, DeviceFlowClient, GoogleConfig, OAuthCredentials, PollOutcome,
//! };
//!
//! let config = GoogleConfig::new(OAuthCredentials::from_file("client_secret.json")?);
//! let oauth = DeviceFlowClient::new(config.clone());
//!
//! let flow = oauth.begin().await?;
//! println!("visit {} and enter {}", flow.verification_url, flow.user_code);
//!
//! if let PollOutcome::Authorized(tokens) = oauth.poll(&flow, config.poll_timeout).await? {
//!     CredentialStore::new(config).save(identity, &tokens)?;
//! }
//! ```

mod config;
mod device;
mod drive;
mod provider;
mod sheets;
mod tokens;

pub use config::{GoogleConfig, OAuthCredentials};
pub use device::{DeviceFlow, DeviceFlowClient, PollOutcome};
pub use drive::{DriveClient, FOLDER_MIME, SPREADSHEET_MIME};
pub use provider::GoogleStorage;
pub use sheets::SheetsClient;
pub use tokens::{CredentialHandle, CredentialStore, TokenInfo};
