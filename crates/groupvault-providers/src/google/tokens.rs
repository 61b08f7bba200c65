//! Per-identity OAuth token storage with refresh-on-resolve.
//!
//! Each authorized identity owns one credential blob file on disk.
//! Other components never see the raw token fields; they resolve the
//! identity into a short-lived [`CredentialHandle`] that is valid for
//! the duration of one operation.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use groupvault_core::Identity;

use crate::error::{ProviderError, ProviderResult};

use super::config::GoogleConfig;
use super::device::DeviceFlowClient;

/// A persisted OAuth token set for one identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    /// The access token for API requests.
    pub access_token: String,

    /// The refresh token for obtaining new access tokens.
    pub refresh_token: Option<String>,

    /// When the access token expires.
    pub expires_at: Option<DateTime<Utc>>,

    /// The OAuth scopes that were granted.
    pub scopes: Vec<String>,

    /// When the tokens were last refreshed.
    pub last_refresh: DateTime<Utc>,
}

impl TokenInfo {
    /// Creates a new token info from token-endpoint response data.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        let expires_at = expires_in_secs.map(|secs| {
            // Refresh a minute before actual expiry.
            Utc::now() + Duration::seconds(secs) - Duration::seconds(60)
        });

        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at,
            scopes,
            last_refresh: Utc::now(),
        }
    }

    /// Returns true if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at,
            None => false,
        }
    }

    /// Updates the access token after a refresh.
    pub fn update_access_token(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
    ) {
        self.access_token = access_token.into();
        self.expires_at = expires_in_secs
            .map(|secs| Utc::now() + Duration::seconds(secs) - Duration::seconds(60));
        self.last_refresh = Utc::now();
    }
}

/// A resolved, refresh-checked credential for one identity.
///
/// Valid for the duration of one operation; callers re-resolve rather
/// than caching the handle.
#[derive(Debug, Clone)]
pub struct CredentialHandle {
    pub identity: Identity,
    pub access_token: String,
}

/// File-backed credential store, one blob per authorized identity.
///
/// Blobs are written atomically (temp file + rename) with restrictive
/// permissions. One identity's blob may back any number of groups.
#[derive(Debug)]
pub struct CredentialStore {
    dir: PathBuf,
    oauth: DeviceFlowClient,
}

impl CredentialStore {
    /// Creates a store writing blobs under the configured data dir.
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            dir: config.data_dir.clone(),
            oauth: DeviceFlowClient::new(config),
        }
    }

    /// Returns the blob path for an identity.
    pub fn blob_path(&self, identity: Identity) -> PathBuf {
        self.dir.join(format!("creds_{}.json", identity))
    }

    /// Loads the token blob for an identity, if one exists.
    pub fn load(&self, identity: Identity) -> ProviderResult<Option<TokenInfo>> {
        let path = self.blob_path(identity);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            ProviderError::configuration(format!("failed to read credential blob: {}", e))
        })?;

        let tokens: TokenInfo = serde_json::from_str(&content).map_err(|e| {
            ProviderError::configuration(format!("failed to parse credential blob: {}", e))
        })?;

        Ok(Some(tokens))
    }

    /// Persists the token blob for an identity.
    pub fn save(&self, identity: Identity, tokens: &TokenInfo) -> ProviderResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            ProviderError::configuration(format!("failed to create credential dir: {}", e))
        })?;

        let path = self.blob_path(identity);
        let temp_path = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(tokens)
            .map_err(|e| ProviderError::internal(format!("failed to serialize tokens: {}", e)))?;

        fs::write(&temp_path, &content).map_err(|e| {
            ProviderError::configuration(format!("failed to write credential blob: {}", e))
        })?;

        fs::rename(&temp_path, &path).map_err(|e| {
            ProviderError::configuration(format!("failed to rename credential blob: {}", e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            let _ = fs::set_permissions(&path, perms);
        }

        debug!(%identity, path = %path.display(), "saved credential blob");
        Ok(())
    }

    /// Resolves an identity into a usable credential handle.
    ///
    /// Refreshes an expired access token when a refresh token is
    /// present and re-persists the blob before returning. Surfaces
    /// `NotLinked` when no blob exists and `Revoked` when the provider
    /// rejects the refresh; in the revoked case the stale blob is left
    /// in place so a later manual retry can attempt refresh again.
    pub async fn resolve(&self, identity: Identity) -> ProviderResult<CredentialHandle> {
        let Some(mut tokens) = self.load(identity)? else {
            return Err(ProviderError::not_linked(format!(
                "no credential blob for identity {}",
                identity
            )));
        };

        if tokens.is_expired() {
            let Some(refresh_token) = tokens.refresh_token.clone() else {
                return Err(ProviderError::revoked(
                    "access token expired and no refresh token present",
                ));
            };

            debug!(%identity, "refreshing expired access token");
            let (access_token, expires_in) = self.oauth.refresh_token(&refresh_token).await?;
            tokens.update_access_token(access_token, expires_in);
            self.save(identity, &tokens)?;
            info!(%identity, "access token refreshed");
        }

        Ok(CredentialHandle {
            identity,
            access_token: tokens.access_token,
        })
    }

    /// Returns the directory blobs are stored under.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
