//! Google provider configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// OAuth 2.0 client credentials for Google API access.
///
/// Users must provide their own OAuth client ID and secret, as Google
/// requires registered applications for API access. For the device
/// flow the client must be of the "TV and limited input" type.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID from Google Cloud Console.
    pub client_id: String,
    /// The OAuth 2.0 client secret from Google Cloud Console.
    pub client_secret: String,
}

/// Structure of Google's OAuth credentials JSON file.
///
/// Supports multiple formats:
/// 1. Google Cloud Console format with "installed" or "web" section
/// 2. Flat format with client_id and client_secret at root level
#[derive(Debug, Deserialize)]
pub struct GoogleCredentialsFile {
    /// Credentials for installed (desktop/device) applications.
    pub installed: Option<NestedCredentials>,
    /// Credentials for web applications.
    pub web: Option<NestedCredentials>,
    /// Direct client_id (flat format).
    pub client_id: Option<String>,
    /// Direct client_secret (flat format).
    pub client_secret: Option<String>,
}

/// OAuth credentials within a nested section of the credentials file.
#[derive(Debug, Deserialize)]
pub struct NestedCredentials {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    #[allow(dead_code)]
    pub project_id: Option<String>,
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads OAuth credentials from a Google Cloud Console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("failed to read credentials file: {}", e))?;
        Self::from_json(&content)
    }

    /// Parses OAuth credentials from a Google credentials JSON string.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let file: GoogleCredentialsFile = serde_json::from_str(json)
            .map_err(|e| format!("failed to parse credentials JSON: {}", e))?;

        if let Some(creds) = file.installed.or(file.web) {
            return Ok(Self::new(creds.client_id, creds.client_secret));
        }

        if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret) {
            return Ok(Self::new(client_id, client_secret));
        }

        Err("credentials file must contain 'installed'/'web' section or 'client_id'/'client_secret' at root level".to_string())
    }

    /// Validates that the credentials appear to be correctly formatted.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Configuration for the Google storage and identity provider.
///
/// Endpoint base URLs are overridable so tests can point the clients
/// at a local stub server.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// OAuth client credentials.
    pub credentials: OAuthCredentials,

    /// OAuth scopes to request.
    ///
    /// Defaults to Drive and Spreadsheets read-write.
    pub scopes: Vec<String>,

    /// Directory holding per-identity credential blob files.
    pub data_dir: PathBuf,

    /// Request timeout.
    pub timeout: Duration,

    /// Device-authorization endpoint.
    pub device_code_url: String,

    /// Token endpoint (device-code grant and refresh-token grant).
    pub token_url: String,

    /// Drive API v3 base URL.
    pub drive_base_url: String,

    /// Drive upload base URL (resumable sessions).
    pub upload_base_url: String,

    /// Sheets API v4 base URL.
    pub sheets_base_url: String,

    /// Wall-clock budget for one device-flow poll call.
    pub poll_timeout: Duration,
}

impl GoogleConfig {
    /// Default request timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Default device-flow poll budget in seconds.
    pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 180;

    /// Default OAuth scopes: full Drive plus Spreadsheets.
    pub const DEFAULT_SCOPES: [&'static str; 2] = [
        "https://www.googleapis.com/auth/drive",
        "https://www.googleapis.com/auth/spreadsheets",
    ];

    /// Creates a new Google configuration with the given credentials.
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            scopes: Self::DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            data_dir: Self::default_data_dir(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            device_code_url: "https://oauth2.googleapis.com/device/code".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            drive_base_url: "https://www.googleapis.com/drive/v3".to_string(),
            upload_base_url: "https://www.googleapis.com/upload/drive/v3".to_string(),
            sheets_base_url: "https://sheets.googleapis.com/v4".to_string(),
            poll_timeout: Duration::from_secs(Self::DEFAULT_POLL_TIMEOUT_SECS),
        }
    }

    /// Returns the default credential storage directory.
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".local").join("share"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("groupvault")
    }

    /// Sets the credential storage directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the device-flow poll budget.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Points every Google endpoint at an alternate base URL.
    ///
    /// Test hook: a wiremock server can stand in for the OAuth, Drive
    /// and Sheets endpoints at once.
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.device_code_url = format!("{}/device/code", base);
        self.token_url = format!("{}/token", base);
        self.drive_base_url = format!("{}/drive/v3", base);
        self.upload_base_url = format!("{}/upload/drive/v3", base);
        self.sheets_base_url = format!("{}/v4", base);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.credentials
            .validate()
            .map_err(|e| format!("invalid credentials: {}", e))?;

        if self.scopes.is_empty() {
            return Err("at least one OAuth scope is required".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_credentials() -> OAuthCredentials {
        OAuthCredentials::new("test-client.apps.googleusercontent.com", "test-secret")
    }

    #[test]
    fn credentials_validation() {
        assert!(test_credentials().validate().is_ok());
        assert!(OAuthCredentials::new("", "secret").validate().is_err());
        assert!(
            OAuthCredentials::new("id.apps.googleusercontent.com", "")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn credentials_from_json_installed() {
        let json = r#"{
            "installed": {
                "client_id": "test-id.apps.googleusercontent.com",
                "client_secret": "test-secret",
                "project_id": "my-project"
            }
        }"#;

        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "test-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "test-secret");
    }

    #[test]
    fn credentials_from_json_web() {
        let json = r#"{
            "web": {
                "client_id": "web-id.apps.googleusercontent.com",
                "client_secret": "web-secret"
            }
        }"#;

        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "web-id.apps.googleusercontent.com");
    }

    #[test]
    fn credentials_from_json_flat() {
        let json = r#"{
            "client_id": "flat-id.apps.googleusercontent.com",
            "client_secret": "flat-secret"
        }"#;

        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "flat-id.apps.googleusercontent.com");
    }

    #[test]
    fn credentials_from_json_invalid() {
        assert!(OAuthCredentials::from_json(r#"{ "other": {} }"#).is_err());
        assert!(OAuthCredentials::from_json("not json").is_err());
    }

    #[test]
    fn config_defaults() {
        let config = GoogleConfig::new(test_credentials());
        assert_eq!(config.scopes.len(), 2);
        assert!(config.token_url.starts_with("https://oauth2.googleapis.com"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_base_url_override_rewrites_all_endpoints() {
        let config =
            GoogleConfig::new(test_credentials()).with_base_url("http://127.0.0.1:9999/");
        assert_eq!(config.device_code_url, "http://127.0.0.1:9999/device/code");
        assert_eq!(config.token_url, "http://127.0.0.1:9999/token");
        assert_eq!(config.drive_base_url, "http://127.0.0.1:9999/drive/v3");
        assert_eq!(
            config.upload_base_url,
            "http://127.0.0.1:9999/upload/drive/v3"
        );
        assert_eq!(config.sheets_base_url, "http://127.0.0.1:9999/v4");
    }

    #[test]
    fn config_requires_scopes() {
        let config = GoogleConfig::new(test_credentials()).with_scopes(vec![]);
        assert!(config.validate().is_err());
    }
}
