//! OAuth 2.0 device-flow implementation for Google APIs.
//!
//! The device flow (RFC 8628) lets a user authorize on a separate
//! browser using a short code while this process polls the token
//! endpoint. It is the only flow that works from inside a chat
//! conversation, where there is no loopback redirect to receive.
//!
//! # Flow Overview
//!
//! 1. POST the device-authorization endpoint with client id + scopes
//! 2. Show the user the verification URL and short user code
//! 3. Poll the token endpoint with the device-code grant, honoring
//!    the provider-specified interval and slow-down signals
//! 4. On success, hand the token set to the credential store

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};

use super::config::GoogleConfig;
use super::tokens::TokenInfo;

/// Grant type for the device-code token exchange.
const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Extra delay added to the poll interval on a slow-down signal.
const SLOW_DOWN_BACKOFF: Duration = Duration::from_secs(2);

/// An in-flight device authorization, held in memory only.
///
/// Lost on process restart by design: the user simply restarts the
/// link flow. A second `begin` for the same identity overwrites the
/// previous flow; the orphaned device code expires provider-side.
#[derive(Debug, Clone)]
pub struct DeviceFlow {
    /// Opaque code this process polls the token endpoint with.
    pub device_code: String,
    /// Short code the user types at the verification URL.
    pub user_code: String,
    /// Where the user completes verification.
    pub verification_url: String,
    /// Provider-specified poll interval.
    pub interval: Duration,
    /// When the flow was issued.
    pub issued_at: DateTime<Utc>,
}

/// Terminal outcome of a bounded device-flow poll.
///
/// Pending and slow-down states are handled inside the loop; only the
/// closed set of outcomes a caller can act on escapes. Transport and
/// provider faults use the error channel instead.
#[derive(Debug)]
pub enum PollOutcome {
    /// The user completed verification; the token set is ready to
    /// persist.
    Authorized(TokenInfo),
    /// The user rejected the authorization request.
    Denied,
    /// The device code expired before the user finished.
    Expired,
    /// The wall-clock budget ran out while still pending.
    TimedOut,
}

/// One observed state of the token endpoint, internal to the loop.
enum PollStep {
    Token(TokenInfo),
    Pending,
    SlowDown,
    Denied,
    Expired,
}

/// Client for Google's device-authorization and token endpoints.
#[derive(Debug)]
pub struct DeviceFlowClient {
    config: GoogleConfig,
    http_client: reqwest::Client,
}

impl DeviceFlowClient {
    /// Creates a new device-flow client.
    pub fn new(config: GoogleConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("failed to create HTTP client");

        Self {
            config,
            http_client,
        }
    }

    /// Starts a device authorization and returns the flow handle.
    ///
    /// # Errors
    ///
    /// Returns a network or server error when the provider is
    /// unavailable, and an invalid-response error when the payload is
    /// missing required fields.
    pub async fn begin(&self) -> ProviderResult<DeviceFlow> {
        let params = [
            ("client_id", self.config.credentials.client_id.as_str()),
            ("scope", &self.config.scopes.join(" ")),
        ];

        let response = self
            .http_client
            .post(&self.config.device_code_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                ProviderError::network(format!("device authorization request failed: {}", e))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(ProviderError::server(format!(
                "device authorization failed ({}): {}",
                status, body
            )));
        }

        let parsed: DeviceCodeResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid device code response: {}", e))
        })?;

        let verification_url = parsed
            .verification_url
            .or(parsed.verification_uri)
            .ok_or_else(|| {
                ProviderError::invalid_response("device code response missing verification URL")
            })?;

        info!(user_code = %parsed.user_code, "device authorization started");

        Ok(DeviceFlow {
            device_code: parsed.device_code,
            user_code: parsed.user_code,
            verification_url,
            interval: Duration::from_secs(parsed.interval.unwrap_or(5)),
            issued_at: Utc::now(),
        })
    }

    /// Polls the token endpoint until a terminal outcome or until the
    /// wall-clock `budget` runs out.
    ///
    /// Honors the flow's poll interval and adds two seconds on every
    /// slow-down signal. Never hangs: a still-pending flow reports
    /// [`PollOutcome::TimedOut`] once the budget is spent.
    pub async fn poll(&self, flow: &DeviceFlow, budget: Duration) -> ProviderResult<PollOutcome> {
        let deadline = Instant::now() + budget;
        let mut interval = flow.interval;

        loop {
            if Instant::now() >= deadline {
                warn!("device flow poll budget exhausted");
                return Ok(PollOutcome::TimedOut);
            }

            match self.poll_once(&flow.device_code).await? {
                PollStep::Token(tokens) => {
                    info!("device flow authorized");
                    return Ok(PollOutcome::Authorized(tokens));
                }
                PollStep::Denied => return Ok(PollOutcome::Denied),
                PollStep::Expired => return Ok(PollOutcome::Expired),
                PollStep::Pending => {}
                PollStep::SlowDown => {
                    interval += SLOW_DOWN_BACKOFF;
                    debug!(interval_secs = interval.as_secs(), "provider asked to slow down");
                }
            }

            tokio::time::sleep(interval).await;
        }
    }

    /// Issues a single device-code token request.
    async fn poll_once(&self, device_code: &str) -> ProviderResult<PollStep> {
        let params = [
            ("client_id", self.config.credentials.client_id.as_str()),
            ("client_secret", self.config.credentials.client_secret.as_str()),
            ("device_code", device_code),
            ("grant_type", DEVICE_GRANT_TYPE),
        ];

        let response = self
            .http_client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if status.is_success() {
            let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
                ProviderError::invalid_response(format!("invalid token response: {}", e))
            })?;
            let scopes = parsed.scopes();
            return Ok(PollStep::Token(TokenInfo::new(
                parsed.access_token,
                parsed.refresh_token,
                parsed.expires_in,
                scopes,
            )));
        }

        let error: TokenErrorResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid token error response: {}", e))
        })?;

        match error.error.as_str() {
            "authorization_pending" => Ok(PollStep::Pending),
            "slow_down" => Ok(PollStep::SlowDown),
            "access_denied" => Ok(PollStep::Denied),
            "expired_token" => Ok(PollStep::Expired),
            other => Err(ProviderError::bad_request(format!(
                "token endpoint rejected device grant: {} ({})",
                other,
                error.error_description.unwrap_or_default()
            ))),
        }
    }

    /// Refreshes an expired access token using the refresh token.
    ///
    /// Returns the new access token and its expiry in seconds. An
    /// authorization rejection (revoked grant, changed scopes) maps to
    /// a revoked error so the caller can require re-authorization.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> ProviderResult<(String, Option<i64>)> {
        let params = [
            ("client_id", self.config.credentials.client_id.as_str()),
            ("client_secret", self.config.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("token refresh request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if status == reqwest::StatusCode::BAD_REQUEST
            || status == reqwest::StatusCode::UNAUTHORIZED
        {
            return Err(ProviderError::revoked(format!(
                "token refresh rejected ({}): {}",
                status, body
            )));
        }

        if !status.is_success() {
            return Err(ProviderError::server(format!(
                "token refresh failed ({}): {}",
                status, body
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid token response: {}", e))
        })?;

        debug!("refreshed access token");
        Ok((parsed.access_token, parsed.expires_in))
    }
}

/// Response from the device-authorization endpoint.
#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    /// Google historically returns `verification_url`; RFC 8628 says
    /// `verification_uri`. Accept either.
    #[serde(default)]
    verification_url: Option<String>,
    #[serde(default)]
    verification_uri: Option<String>,
    #[serde(default)]
    interval: Option<u64>,
}

/// Success response from the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    fn scopes(&self) -> Vec<String> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().map(String::from).collect())
            .unwrap_or_default()
    }
}

/// Error response from the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::config::OAuthCredentials;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base: &str) -> GoogleConfig {
        GoogleConfig::new(OAuthCredentials::new("client-id", "client-secret"))
            .with_base_url(base)
    }

    #[tokio::test]
    async fn begin_parses_device_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/device/code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "device_code": "dc-1",
                "user_code": "ABCD-EFGH",
                "verification_url": "https://www.google.com/device",
                "expires_in": 1800,
                "interval": 5
            })))
            .mount(&server)
            .await;

        let client = DeviceFlowClient::new(test_config(&server.uri()));
        let flow = client.begin().await.unwrap();
        assert_eq!(flow.device_code, "dc-1");
        assert_eq!(flow.user_code, "ABCD-EFGH");
        assert_eq!(flow.verification_url, "https://www.google.com/device");
        assert_eq!(flow.interval, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn begin_accepts_rfc_verification_uri() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/device/code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "device_code": "dc-2",
                "user_code": "WXYZ",
                "verification_uri": "https://example.com/activate"
            })))
            .mount(&server)
            .await;

        let client = DeviceFlowClient::new(test_config(&server.uri()));
        let flow = client.begin().await.unwrap();
        assert_eq!(flow.verification_url, "https://example.com/activate");
        // Missing interval falls back to the provider default.
        assert_eq!(flow.interval, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn poll_terminates_on_budget_while_pending() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(428).set_body_json(serde_json::json!({
                "error": "authorization_pending"
            })))
            .mount(&server)
            .await;

        let client = DeviceFlowClient::new(test_config(&server.uri()));
        let flow = DeviceFlow {
            device_code: "dc".to_string(),
            user_code: "uc".to_string(),
            verification_url: "v".to_string(),
            interval: Duration::from_secs(2),
            issued_at: Utc::now(),
        };

        let started = std::time::Instant::now();
        let outcome = client.poll(&flow, Duration::from_secs(5)).await.unwrap();
        let elapsed = started.elapsed();

        assert!(matches!(outcome, PollOutcome::TimedOut));
        assert!(elapsed >= Duration::from_secs(5), "returned too early: {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(8), "poll overran budget: {:?}", elapsed);
    }

    #[tokio::test]
    async fn poll_reports_denial() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("device_code=dc"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": "access_denied"
            })))
            .mount(&server)
            .await;

        let client = DeviceFlowClient::new(test_config(&server.uri()));
        let flow = DeviceFlow {
            device_code: "dc".to_string(),
            user_code: "uc".to_string(),
            verification_url: "v".to_string(),
            interval: Duration::from_secs(1),
            issued_at: Utc::now(),
        };

        let outcome = client.poll(&flow, Duration::from_secs(10)).await.unwrap();
        assert!(matches!(outcome, PollOutcome::Denied));
    }

    #[tokio::test]
    async fn poll_returns_tokens_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at-1",
                "refresh_token": "rt-1",
                "expires_in": 3600,
                "scope": "https://www.googleapis.com/auth/drive",
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let client = DeviceFlowClient::new(test_config(&server.uri()));
        let flow = DeviceFlow {
            device_code: "dc".to_string(),
            user_code: "uc".to_string(),
            verification_url: "v".to_string(),
            interval: Duration::from_secs(1),
            issued_at: Utc::now(),
        };

        match client.poll(&flow, Duration::from_secs(10)).await.unwrap() {
            PollOutcome::Authorized(tokens) => {
                assert_eq!(tokens.access_token, "at-1");
                assert_eq!(tokens.refresh_token.as_deref(), Some("rt-1"));
                assert_eq!(
                    tokens.scopes,
                    vec!["https://www.googleapis.com/auth/drive".to_string()]
                );
                assert!(!tokens.is_expired());
            }
            other => panic!("expected authorization, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn refresh_rejection_maps_to_revoked() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant"
            })))
            .mount(&server)
            .await;

        let client = DeviceFlowClient::new(test_config(&server.uri()));
        let err = client.refresh_token("stale").await.unwrap_err();
        assert_eq!(err.code(), crate::error::ProviderErrorCode::Revoked);
    }
}
