//! Device-flow link orchestration.
//!
//! Ties the OAuth engine, the credential store and the session
//! coordinator together: `/link` begins a flow, `/verify` polls it to
//! a terminal outcome and persists the granted tokens.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use groupvault_core::Identity;
use groupvault_providers::ProviderResult;
use groupvault_providers::google::{
    CredentialStore, DeviceFlow, DeviceFlowClient, GoogleConfig, PollOutcome, TokenInfo,
};

use crate::session::SessionCoordinator;

/// Terminal result of a `/verify` attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Tokens granted and persisted.
    Authorized,
    /// The user refused the grant; a fresh `/link` is required.
    Denied,
    /// The device code expired; a fresh `/link` is required.
    Expired,
    /// Still pending when the poll budget ran out; `/verify` may be
    /// retried against the same code.
    TimedOut,
    /// No flow in progress for this identity.
    NotStarted,
}

/// Authorization engine: begin/verify device flows per identity.
pub struct AuthEngine {
    oauth: DeviceFlowClient,
    credentials: CredentialStore,
    sessions: Arc<SessionCoordinator>,
    poll_timeout: Duration,
}

impl AuthEngine {
    pub fn new(config: GoogleConfig, sessions: Arc<SessionCoordinator>) -> Self {
        Self {
            oauth: DeviceFlowClient::new(config.clone()),
            credentials: CredentialStore::new(config.clone()),
            sessions,
            poll_timeout: config.poll_timeout,
        }
    }

    /// Starts a device flow for the identity.
    ///
    /// Any previous in-flight flow for the same identity is
    /// superseded. The returned flow carries the user code and
    /// verification URL to show the user.
    pub async fn begin_link(&self, identity: Identity) -> ProviderResult<DeviceFlow> {
        let flow = self.oauth.begin().await?;
        info!(%identity, user_code = %flow.user_code, "device flow started");
        self.sessions.insert(identity, flow.clone());
        Ok(flow)
    }

    /// Polls the identity's in-flight flow to an outcome.
    ///
    /// On success the token blob is persisted and the in-memory flow
    /// is cleared. Denied and expired flows are cleared too; a timeout
    /// keeps the flow so the user can `/verify` again without
    /// restarting.
    pub async fn verify(&self, identity: Identity) -> ProviderResult<LinkOutcome> {
        let Some(flow) = self.sessions.current(identity) else {
            return Ok(LinkOutcome::NotStarted);
        };

        match self.oauth.poll(&flow, self.poll_timeout).await? {
            PollOutcome::Authorized(tokens) => {
                self.credentials.save(identity, &tokens)?;
                self.sessions.remove(identity);
                info!(%identity, "authorization granted");
                Ok(LinkOutcome::Authorized)
            }
            PollOutcome::Denied => {
                self.sessions.remove(identity);
                Ok(LinkOutcome::Denied)
            }
            PollOutcome::Expired => {
                self.sessions.remove(identity);
                Ok(LinkOutcome::Expired)
            }
            PollOutcome::TimedOut => Ok(LinkOutcome::TimedOut),
        }
    }

    /// Returns true if a token blob exists for the identity.
    pub fn is_linked(&self, identity: Identity) -> bool {
        matches!(self.credentials.load(identity), Ok(Some(_)))
    }

    /// The credential store backing this engine.
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Persists a token blob directly (test seeding and migrations).
    pub fn save_tokens(&self, identity: Identity, tokens: &TokenInfo) -> ProviderResult<()> {
        self.credentials.save(identity, tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupvault_providers::google::OAuthCredentials;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn engine_for(server: &MockServer, dir: &std::path::Path) -> AuthEngine {
        let config = GoogleConfig::new(OAuthCredentials::new("id", "secret"))
            .with_base_url(&server.uri())
            .with_data_dir(dir)
            .with_poll_timeout(Duration::from_secs(5));
        AuthEngine::new(config, Arc::new(SessionCoordinator::new()))
    }

    fn device_code_response() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "device_code": "dev-1",
            "user_code": "ABCD-EFGH",
            "verification_url": "https://www.google.com/device",
            "expires_in": 1800,
            "interval": 1
        }))
    }

    #[tokio::test]
    async fn verify_without_link_is_not_started() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_for(&server, dir.path()).await;

        let outcome = engine.verify(Identity(1)).await.unwrap();
        assert_eq!(outcome, LinkOutcome::NotStarted);
    }

    #[tokio::test]
    async fn link_then_verify_persists_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/device/code"))
            .respond_with(device_code_response())
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("device_code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at",
                "refresh_token": "rt",
                "expires_in": 3600,
                "scope": "https://www.googleapis.com/auth/drive"
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let engine = engine_for(&server, dir.path()).await;
        let identity = Identity(7);

        let flow = engine.begin_link(identity).await.unwrap();
        assert_eq!(flow.user_code, "ABCD-EFGH");
        assert!(!engine.is_linked(identity));

        let outcome = engine.verify(identity).await.unwrap();
        assert_eq!(outcome, LinkOutcome::Authorized);
        assert!(engine.is_linked(identity));

        // Flow is cleared after a terminal outcome.
        let again = engine.verify(identity).await.unwrap();
        assert_eq!(again, LinkOutcome::NotStarted);
    }

    #[tokio::test]
    async fn denied_clears_flow_without_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/device/code"))
            .respond_with(device_code_response())
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": "access_denied"
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let engine = engine_for(&server, dir.path()).await;
        let identity = Identity(8);

        engine.begin_link(identity).await.unwrap();
        let outcome = engine.verify(identity).await.unwrap();
        assert_eq!(outcome, LinkOutcome::Denied);
        assert!(!engine.is_linked(identity));
        assert_eq!(
            engine.verify(identity).await.unwrap(),
            LinkOutcome::NotStarted
        );
    }
}
