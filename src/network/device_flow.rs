//! OAuth 2.0 Device Authorization Grant against GitHub.
//!
//! The app never holds a client secret: it asks for a device code, shows the
//! user code, and polls the token endpoint until the user approves (or
//! denies) the request in the browser.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use flume::Sender;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::github::GitHubClient;
use super::GithubError;
use crate::config::Settings;
use crate::persistence::CredentialStore;
use crate::types::{AccessToken, DeviceCodeResponse, GitHubUser};

const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Added to the poll interval every time the provider answers `slow_down`.
pub const SLOW_DOWN_INCREMENT: Duration = Duration::from_secs(5);

/// Answer of a single token request.
#[derive(Debug)]
pub enum TokenPoll {
    Granted(AccessToken),
    Pending,
    SlowDown,
    Rejected(String),
}

#[derive(Debug)]
pub enum AuthOutcome {
    Authorized(AccessToken),
    Cancelled,
}

#[derive(Debug)]
pub enum LoginOutcome {
    SignedIn(GitHubUser),
    Cancelled,
}

/// Progress of a sign-in attempt, as shown to the user.
#[derive(Clone, Debug, PartialEq)]
pub enum AuthState {
    RequestingCode,
    AwaitingUserAuthorization {
        user_code: String,
        verification_uri: String,
        expires_in: u64,
    },
    Success(GitHubUser),
    Failed(String),
    Cancelled,
}

#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    async fn exchange(&self, device_code: &str) -> Result<TokenPoll, GithubError>;
}

#[derive(Deserialize)]
struct TokenPollResponse {
    access_token: Option<String>,
    error: Option<String>,
}

pub struct OAuthClient {
    client: Client,
    base_url: String,
    client_id: String,
    scopes: String,
}

impl OAuthClient {
    pub fn new(client: Client, settings: &Settings, scopes: &str) -> Self {
        Self {
            client,
            base_url: settings.oauth_base_url.trim_end_matches('/').to_owned(),
            client_id: settings.client_id.clone(),
            scopes: scopes.to_owned(),
        }
    }

    pub async fn request_device_code(&self) -> Result<DeviceCodeResponse, GithubError> {
        let url = format!("{}/login/device/code", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("scope", self.scopes.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(GithubError::InvalidResponse(format!(
                "Failed to get device code (HTTP {})",
                status.as_u16()
            )));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            GithubError::InvalidResponse(format!("Failed to parse device code: {}", e))
        })
    }
}

#[async_trait]
impl TokenEndpoint for OAuthClient {
    async fn exchange(&self, device_code: &str) -> Result<TokenPoll, GithubError> {
        let url = format!("{}/login/oauth/access_token", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("device_code", device_code),
                ("grant_type", DEVICE_GRANT_TYPE),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(GithubError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        let body: TokenPollResponse = serde_json::from_str(&text)
            .map_err(|e| GithubError::InvalidResponse(format!("Failed to parse token: {}", e)))?;

        if let Some(token) = body.access_token.filter(|token| !token.is_empty()) {
            return Ok(TokenPoll::Granted(AccessToken::new(token)));
        }

        match body.error.as_deref() {
            Some("authorization_pending") => Ok(TokenPoll::Pending),
            Some("slow_down") => Ok(TokenPoll::SlowDown),
            Some(error) => Ok(TokenPoll::Rejected(error.to_owned())),
            None => Err(GithubError::InvalidResponse(
                "unexpected response from token endpoint".to_owned(),
            )),
        }
    }
}

/// Poll until the user approves, the provider rejects, or `cancel` fires.
///
/// A request goes out first, then the loop waits `interval` before the next
/// one. Every `slow_down` permanently adds [`SLOW_DOWN_INCREMENT`]. The loop
/// has no notion of expiry, see [`poll_until_expired`].
pub async fn poll_for_token<E: TokenEndpoint + ?Sized>(
    endpoint: &E,
    device_code: &str,
    interval: Duration,
    cancel: &CancellationToken,
) -> Result<AuthOutcome, GithubError> {
    let mut interval = interval;

    loop {
        if cancel.is_cancelled() {
            info!("device flow cancelled");
            return Ok(AuthOutcome::Cancelled);
        }

        let poll = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("device flow cancelled");
                return Ok(AuthOutcome::Cancelled);
            }
            poll = endpoint.exchange(device_code) => poll?,
        };

        match poll {
            TokenPoll::Granted(token) => {
                info!("device flow authorized");
                return Ok(AuthOutcome::Authorized(token));
            }
            TokenPoll::Pending => debug!("authorization pending"),
            TokenPoll::SlowDown => {
                interval += SLOW_DOWN_INCREMENT;
                debug!(interval_secs = interval.as_secs(), "asked to slow down");
            }
            TokenPoll::Rejected(error) => {
                warn!(%error, "device flow rejected");
                return Err(GithubError::AuthenticationFailed(error));
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("device flow cancelled");
                return Ok(AuthOutcome::Cancelled);
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

/// [`poll_for_token`] bounded by the lifetime of the device code. Running
/// past it fails the same way the provider does, with `expired_token`.
pub async fn poll_until_expired<E: TokenEndpoint + ?Sized>(
    endpoint: &E,
    device_code: &str,
    interval: Duration,
    expires_in: Duration,
    cancel: &CancellationToken,
) -> Result<AuthOutcome, GithubError> {
    match tokio::time::timeout(
        expires_in,
        poll_for_token(endpoint, device_code, interval, cancel),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!("device code expired");
            Err(GithubError::AuthenticationFailed("expired_token".to_owned()))
        }
    }
}

/// Full sign-in: device code, browser, polling, then persisting the token and
/// the user profile. Nothing is persisted unless the user approved.
pub struct DeviceAuthFlow<'a> {
    oauth: &'a OAuthClient,
    github: &'a GitHubClient,
    store: Arc<dyn CredentialStore>,
    states: Sender<AuthState>,
    open_browser: bool,
}

impl<'a> DeviceAuthFlow<'a> {
    pub fn new(
        oauth: &'a OAuthClient,
        github: &'a GitHubClient,
        store: Arc<dyn CredentialStore>,
        states: Sender<AuthState>,
    ) -> Self {
        Self {
            oauth,
            github,
            store,
            states,
            open_browser: true,
        }
    }

    pub fn open_browser(mut self, open_browser: bool) -> Self {
        self.open_browser = open_browser;
        self
    }

    fn publish(&self, state: AuthState) {
        // nobody watching is fine
        let _ = self.states.send(state);
    }

    pub async fn authenticate(
        &self,
        cancel: &CancellationToken,
    ) -> Result<LoginOutcome, GithubError> {
        match self.run(cancel).await {
            Ok(LoginOutcome::SignedIn(user)) => {
                self.publish(AuthState::Success(user.clone()));
                Ok(LoginOutcome::SignedIn(user))
            }
            Ok(LoginOutcome::Cancelled) => {
                self.publish(AuthState::Cancelled);
                Ok(LoginOutcome::Cancelled)
            }
            Err(err) => {
                self.publish(AuthState::Failed(err.user_message()));
                Err(err)
            }
        }
    }

    async fn run(&self, cancel: &CancellationToken) -> Result<LoginOutcome, GithubError> {
        self.publish(AuthState::RequestingCode);
        let device = self.oauth.request_device_code().await?;

        info!(user_code = %device.user_code, "waiting for user authorization");
        self.publish(AuthState::AwaitingUserAuthorization {
            user_code: device.user_code.clone(),
            verification_uri: device.verification_uri.clone(),
            expires_in: device.expires_in,
        });

        if self.open_browser {
            if let Err(err) = open::that(&device.verification_uri) {
                warn!(%err, "could not open the browser");
            }
        }

        let outcome = poll_until_expired(
            self.oauth,
            &device.device_code,
            Duration::from_secs(device.interval),
            Duration::from_secs(device.expires_in),
            cancel,
        )
        .await?;

        let token = match outcome {
            AuthOutcome::Authorized(token) => token,
            AuthOutcome::Cancelled => return Ok(LoginOutcome::Cancelled),
        };

        if cancel.is_cancelled() {
            info!("device flow cancelled");
            return Ok(LoginOutcome::Cancelled);
        }
        self.store.store_token(&token)?;
        drop(token);

        let user = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            user = self.github.current_user() => Some(user?),
        };
        let user = match user {
            Some(user) if !cancel.is_cancelled() => user,
            _ => {
                // cancelled or signed out while fetching the profile
                info!("device flow cancelled after authorization");
                self.store.clear_all()?;
                return Ok(LoginOutcome::Cancelled);
            }
        };
        self.store.store_user_profile(&user)?;
        info!(login = %user.login, "signed in");

        Ok(LoginOutcome::SignedIn(user))
    }
}
