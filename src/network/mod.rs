pub mod device_flow;
pub mod github;

use reqwest::Client;
use thiserror::Error;

use crate::config::USER_AGENT;
use crate::persistence::StoreError;

#[derive(Debug, Error)]
pub enum GithubError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("no access token stored")]
    NoCredential,
    #[error("HTTP {status}: {body}")]
    RequestFailed { status: u16, body: String },
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl GithubError {
    /// Short message meant for the person using the app.
    pub fn user_message(&self) -> String {
        match self {
            GithubError::Network(err) if err.is_timeout() => {
                "Request timed out. Please try again.".to_owned()
            }
            GithubError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_owned()
            }
            GithubError::InvalidResponse(_) => "Failed to decode response".to_owned(),
            GithubError::AuthenticationFailed(reason) => reason.clone(),
            GithubError::NoCredential => "Please sign in again".to_owned(),
            GithubError::RequestFailed { status, body } => format!("HTTP {}: {}", status, body),
            GithubError::Storage(err) => err.to_string(),
        }
    }
}

pub fn client() -> reqwest::Result<Client> {
    Client::builder().user_agent(USER_AGENT).build()
}
