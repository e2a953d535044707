use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use flume::Sender;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{Settings, SCOPES};
use crate::network::device_flow::{AuthState, DeviceAuthFlow, LoginOutcome, OAuthClient};
use crate::network::github::{CreatedPost, GitHubClient};
use crate::network::{self, GithubError};
use crate::persistence::CredentialStore;
use crate::post::{DraftError, PostDraft};
use crate::types::{GitHubRepository, GitHubUser, RepositorySelection};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error("Please select a repository before sharing content.")]
    NoRepository,
    #[error("Repository {0} is not accessible with this account.")]
    UnknownRepository(String),
    #[error(transparent)]
    Github(#[from] GithubError),
}

impl PublishError {
    pub fn user_message(&self) -> String {
        match self {
            PublishError::Github(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}

/// What is known about the current session without touching the network.
#[derive(Debug, Default)]
pub struct Session {
    pub signed_in: bool,
    pub user: Option<GitHubUser>,
    pub repository: Option<RepositorySelection>,
}

/// The running sign-in attempt, if any. `generation` tells attempts apart so
/// a finished one never clears the slot of the attempt that replaced it.
#[derive(Default)]
struct LoginSlot {
    generation: u64,
    cancel: Option<CancellationToken>,
}

pub(super) struct App {
    settings: Settings,
    store: Arc<dyn CredentialStore>,
    oauth: OAuthClient,
    github: GitHubClient,
    login: Mutex<LoginSlot>,
}

impl App {
    pub fn new(settings: Settings, store: Arc<dyn CredentialStore>) -> Result<Self, GithubError> {
        let client = network::client()?;
        let oauth = OAuthClient::new(client.clone(), &settings, SCOPES);
        let github = GitHubClient::new(client, &settings.api_base_url, store.clone());

        Ok(Self {
            settings,
            store,
            oauth,
            github,
            login: Mutex::new(LoginSlot::default()),
        })
    }

    pub fn session(&self) -> Result<Session, GithubError> {
        if self.store.token()?.is_none() {
            return Ok(Session::default());
        }

        Ok(Session {
            signed_in: true,
            user: self.store.user_profile()?,
            repository: self.store.selected_repository()?,
        })
    }

    /// Run the device flow. Only one attempt runs at a time: starting a new
    /// one cancels the previous.
    pub async fn login(&self, states: Sender<AuthState>) -> Result<LoginOutcome, GithubError> {
        let cancel = CancellationToken::new();
        let (generation, previous) = self.with_login(|slot| {
            slot.generation += 1;
            (slot.generation, slot.cancel.replace(cancel.clone()))
        });
        if let Some(previous) = previous {
            info!("replacing running sign in");
            previous.cancel();
        }

        let result = DeviceAuthFlow::new(&self.oauth, &self.github, self.store.clone(), states)
            .open_browser(self.settings.open_browser)
            .authenticate(&cancel)
            .await;

        self.with_login(|slot| {
            if slot.generation == generation {
                slot.cancel = None;
            }
        });
        result
    }

    pub fn cancel_login(&self) {
        if let Some(cancel) = self.with_login(|slot| slot.cancel.take()) {
            info!("cancelling sign in");
            cancel.cancel();
        }
    }

    fn with_login<T>(&self, f: impl FnOnce(&mut LoginSlot) -> T) -> T {
        match self.login.lock() {
            Ok(mut guard) => f(&mut *guard),
            Err(poisoned) => f(&mut *poisoned.into_inner()),
        }
    }

    pub fn logout(&self) -> Result<(), GithubError> {
        self.cancel_login();
        self.store.clear_all()?;
        info!("signed out");
        Ok(())
    }

    pub async fn repositories(&self) -> Result<Vec<GitHubRepository>, GithubError> {
        self.github.repositories().await
    }

    pub async fn select_repository(
        &self,
        full_name: &str,
    ) -> Result<RepositorySelection, PublishError> {
        let repositories = self.repositories().await?;
        let repository = repositories
            .iter()
            .find(|repository| repository.full_name.eq_ignore_ascii_case(full_name))
            .ok_or_else(|| PublishError::UnknownRepository(full_name.to_owned()))?;

        let selection = RepositorySelection::from(repository);
        self.store
            .store_selected_repository(&selection)
            .map_err(GithubError::from)?;
        info!(repository = %selection.full_name, "repository selected");
        Ok(selection)
    }

    pub async fn publish(
        &self,
        draft: &PostDraft,
        now: DateTime<Utc>,
    ) -> Result<CreatedPost, PublishError> {
        let repository = self
            .store
            .selected_repository()
            .map_err(GithubError::from)?
            .ok_or(PublishError::NoRepository)?;
        let content = draft.submit(now)?;

        if content.page_title.is_empty() {
            warn!("publishing a post without a page title");
        }

        Ok(self.github.create_post(&content, &repository).await?)
    }
}
