use std::sync::Mutex;

use super::{CredentialStore, StoreError};
use crate::types::{AccessToken, GitHubUser, RepositorySelection};

/// In-memory store for driving the app in tests.
#[derive(Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<String>>,
    user: Mutex<Option<GitHubUser>>,
    repository: Mutex<Option<RepositorySelection>>,
}

impl MemoryCredentialStore {
    pub fn with_token(token: &str) -> Self {
        let store = Self::default();
        *store.token.lock().unwrap() = Some(token.to_owned());
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn store_token(&self, token: &AccessToken) -> Result<(), StoreError> {
        *self.token.lock().unwrap() = Some(token.expose().to_owned());
        Ok(())
    }

    fn token(&self) -> Result<Option<AccessToken>, StoreError> {
        Ok(self.token.lock().unwrap().as_deref().map(AccessToken::new))
    }

    fn store_user_profile(&self, user: &GitHubUser) -> Result<(), StoreError> {
        *self.user.lock().unwrap() = Some(user.clone());
        Ok(())
    }

    fn user_profile(&self) -> Result<Option<GitHubUser>, StoreError> {
        Ok(self.user.lock().unwrap().clone())
    }

    fn store_selected_repository(
        &self,
        repository: &RepositorySelection,
    ) -> Result<(), StoreError> {
        *self.repository.lock().unwrap() = Some(repository.clone());
        Ok(())
    }

    fn selected_repository(&self) -> Result<Option<RepositorySelection>, StoreError> {
        Ok(self.repository.lock().unwrap().clone())
    }

    fn clear_all(&self) -> Result<(), StoreError> {
        *self.token.lock().unwrap() = None;
        *self.user.lock().unwrap() = None;
        *self.repository.lock().unwrap() = None;
        Ok(())
    }
}
