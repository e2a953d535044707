use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::types::{AccessToken, GitHubUser, RepositorySelection};

const TOKEN_FILE: &str = "token";
const USER_FILE: &str = "user.json";
const REPOSITORY_FILE: &str = "repository.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not access credential storage: {0}")]
    Io(#[from] io::Error),
    #[error("stored data is corrupted: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where the token, the signed-in user and the selected repository live.
pub trait CredentialStore: Send + Sync {
    fn store_token(&self, token: &AccessToken) -> Result<(), StoreError>;
    fn token(&self) -> Result<Option<AccessToken>, StoreError>;
    fn store_user_profile(&self, user: &GitHubUser) -> Result<(), StoreError>;
    fn user_profile(&self) -> Result<Option<GitHubUser>, StoreError>;
    fn store_selected_repository(&self, repository: &RepositorySelection)
        -> Result<(), StoreError>;
    fn selected_repository(&self) -> Result<Option<RepositorySelection>, StoreError>;
    fn clear_all(&self) -> Result<(), StoreError>;
}

/// Keeps every credential in its own file under the application data dir.
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn write(&self, name: &str, contents: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let mut file = open_private(&self.path(name))?;
        file.write_all(contents)?;
        Ok(())
    }

    fn read(&self, name: &str) -> Result<Option<String>, StoreError> {
        let mut file = match File::open(self.path(name)) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Ok(Some(contents))
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)?;
        self.write(name, json.as_bytes())
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StoreError> {
        match self.read(name)? {
            Some(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            None => Ok(None),
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn store_token(&self, token: &AccessToken) -> Result<(), StoreError> {
        self.write(TOKEN_FILE, token.expose().as_bytes())
    }

    fn token(&self) -> Result<Option<AccessToken>, StoreError> {
        Ok(self
            .read(TOKEN_FILE)?
            .map(|contents| contents.trim().to_owned())
            .filter(|token| !token.is_empty())
            .map(AccessToken::new))
    }

    fn store_user_profile(&self, user: &GitHubUser) -> Result<(), StoreError> {
        self.write_json(USER_FILE, user)
    }

    fn user_profile(&self) -> Result<Option<GitHubUser>, StoreError> {
        self.read_json(USER_FILE)
    }

    fn store_selected_repository(
        &self,
        repository: &RepositorySelection,
    ) -> Result<(), StoreError> {
        self.write_json(REPOSITORY_FILE, repository)
    }

    fn selected_repository(&self) -> Result<Option<RepositorySelection>, StoreError> {
        self.read_json(REPOSITORY_FILE)
    }

    fn clear_all(&self) -> Result<(), StoreError> {
        for name in [TOKEN_FILE, USER_FILE, REPOSITORY_FILE] {
            let path = self.path(name);
            if path.exists() {
                fs::remove_file(&path)?;
                debug!(path = %path.display(), "removed");
            }
        }
        Ok(())
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
