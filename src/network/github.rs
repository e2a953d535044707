use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::GithubError;
use crate::persistence::CredentialStore;
use crate::post::formatter;
use crate::types::{GitHubRepository, GitHubUser, PostContent, RepositorySelection};

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const POSTS_DIR: &str = "_posts";

#[derive(Serialize)]
struct CreateFileRequest<'a> {
    message: String,
    content: String,
    branch: &'a str,
}

#[derive(Deserialize)]
struct CreateFileResponse {
    content: Option<CreatedFile>,
}

#[derive(Deserialize)]
struct CreatedFile {
    #[serde(default)]
    html_url: Option<String>,
}

/// A post that landed in the repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedPost {
    pub path: String,
    pub html_url: Option<String>,
}

/// GitHub REST client. The token is read from the store on every request, so
/// signing in or out takes effect immediately.
pub struct GitHubClient {
    client: Client,
    base_url: String,
    store: Arc<dyn CredentialStore>,
}

impl GitHubClient {
    pub fn new(client: Client, base_url: &str, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            store,
        }
    }

    fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder, GithubError> {
        let token = self.store.token()?.ok_or(GithubError::NoCredential)?;
        let url = format!("{}{}", self.base_url, endpoint);

        let bearer = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
            .map_err(|_| GithubError::NoCredential)?;

        Ok(self
            .client
            .request(method, url)
            .header(AUTHORIZATION, bearer)
            .header(ACCEPT, GITHUB_ACCEPT))
    }

    pub async fn current_user(&self) -> Result<GitHubUser, GithubError> {
        let response = self.request(Method::GET, "/user")?.send().await?;
        decode(response).await
    }

    pub async fn repositories(&self) -> Result<Vec<GitHubRepository>, GithubError> {
        let response = self
            .request(Method::GET, "/user/repos")?
            .query(&[("type", "all"), ("sort", "updated"), ("per_page", "100")])
            .send()
            .await?;

        let repositories: Vec<GitHubRepository> = decode(response).await?;
        debug!(count = repositories.len(), "fetched repositories");
        Ok(repositories)
    }

    /// Commit the rendered post under `_posts/` on the repository's default
    /// branch. Never retried: a second PUT for the same path is a conflict.
    pub async fn create_post(
        &self,
        content: &PostContent,
        repository: &RepositorySelection,
    ) -> Result<CreatedPost, GithubError> {
        let path = format!("{}/{}", POSTS_DIR, formatter::render_filename(content));
        let endpoint = format!(
            "/repos/{}/contents/{}",
            encode_path(&repository.full_name),
            encode_path(&path)
        );

        let body = CreateFileRequest {
            message: formatter::commit_message(content),
            content: STANDARD.encode(formatter::render_markdown(content)),
            branch: &repository.default_branch,
        };

        let response = self
            .request(Method::PUT, &endpoint)?
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        // The body only matters for the link shown to the user.
        let html_url = response
            .text()
            .await
            .ok()
            .and_then(|text| serde_json::from_str::<CreateFileResponse>(&text).ok())
            .and_then(|created| created.content)
            .and_then(|file| file.html_url);

        info!(repository = %repository.full_name, %path, "post created");
        Ok(CreatedPost { path, html_url })
    }
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

async fn check_status(response: Response) -> Result<Response, GithubError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_owned());
    Err(GithubError::RequestFailed {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GithubError> {
    let response = check_status(response).await?;
    let text = response.text().await?;
    serde_json::from_str(&text)
        .map_err(|e| GithubError::InvalidResponse(format!("Failed to parse response: {}", e)))
}
