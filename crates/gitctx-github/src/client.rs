use std::time::{Duration, Instant};

use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::Mutex;
use url::Url;

use crate::error::GitHubError;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const ACCEPT: &str = "application/vnd.github.v3+json";
const TOKEN_ENV: &str = "GITHUB_TOKEN";

#[derive(Debug, Deserialize)]
pub struct RepoInfo {
    #[serde(default)]
    pub default_branch: Option<String>,
}

/// One item of a directory listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileContent {
    pub path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// Authenticated GitHub REST client.
///
/// Requests are serialized through a throttle so consecutive calls are at
/// least `request_interval` apart. Nothing is retried.
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
    interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    /// # Errors
    ///
    /// Returns [`GitHubError::MissingToken`] for a blank token, or an HTTP
    /// error if the client cannot be built.
    pub fn new(token: impl Into<String>) -> Result<Self, GitHubError> {
        Self::with_timeout(token, DEFAULT_REQUEST_TIMEOUT)
    }

    /// # Errors
    ///
    /// Same as [`GitHubClient::new`].
    pub fn with_timeout(token: impl Into<String>, timeout: Duration) -> Result<Self, GitHubError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(GitHubError::MissingToken);
        }
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .user_agent(concat!("gitctx/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            api_url: DEFAULT_API_URL.to_owned(),
            token,
            interval: DEFAULT_REQUEST_INTERVAL,
            last_request: Mutex::new(None),
        })
    }

    /// Build a client from the `GITHUB_TOKEN` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`GitHubError::MissingToken`] when the variable is unset or blank.
    pub fn from_env() -> Result<Self, GitHubError> {
        let token = std::env::var(TOKEN_ENV).map_err(|_| GitHubError::MissingToken)?;
        Self::new(token)
    }

    /// Override the API root. Used by tests and GitHub Enterprise setups.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_owned();
        self
    }

    #[must_use]
    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Wait until at least the configured interval has passed since the
    /// previous request, then record this one.
    pub async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// # Errors
    ///
    /// Returns [`GitHubError::RepositoryNotFound`] on 404, or a fetch/HTTP error.
    pub async fn repository(&self, owner: &str, name: &str) -> Result<RepoInfo, GitHubError> {
        let url = self.endpoint(&["repos", owner, name], None)?;
        let resp = self.get_api(&url).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(GitHubError::RepositoryNotFound(format!("{owner}/{name}")));
        }
        let resp = ensure_success(resp)?;
        Ok(resp.json().await?)
    }

    /// List a directory; `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns a fetch error for non-404 failures.
    pub async fn list_directory(
        &self,
        owner: &str,
        name: &str,
        path: &str,
        branch: &str,
    ) -> Result<Option<Vec<ContentEntry>>, GitHubError> {
        let url = self.contents_url(owner, name, path, branch)?;
        let resp = self.get_api(&url).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = ensure_success(resp)?;
        Ok(Some(resp.json().await?))
    }

    /// Metadata and inline content of one file; `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns a fetch error for non-404 failures.
    pub async fn file(
        &self,
        owner: &str,
        name: &str,
        path: &str,
        branch: &str,
    ) -> Result<Option<FileContent>, GitHubError> {
        let url = self.contents_url(owner, name, path, branch)?;
        let resp = self.get_api(&url).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = ensure_success(resp)?;
        Ok(Some(resp.json().await?))
    }

    /// Fetch a raw `download_url` body as text.
    ///
    /// # Errors
    ///
    /// Returns a fetch error on any non-success status.
    pub async fn download_raw(&self, url: &str) -> Result<String, GitHubError> {
        self.throttle().await;
        tracing::debug!(url, "downloading raw file");
        let resp = self.http.get(url).send().await?;
        let resp = ensure_success(resp)?;
        Ok(resp.text().await?)
    }

    async fn get_api(&self, url: &Url) -> Result<reqwest::Response, GitHubError> {
        self.throttle().await;
        tracing::debug!(%url, "GitHub API request");
        Ok(self
            .http
            .get(url.clone())
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .send()
            .await?)
    }

    fn contents_url(
        &self,
        owner: &str,
        name: &str,
        path: &str,
        branch: &str,
    ) -> Result<Url, GitHubError> {
        let mut segments = vec!["repos", owner, name, "contents"];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        self.endpoint(&segments, Some(branch))
    }

    fn endpoint(&self, segments: &[&str], branch: Option<&str>) -> Result<Url, GitHubError> {
        let mut url = Url::parse(&self.api_url)
            .map_err(|e| GitHubError::InvalidUrl(format!("{}: {e}", self.api_url)))?;
        url.path_segments_mut()
            .map_err(|()| GitHubError::InvalidUrl(self.api_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        if let Some(branch) = branch {
            url.query_pairs_mut().append_pair("ref", branch);
        }
        Ok(url)
    }
}

fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, GitHubError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    tracing::error!(url = %resp.url(), status = status.as_u16(), "GitHub request failed");
    Err(GitHubError::Fetch {
        url: resp.url().to_string(),
        status: status.as_u16(),
    })
}
