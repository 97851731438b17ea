use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::client::GitHubClient;
use crate::error::GitHubError;
use crate::filter::{MAX_FILE_SIZE, is_binary_path, is_valuable_text};
use crate::repo_url::parse_repo_url;
use crate::types::{FetchedRepository, RepositoryReference, SourceFile};

const DEFAULT_BRANCH: &str = "main";

/// Walks a repository through the REST contents API, breadth first.
#[derive(Debug)]
pub struct ApiFetcher {
    client: GitHubClient,
}

impl ApiFetcher {
    #[must_use]
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }

    /// Parse `url` and look up the default branch.
    ///
    /// # Errors
    ///
    /// Returns [`GitHubError::InvalidUrl`], [`GitHubError::RepositoryNotFound`],
    /// or a transport error.
    pub async fn resolve(&self, url: &str) -> Result<RepositoryReference, GitHubError> {
        let parsed = parse_repo_url(url)?;
        let info = self.client.repository(&parsed.owner, &parsed.name).await?;
        Ok(RepositoryReference {
            url: parsed.url,
            owner: parsed.owner,
            name: parsed.name,
            branch: info
                .default_branch
                .unwrap_or_else(|| DEFAULT_BRANCH.to_owned()),
        })
    }

    /// Collect every file of the repository that passes the value filter.
    ///
    /// Missing files and directories are skipped; any other failed request
    /// aborts the walk.
    ///
    /// # Errors
    ///
    /// Returns the first non-404 request failure.
    pub async fn fetch(&self, url: &str) -> Result<FetchedRepository, GitHubError> {
        let started = Instant::now();
        let reference = self.resolve(url).await?;
        tracing::info!(
            repo = %reference.url,
            branch = %reference.branch,
            "fetching repository through the contents API"
        );

        let mut queue = VecDeque::from([String::new()]);
        let mut visited: HashSet<String> = HashSet::new();
        let mut files = Vec::new();

        while let Some(dir) = queue.pop_front() {
            if !visited.insert(dir.clone()) {
                continue;
            }
            let Some(entries) = self
                .client
                .list_directory(&reference.owner, &reference.name, &dir, &reference.branch)
                .await?
            else {
                tracing::warn!(path = %dir, "directory not found, skipping");
                continue;
            };
            tracing::debug!(path = %dir, entries = entries.len(), "listed directory");

            for entry in entries {
                match entry.kind.as_str() {
                    "dir" => queue.push_back(entry.path),
                    "file" => {
                        let Some(text) = self.file_text(&reference, &entry.path).await? else {
                            continue;
                        };
                        if is_valuable_text(&text, &entry.path) {
                            let size = text.len() as u64;
                            files.push(SourceFile::new(&reference.url, &entry.path, text, size));
                        } else {
                            tracing::debug!(path = %entry.path, "filtered out low-value file");
                        }
                    }
                    _ => {}
                }
            }
        }

        tracing::info!(
            repo = %reference.url,
            files = files.len(),
            directories = visited.len(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "repository fetched"
        );
        Ok(FetchedRepository { reference, files })
    }

    async fn file_text(
        &self,
        reference: &RepositoryReference,
        path: &str,
    ) -> Result<Option<String>, GitHubError> {
        if is_binary_path(path) {
            tracing::debug!(path, "skipping binary file");
            return Ok(None);
        }
        let Some(file) = self
            .client
            .file(&reference.owner, &reference.name, path, &reference.branch)
            .await?
        else {
            tracing::warn!(path, "file not found, skipping");
            return Ok(None);
        };
        if file.size > MAX_FILE_SIZE {
            tracing::warn!(path, size = file.size, "file too large, skipping");
            return Ok(None);
        }

        match (file.content, file.download_url) {
            (Some(content), _) if !content.is_empty() => Ok(decode_content(path, &content)),
            (_, Some(download_url)) => Ok(Some(self.client.download_raw(&download_url).await?)),
            _ => Ok(None),
        }
    }
}

/// Decode the contents API's line-wrapped base64; `None` if it is not UTF-8.
fn decode_content(path: &str, encoded: &str) -> Option<String> {
    let cleaned: String = encoded.chars().filter(|c| !matches!(c, '\n' | '\r')).collect();
    let bytes = match STANDARD.decode(cleaned) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path, "failed to decode base64 content: {e}");
            return None;
        }
    };
    match String::from_utf8(bytes) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!(path, "file is not valid UTF-8: {e}");
            None
        }
    }
}
