use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;

use crate::error::GitHubError;
use crate::filter::{MAX_FILE_SIZE, is_binary_path, is_valuable_text};
use crate::repo_url::{ParsedRepoUrl, parse_repo_url};
use crate::types::{FetchedRepository, RepositoryReference, SourceFile};

/// Fetches a repository with a shallow `git clone` into a temporary
/// directory that is removed when the fetch returns, successfully or not.
pub const DEFAULT_CLONE_TIMEOUT: Duration = Duration::from_secs(300);

/// git stderr fragments for a missing or private remote.
const NOT_FOUND_MARKERS: &[&str] = &[
    "repository not found",
    "could not read username",
    "terminal prompts disabled",
];

#[derive(Debug, Clone)]
pub struct CloneFetcher {
    git: PathBuf,
    timeout: Duration,
}

impl Default for CloneFetcher {
    fn default() -> Self {
        Self {
            git: PathBuf::from("git"),
            timeout: DEFAULT_CLONE_TIMEOUT,
        }
    }
}

impl CloneFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific `git` executable.
    #[must_use]
    pub fn with_git(mut self, git: impl Into<PathBuf>) -> Self {
        self.git = git.into();
        self
    }

    /// The clone is killed once it runs longer than `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// # Errors
    ///
    /// Returns [`GitHubError::InvalidUrl`],
    /// [`GitHubError::RepositoryNotFound`] when the remote is missing or
    /// private, [`GitHubError::Clone`] when git fails or times out, or an IO
    /// error for the temporary directory.
    pub async fn fetch(&self, url: &str) -> Result<FetchedRepository, GitHubError> {
        let started = Instant::now();
        let parsed = parse_repo_url(url)?;
        let checkout = tempfile::Builder::new().prefix("gitctx-").tempdir()?;
        let target = checkout.path().join(&parsed.name);

        tracing::info!(repo = %parsed.url, dir = %target.display(), "cloning repository");
        let mut clone = Command::new(&self.git);
        clone
            .args(["clone", "--depth", "1", "--quiet", &parsed.url])
            .arg(&target)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true);
        let output = tokio::time::timeout(self.timeout, clone.output())
            .await
            .map_err(|_| {
                GitHubError::Clone(format!("timed out after {}s", self.timeout.as_secs_f32()))
            })?
            .map_err(|e| GitHubError::Clone(format!("failed to run git: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            return Err(clone_failure(&parsed, stderr));
        }

        let branch = self.current_branch(&target).await;
        let walk_root = target.clone();
        let repo_url = parsed.url.clone();
        let files = tokio::task::spawn_blocking(move || walk_checkout(&walk_root, &repo_url))
            .await
            .map_err(|e| GitHubError::Clone(format!("checkout walk failed: {e}")))?;

        tracing::info!(
            repo = %parsed.url,
            %branch,
            files = files.len(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "repository cloned"
        );
        drop(checkout);

        Ok(FetchedRepository {
            reference: RepositoryReference {
                url: parsed.url,
                owner: parsed.owner,
                name: parsed.name,
                branch,
            },
            files,
        })
    }

    async fn current_branch(&self, checkout: &Path) -> String {
        let output = Command::new(&self.git)
            .arg("-C")
            .arg(checkout)
            .args(["rev-parse", "--abbrev-ref", "HEAD"])
            .output()
            .await;
        match output {
            Ok(out) if out.status.success() => {
                let branch = String::from_utf8_lossy(&out.stdout).trim().to_owned();
                if branch.is_empty() {
                    "main".to_owned()
                } else {
                    branch
                }
            }
            Ok(out) => {
                tracing::warn!(
                    "git rev-parse failed: {}",
                    String::from_utf8_lossy(&out.stderr).trim()
                );
                "main".to_owned()
            }
            Err(e) => {
                tracing::warn!("git rev-parse failed: {e}");
                "main".to_owned()
            }
        }
    }
}

fn clone_failure(parsed: &ParsedRepoUrl, stderr: String) -> GitHubError {
    let lower = stderr.to_ascii_lowercase();
    if NOT_FOUND_MARKERS.iter().any(|m| lower.contains(m)) {
        tracing::debug!(repo = %parsed.url, %stderr, "git reports repository missing");
        GitHubError::RepositoryNotFound(format!("{}/{}", parsed.owner, parsed.name))
    } else {
        GitHubError::Clone(stderr)
    }
}

/// Read every file under `root` that passes the binary, size, and value
/// filters, skipping `.git`. Paths are relative to `root` and `/`-separated.
#[must_use]
pub fn walk_checkout(root: &Path, repo_url: &str) -> Vec<SourceFile> {
    let walker = ignore::WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .filter_entry(|e| e.file_name() != ".git")
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("walk error: {e}");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if is_binary_path(&rel) {
            continue;
        }
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        if size > MAX_FILE_SIZE {
            tracing::warn!(path = %rel, size, "file too large, skipping");
            continue;
        }
        let text = match std::fs::read(entry.path()).map(String::from_utf8) {
            Ok(Ok(text)) => text,
            Ok(Err(_)) => {
                tracing::debug!(path = %rel, "not UTF-8, skipping");
                continue;
            }
            Err(e) => {
                tracing::warn!(path = %rel, "failed to read file: {e}");
                continue;
            }
        };
        if is_valuable_text(&text, &rel) {
            files.push(SourceFile::new(repo_url, &rel, text, size));
        }
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    files
}
