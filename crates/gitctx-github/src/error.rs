#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    #[error("invalid GitHub repository URL: {0}")]
    InvalidUrl(String),

    #[error("repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("GitHub request to {url} failed with status {status}")]
    Fetch { url: String, status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GITHUB_TOKEN is not set")]
    MissingToken,

    #[error("git clone failed: {0}")]
    Clone(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
