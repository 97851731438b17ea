use serde::{Deserialize, Serialize};

use crate::clone::CloneFetcher;
use crate::error::GitHubError;
use crate::fetcher::ApiFetcher;
use crate::types::FetchedRepository;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Api,
    Clone,
}

/// Repository source selected at startup.
#[derive(Debug)]
pub enum AnySource {
    Api(ApiFetcher),
    Clone(CloneFetcher),
}

impl AnySource {
    /// # Errors
    ///
    /// Propagates the underlying fetcher's error.
    pub async fn fetch(&self, url: &str) -> Result<FetchedRepository, GitHubError> {
        match self {
            Self::Api(f) => f.fetch(url).await,
            Self::Clone(f) => f.fetch(url).await,
        }
    }

    #[must_use]
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Api(_) => SourceKind::Api,
            Self::Clone(_) => SourceKind::Clone,
        }
    }
}

impl From<ApiFetcher> for AnySource {
    fn from(f: ApiFetcher) -> Self {
        Self::Api(f)
    }
}

impl From<CloneFetcher> for AnySource {
    fn from(f: CloneFetcher) -> Self {
        Self::Clone(f)
    }
}
