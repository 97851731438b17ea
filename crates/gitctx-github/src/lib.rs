//! Repository acquisition for gitctx.

pub mod analysis;
pub mod client;
pub mod clone;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod repo_url;
pub mod source;
pub mod types;

pub use analysis::{RepositoryStructure, find_readme};
pub use client::GitHubClient;
pub use clone::CloneFetcher;
pub use error::GitHubError;
pub use fetcher::ApiFetcher;
pub use repo_url::{ParsedRepoUrl, normalize_url, parse_repo_url};
pub use source::{AnySource, SourceKind};
pub use types::{FetchedRepository, RepositoryReference, SourceFile};
