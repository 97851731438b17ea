use std::path::Path;

use serde::Serialize;

/// A repository resolved from its URL plus the default-branch lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryReference {
    pub url: String,
    pub owner: String,
    pub name: String,
    pub branch: String,
}

/// A text file that passed the value filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Repository-relative path, `/`-separated, no leading slash.
    pub path: String,
    pub name: String,
    pub content: String,
    /// Lowercased, without the leading dot; empty when the file has none.
    pub extension: String,
    pub repo_url: String,
    pub size: u64,
}

impl SourceFile {
    #[must_use]
    pub fn new(repo_url: &str, path: &str, content: String, size: u64) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path).to_owned();
        Self {
            extension: extension_of(path),
            name,
            path: path.to_owned(),
            content,
            repo_url: repo_url.to_owned(),
            size,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchedRepository {
    pub reference: RepositoryReference,
    pub files: Vec<SourceFile>,
}

/// Lowercased extension without the dot, `""` for dotfiles and bare names.
#[must_use]
pub fn extension_of(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}
