use serde::{Deserialize, Serialize};

/// Provenance carried by every chunk and by the questions generated from it.
///
/// `path` is the repository-relative file path with a leading `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub repo_url: String,
    pub path: String,
    pub filename: String,
    pub extension: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default)]
    pub chunk_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    #[must_use]
    pub fn new(content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    #[must_use]
    pub fn has_path(&self) -> bool {
        !self.metadata.path.trim().is_empty()
    }
}
