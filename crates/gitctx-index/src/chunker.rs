//! Language-aware splitting of fetched files into chunks.

use std::collections::{BTreeMap, HashMap};

use gitctx_github::SourceFile;
use gitctx_memory::document::{Document, DocumentMetadata, SplitterConfig, TextSplitter};

use crate::languages::Lang;

/// Splits files grouped by language, each group with its own splitter.
#[derive(Debug, Clone, Default)]
pub struct Chunker {
    overrides: HashMap<Lang, (usize, usize)>,
}

impl Chunker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the `(chunk_size, chunk_overlap)` used for one language.
    #[must_use]
    pub fn with_params(mut self, lang: Lang, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.overrides.insert(lang, (chunk_size, chunk_overlap));
        self
    }

    fn params(&self, lang: Lang) -> (usize, usize) {
        self.overrides
            .get(&lang)
            .copied()
            .unwrap_or_else(|| lang.chunk_params())
    }

    /// A language group whose splitter cannot be built is logged and left
    /// out; the other groups are still split.
    #[must_use]
    pub fn split_files(&self, files: &[SourceFile]) -> Vec<Document> {
        let mut groups: BTreeMap<Lang, Vec<&SourceFile>> = BTreeMap::new();
        for file in files {
            groups
                .entry(Lang::from_extension(&file.extension))
                .or_default()
                .push(file);
        }

        let mut chunks = Vec::new();
        for (lang, group) in groups {
            let (chunk_size, chunk_overlap) = self.params(lang);
            let splitter = match TextSplitter::new(SplitterConfig {
                chunk_size,
                chunk_overlap,
                separators: lang.separators().iter().map(ToString::to_string).collect(),
            }) {
                Ok(splitter) => splitter,
                Err(e) => {
                    tracing::warn!(language = %lang, files = group.len(), "skipping language group: {e}");
                    continue;
                }
            };

            let before = chunks.len();
            for file in group {
                chunks.extend(splitter.split(&file_document(file, lang)));
            }
            tracing::debug!(
                language = %lang,
                chunk_size,
                chunk_overlap,
                chunks = chunks.len() - before,
                "split language group"
            );
        }

        tracing::info!(files = files.len(), chunks = chunks.len(), "split files into chunks");
        chunks
    }
}

/// Split with the default per-language parameters.
#[must_use]
pub fn split_files(files: &[SourceFile]) -> Vec<Document> {
    Chunker::default().split_files(files)
}

fn file_document(file: &SourceFile, lang: Lang) -> Document {
    Document::new(
        file.content.clone(),
        DocumentMetadata {
            repo_url: file.repo_url.clone(),
            path: format!("/{}", file.path.trim_start_matches('/')),
            filename: file.name.clone(),
            extension: file.extension.clone(),
            language: lang.id().to_owned(),
            page: None,
            chunk_index: 0,
        },
    )
}
