use std::collections::VecDeque;

use super::error::DocumentError;
use super::types::{Document, DocumentMetadata};

/// Size limits are measured in characters, not bytes.
#[derive(Debug, Clone)]
pub struct SplitterConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Boundaries tried in order; an empty string splits between characters.
    pub separators: Vec<String>,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            separators: ["\n\n", "\n", " ", ""].map(String::from).to_vec(),
        }
    }
}

/// Recursive splitter: breaks text on the coarsest separator present, recurses
/// into pieces that are still too large, then merges neighbours back up to
/// `chunk_size` with `chunk_overlap` characters carried between chunks.
///
/// Separators stay attached to the start of the piece that follows them.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidConfig`] when `chunk_size` is zero or
    /// the overlap is not smaller than the chunk size.
    pub fn new(config: SplitterConfig) -> Result<Self, DocumentError> {
        if config.chunk_size == 0 {
            return Err(DocumentError::InvalidConfig(
                "chunk_size must be greater than zero".into(),
            ));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(DocumentError::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    #[must_use]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        self.split_recursive(text, &self.config.separators, &mut out);
        out
    }

    /// Split a document, copying its metadata onto each chunk with a
    /// sequential `chunk_index`.
    #[must_use]
    pub fn split(&self, document: &Document) -> Vec<Document> {
        self.split_text(&document.content)
            .into_iter()
            .enumerate()
            .map(|(i, content)| Document {
                content,
                metadata: DocumentMetadata {
                    chunk_index: i,
                    ..document.metadata.clone()
                },
            })
            .collect()
    }

    fn split_recursive(&self, text: &str, separators: &[String], out: &mut Vec<String>) {
        let (separator, rest) = pick_separator(text, separators);
        let mut good: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.config.chunk_size {
                good.push(piece);
                continue;
            }
            if !good.is_empty() {
                self.merge(&good, out);
                good.clear();
            }
            if rest.is_empty() {
                push_trimmed(out, piece);
            } else {
                self.split_recursive(piece, rest, out);
            }
        }

        if !good.is_empty() {
            self.merge(&good, out);
        }
    }

    fn merge(&self, pieces: &[&str], out: &mut Vec<String>) {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > size && !window.is_empty() {
                push_trimmed(out, &concat(&window));
                while total > overlap || (total + len > size && total > 0) {
                    let Some((_, front)) = window.pop_front() else {
                        break;
                    };
                    total -= front;
                }
            }
            window.push_back((piece, len));
            total += len;
        }

        if !window.is_empty() {
            push_trimmed(out, &concat(&window));
        }
    }
}

fn pick_separator<'s>(text: &str, separators: &'s [String]) -> (&'s str, &'s [String]) {
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() {
            return ("", &[]);
        }
        if text.contains(sep.as_str()) {
            return (sep, &separators[i + 1..]);
        }
    }
    ("", &[])
}

fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn concat(window: &VecDeque<(&str, usize)>) -> String {
    window.iter().map(|(piece, _)| *piece).collect()
}

fn push_trimmed(out: &mut Vec<String>, chunk: &str) {
    let trimmed = chunk.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_owned());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
