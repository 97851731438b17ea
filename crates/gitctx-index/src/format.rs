//! Markdown rendering of retrieval results for LLM context.

use std::fmt::Write as _;

use gitctx_memory::ScoredDocument;

pub const NO_RESULTS: &str = "No relevant information found.";

/// Render results as numbered markdown sections, in the order given.
#[must_use]
pub fn format_results(results: &[ScoredDocument]) -> String {
    if results.is_empty() {
        return NO_RESULTS.to_owned();
    }

    let mut out = String::from("## Search Results\n\n");
    for (i, result) in results.iter().enumerate() {
        let meta = &result.document.metadata;
        let page = meta
            .page
            .map(|p| format!(" (page: {})", u64::from(p) + 1))
            .unwrap_or_default();
        let _ = write!(
            out,
            "### Result {}{page}\n\n{}\n\nSource: {}\n\n---\n\n",
            i + 1,
            result.document.content,
            meta.path
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use gitctx_memory::Collection;
    use gitctx_memory::document::{Document, DocumentMetadata};

    use super::*;

    fn scored(content: &str, path: &str, page: Option<u32>) -> ScoredDocument {
        ScoredDocument {
            document: Document::new(
                content,
                DocumentMetadata {
                    path: path.into(),
                    page,
                    ..DocumentMetadata::default()
                },
            ),
            collection: Collection::Code,
            score: 0.9,
        }
    }

    #[test]
    fn empty_results() {
        assert_eq!(format_results(&[]), "No relevant information found.");
    }

    #[test]
    fn numbered_sections_in_order() {
        let out = format_results(&[
            scored("def add(a, b): ...", "/src/example.py", None),
            scored("How does add work?", "/src/example.py", None),
        ]);
        assert_eq!(
            out,
            "## Search Results\n\n\
             ### Result 1\n\ndef add(a, b): ...\n\nSource: /src/example.py\n\n---\n\n\
             ### Result 2\n\nHow does add work?\n\nSource: /src/example.py\n\n---\n\n"
        );
    }

    #[test]
    fn page_is_one_based() {
        let out = format_results(&[scored("text", "/doc.pdf", Some(0))]);
        assert!(out.contains("### Result 1 (page: 1)\n\n"));
    }
}
