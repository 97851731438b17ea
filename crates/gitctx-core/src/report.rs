//! Summary of one repository ingestion.

use std::fmt::Write as _;

use gitctx_github::{RepositoryReference, RepositoryStructure};
use serde::Serialize;

const MAIN_DIRECTORY_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub reference: RepositoryReference,
    pub structure: RepositoryStructure,
    pub readme: String,
    pub total_files: usize,
    pub document_chunks: usize,
    pub hypothetical_questions: usize,
    /// Languages of the stored chunks.
    pub languages: Vec<String>,
    /// Shallowest directories first.
    pub main_directories: Vec<String>,
    pub duration_ms: u64,
}

/// Up to five directories, ordered by depth and then name.
#[must_use]
pub fn main_directories(structure: &RepositoryStructure) -> Vec<String> {
    let mut dirs: Vec<&String> = structure.directories.iter().collect();
    dirs.sort_by_key(|d| d.split('/').count());
    dirs.into_iter()
        .take(MAIN_DIRECTORY_LIMIT)
        .cloned()
        .collect()
}

/// Markdown summary returned to MCP clients after an ingest.
#[must_use]
pub fn format_repository_report(report: &IngestReport) -> String {
    let mut out = String::from("## Repository Analysis\n\n### Overview\n");
    let _ = writeln!(out, "- **Repository URL**: {}", report.reference.url);
    let _ = writeln!(out, "- **Branch**: {}", report.reference.branch);
    let _ = writeln!(out, "- **Total files**: {}", report.total_files);
    let _ = writeln!(out, "- **Total chunks**: {}", report.document_chunks);
    let _ = writeln!(
        out,
        "- **Hypothetical questions**: {}",
        report.hypothetical_questions
    );

    out.push_str("\n### Structure\n");
    let _ = writeln!(
        out,
        "- **Directories**: {}",
        report.structure.directories.len()
    );
    let _ = writeln!(
        out,
        "- **Languages**: {}",
        report.structure.languages.join(", ")
    );
    if !report.main_directories.is_empty() {
        let _ = writeln!(
            out,
            "- **Main directories**: {}",
            report.main_directories.join(", ")
        );
    }

    let _ = write!(out, "\n### README\n\n{}\n", report.readme.trim_end());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> IngestReport {
        let structure = RepositoryStructure {
            directories: vec![
                "docs".into(),
                "src".into(),
                "src/core".into(),
                "src/core/inner".into(),
                "tests".into(),
                "web".into(),
                "zeta".into(),
            ],
            languages: vec!["md".into(), "py".into()],
            file_count: 12,
        };
        IngestReport {
            reference: RepositoryReference {
                url: "https://github.com/octo/demo".into(),
                owner: "octo".into(),
                name: "demo".into(),
                branch: "main".into(),
            },
            main_directories: main_directories(&structure),
            structure,
            readme: "# Demo\n\nA demo project.\n".into(),
            total_files: 12,
            document_chunks: 30,
            hypothetical_questions: 90,
            languages: vec!["markdown".into(), "python".into()],
            duration_ms: 1200,
        }
    }

    #[test]
    fn main_directories_prefer_shallow() {
        assert_eq!(
            report().main_directories,
            vec!["docs", "src", "tests", "web", "zeta"]
        );
    }

    #[test]
    fn main_directories_short_list() {
        let structure = RepositoryStructure {
            directories: vec!["a/b".into(), "a".into()],
            ..RepositoryStructure::default()
        };
        assert_eq!(main_directories(&structure), vec!["a", "a/b"]);
    }

    #[test]
    fn report_markdown() {
        let md = format_repository_report(&report());
        assert!(md.starts_with("## Repository Analysis\n"));
        assert!(md.contains("- **Repository URL**: https://github.com/octo/demo\n"));
        assert!(md.contains("- **Total files**: 12\n"));
        assert!(md.contains("- **Total chunks**: 30\n"));
        assert!(md.contains("- **Hypothetical questions**: 90\n"));
        assert!(md.contains("- **Directories**: 7\n"));
        assert!(md.contains("- **Languages**: md, py\n"));
        assert!(md.ends_with("### README\n\n# Demo\n\nA demo project.\n"));
    }

    #[test]
    fn report_serializes() {
        let value = serde_json::to_value(report()).unwrap();
        assert_eq!(value["reference"]["name"], "demo");
        assert_eq!(value["document_chunks"], 30);
    }
}
