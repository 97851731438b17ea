use std::collections::BTreeSet;

use serde::Serialize;

use crate::types::SourceFile;

pub const README_NOT_FOUND: &str = "README not found";
const README_CANDIDATES: &[&str] = &["README.md", "README.rst", "README.txt", "README"];

/// Shape of a fetched repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepositoryStructure {
    /// Every directory containing a fetched file, sorted.
    pub directories: Vec<String>,
    /// Distinct file extensions, sorted.
    pub languages: Vec<String>,
    pub file_count: usize,
}

impl RepositoryStructure {
    #[must_use]
    pub fn from_files(files: &[SourceFile]) -> Self {
        let mut directories = BTreeSet::new();
        let mut languages = BTreeSet::new();
        for file in files {
            let mut parent = file.path.as_str();
            while let Some((dir, _)) = parent.rsplit_once('/') {
                if dir.is_empty() || !directories.insert(dir.to_owned()) {
                    break;
                }
                parent = dir;
            }
            if !file.extension.is_empty() {
                languages.insert(file.extension.clone());
            }
        }
        Self {
            directories: directories.into_iter().collect(),
            languages: languages.into_iter().collect(),
            file_count: files.len(),
        }
    }
}

/// Content of the first root-level README, or [`README_NOT_FOUND`].
#[must_use]
pub fn find_readme(files: &[SourceFile]) -> String {
    README_CANDIDATES
        .iter()
        .find_map(|name| files.iter().find(|f| f.path == *name))
        .map_or_else(|| README_NOT_FOUND.to_owned(), |f| f.content.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, content: &str) -> SourceFile {
        SourceFile::new("https://github.com/o/r", path, content.to_owned(), 0)
    }

    #[test]
    fn structure_collects_nested_directories() {
        let files = vec![
            file("src/a/b/x.rs", ""),
            file("src/y.py", ""),
            file("docs/guide.md", ""),
            file("Makefile", ""),
        ];
        let s = RepositoryStructure::from_files(&files);
        assert_eq!(s.directories, vec!["docs", "src", "src/a", "src/a/b"]);
        assert_eq!(s.languages, vec!["md", "py", "rs"]);
        assert_eq!(s.file_count, 4);
    }

    #[test]
    fn readme_priority() {
        let files = vec![file("README.txt", "txt"), file("README.md", "md")];
        assert_eq!(find_readme(&files), "md");
    }

    #[test]
    fn nested_readme_is_ignored() {
        let files = vec![file("docs/README.md", "nested")];
        assert_eq!(find_readme(&files), README_NOT_FOUND);
    }

    #[test]
    fn bare_readme() {
        assert_eq!(find_readme(&[file("README", "plain")]), "plain");
    }
}
