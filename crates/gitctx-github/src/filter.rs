//! Decides which repository files are worth indexing.

use std::path::Path;

/// Files larger than this are never downloaded or indexed.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Skipped before any content request is made.
pub const BINARY_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".pdf", ".zip", ".exe"];

const IGNORED_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".ico", ".svg", ".mp3", ".mp4", ".avi", ".mov",
    ".wav", ".ogg", ".zip", ".tar", ".gz", ".rar", ".7z", ".pyc", ".class", ".o", ".obj", ".dll",
    ".so", ".dylib", ".min.js", ".min.css", ".lock", ".log", ".tmp", ".temp", ".db", ".sqlite",
    ".sqlite3",
];

const IGNORED_PATH_PATTERNS: &[&str] = &[
    "node_modules/",
    ".git/",
    "__pycache__/",
    ".venv/",
    "venv/",
    "env/",
    ".env/",
    ".DS_Store",
    "Thumbs.db",
    "dist/",
    "build/",
    "out/",
    ".pytest_cache/",
    ".ruff_cache/",
    ".next/",
    ".nuxt/",
    ".vscode/",
    ".idea/",
    ".vs/",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
];

const CODE_EXTENSIONS: &[&str] = &[
    ".py", ".js", ".ts", ".jsx", ".tsx", ".java", ".c", ".cpp", ".h", ".hpp", ".cs", ".go", ".rb",
    ".php", ".swift", ".kt", ".rs", ".sh", ".pl", ".scala", ".m", ".lua", ".ex", ".exs", ".erl",
    ".hs", ".dart",
];

const DOC_EXTENSIONS: &[&str] = &[
    ".md", ".txt", ".rst", ".html", ".htm", ".xml", ".json", ".yaml", ".yml",
];

const NUL_SCAN_CHARS: usize = 1000;
const MIN_TEXT_LEN: usize = 10;
const CODE_MIN_NEWLINES: usize = 5;
const DOC_MIN_LEN: usize = 100;
const OTHER_MIN_LEN: usize = 200;

#[must_use]
pub fn is_binary_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    BINARY_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Applies the checks in order; the first one that decides wins.
#[must_use]
pub fn is_valuable_text(text: &str, path: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    if text.chars().take(NUL_SCAN_CHARS).any(|c| c == '\0') {
        return false;
    }

    let lower = path.to_ascii_lowercase();
    if IGNORED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return false;
    }
    if IGNORED_PATH_PATTERNS.iter().any(|p| path.contains(p)) {
        return false;
    }
    if text.len() as u64 > MAX_FILE_SIZE {
        return false;
    }

    let trimmed_len = trimmed.chars().count();
    if trimmed_len < MIN_TEXT_LEN {
        return false;
    }

    let ext = dotted_extension(&lower);
    if CODE_EXTENSIONS.contains(&ext.as_str()) && text.matches('\n').count() > CODE_MIN_NEWLINES {
        return true;
    }
    if DOC_EXTENSIONS.contains(&ext.as_str()) && trimmed_len > DOC_MIN_LEN {
        return true;
    }
    trimmed_len > OTHER_MIN_LEN
}

fn dotted_extension(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default()
}
