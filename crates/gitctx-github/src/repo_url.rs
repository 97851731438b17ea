use url::Url;

use crate::error::GitHubError;

const GITHUB_HOST: &str = "github.com";

/// Owner and name extracted from a normalized GitHub URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRepoUrl {
    pub url: String,
    pub owner: String,
    pub name: String,
}

/// Trim surrounding whitespace, then strip trailing `/` and `.git` until
/// neither remains. Applying it twice gives the same result as once.
#[must_use]
pub fn normalize_url(url: &str) -> String {
    let mut s = url.trim();
    loop {
        if let Some(rest) = s.strip_suffix('/') {
            s = rest.trim_end();
        } else if let Some(rest) = s.strip_suffix(".git") {
            s = rest.trim_end();
        } else {
            break;
        }
    }
    s.to_owned()
}

/// # Errors
///
/// Returns [`GitHubError::InvalidUrl`] when the URL does not parse, is not
/// hosted on `github.com`, or lacks an `owner/name` path.
pub fn parse_repo_url(raw: &str) -> Result<ParsedRepoUrl, GitHubError> {
    let normalized = normalize_url(raw);
    let parsed =
        Url::parse(&normalized).map_err(|e| GitHubError::InvalidUrl(format!("{normalized}: {e}")))?;

    if parsed.host_str() != Some(GITHUB_HOST) {
        return Err(GitHubError::InvalidUrl(format!(
            "{normalized}: host must be {GITHUB_HOST}"
        )));
    }

    let mut segments = parsed
        .path_segments()
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty());
    let (Some(owner), Some(name)) = (segments.next(), segments.next()) else {
        return Err(GitHubError::InvalidUrl(format!(
            "{normalized}: expected https://github.com/<owner>/<name>"
        )));
    };

    Ok(ParsedRepoUrl {
        owner: owner.to_owned(),
        name: name.to_owned(),
        url: normalized,
    })
}
