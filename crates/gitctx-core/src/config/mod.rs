mod env;
mod types;


pub use types::*;

use std::path::Path;

use anyhow::{Context, ensure};

use crate::vault::{Secret, VaultProvider};

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";

impl Config {
    /// Load configuration from a TOML file, then apply `GITCTX_*` overrides.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str::<Self>(&content)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an error naming the first setting that cannot work.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.retrieval.top_k > 0, "retrieval.top_k must be at least 1");
        ensure!(
            (0.0..=1.0).contains(&self.retrieval.score_threshold),
            "retrieval.score_threshold must be within [0, 1], got {}",
            self.retrieval.score_threshold
        );
        if let Some(t) = self.retrieval.rescope_threshold {
            ensure!(
                (0.0..=1.0).contains(&t),
                "retrieval.rescope_threshold must be within [0, 1], got {t}"
            );
        }
        ensure!(
            self.ingest.max_concurrent_fetches > 0,
            "ingest.max_concurrent_fetches must be at least 1"
        );
        ensure!(
            self.ingest.question_concurrency > 0,
            "ingest.question_concurrency must be at least 1"
        );
        ensure!(
            self.llm.embedding_dimensions > 0,
            "llm.embedding_dimensions must be at least 1"
        );
        ensure!(
            self.github.clone_timeout_secs > 0,
            "github.clone_timeout_secs must be at least 1"
        );
        ensure!(!self.mcp.host.trim().is_empty(), "mcp.host must not be empty");
        let code = self.store.code_collection.trim();
        let questions = self.store.question_collection.trim();
        ensure!(
            !code.is_empty() && !questions.is_empty(),
            "store collection names must not be empty"
        );
        ensure!(
            code != questions,
            "store.code_collection and store.question_collection must differ, both are {code:?}"
        );
        Ok(())
    }

    /// Fill [`ResolvedSecrets`] from the vault.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault backend fails.
    pub async fn resolve_secrets(&mut self, vault: &dyn VaultProvider) -> anyhow::Result<()> {
        if let Some(val) = vault.get_secret(OPENAI_API_KEY).await? {
            self.secrets.openai_api_key = Some(Secret::new(val));
        }
        if let Some(val) = vault.get_secret(GITHUB_TOKEN).await? {
            self.secrets.github_token = Some(Secret::new(val));
        }
        Ok(())
    }
}
