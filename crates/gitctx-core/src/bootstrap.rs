//! Application bootstrap: config resolution and construction of the provider,
//! vector store, repository source, and service.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use gitctx_github::{AnySource, ApiFetcher, CloneFetcher, GitHubClient, SourceKind};
use gitctx_index::RetrievalConfig;
use gitctx_llm::openai::OpenAiProvider;
use gitctx_memory::{CollectionNames, DualIndexStore, InMemoryVectorStore, QdrantOps, VectorStore};

use crate::config::{Config, GITHUB_TOKEN, OPENAI_API_KEY, StoreBackend};
use crate::service::RepoContextService;
use crate::vault::{EnvVaultProvider, VaultProvider};

pub struct AppBuilder {
    config: Config,
    config_path: PathBuf,
}

impl AppBuilder {
    /// Load and validate the config at `path`, resolving secrets from the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be parsed or is invalid.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        Self::load_with_vault(path, &EnvVaultProvider).await
    }

    /// # Errors
    ///
    /// Returns an error if the config cannot be parsed, is invalid, or the
    /// vault fails.
    pub async fn load_with_vault(path: &Path, vault: &dyn VaultProvider) -> anyhow::Result<Self> {
        let mut config = Config::load(path)?;
        config.validate()?;
        config.resolve_secrets(vault).await?;
        Ok(Self {
            config,
            config_path: path.to_owned(),
        })
    }

    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            config_path: PathBuf::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// # Errors
    ///
    /// Returns an error if `OPENAI_API_KEY` is not set.
    pub fn build_provider(&self) -> anyhow::Result<OpenAiProvider> {
        let llm = &self.config.llm;
        let api_key = self
            .config
            .secrets
            .openai_api_key
            .as_ref()
            .with_context(|| format!("{OPENAI_API_KEY} is required for embeddings and question generation"))?;
        let client = gitctx_llm::http::client_with_timeout(Duration::from_secs(llm.timeout_secs));
        Ok(OpenAiProvider::new(
            api_key.expose().to_owned(),
            llm.base_url.clone(),
            llm.model.clone(),
            llm.max_tokens,
            Some(llm.embedding_model.clone()),
        )
        .with_client(client))
    }

    /// # Errors
    ///
    /// Returns an error if the Qdrant client cannot be created.
    pub fn build_vector_store(&self) -> anyhow::Result<Arc<dyn VectorStore>> {
        let store = &self.config.store;
        let backend: Arc<dyn VectorStore> = match store.backend {
            StoreBackend::Qdrant => {
                let ops = QdrantOps::new(&store.qdrant_url)
                    .with_context(|| format!("failed to connect to Qdrant at {}", store.qdrant_url))?;
                tracing::info!(url = %store.qdrant_url, "using Qdrant vector store");
                Arc::new(ops)
            }
            StoreBackend::Memory => {
                tracing::info!("using in-memory vector store");
                Arc::new(InMemoryVectorStore::new())
            }
        };
        Ok(backend)
    }

    /// # Errors
    ///
    /// Returns an error if the API source is selected and `GITHUB_TOKEN` is
    /// not set.
    pub fn build_source(&self) -> anyhow::Result<AnySource> {
        let github = &self.config.github;
        Ok(match github.source {
            SourceKind::Api => {
                let token = self
                    .config
                    .secrets
                    .github_token
                    .as_ref()
                    .map(|t| t.expose().to_owned())
                    .unwrap_or_default();
                let client = GitHubClient::with_timeout(token, Duration::from_secs(github.timeout_secs))
                    .with_context(|| format!("{GITHUB_TOKEN} is required for the GitHub API source"))?
                    .with_api_url(github.api_url.clone())
                    .with_request_interval(Duration::from_millis(github.request_interval_ms));
                AnySource::from(ApiFetcher::new(client))
            }
            SourceKind::Clone => AnySource::from(
                CloneFetcher::new().with_timeout(Duration::from_secs(github.clone_timeout_secs)),
            ),
        })
    }

    /// Assemble the service. `with_source` controls whether a repository
    /// source (and its credentials) is required.
    ///
    /// # Errors
    ///
    /// Returns the first construction failure.
    pub fn build_service(&self, with_source: bool) -> anyhow::Result<RepoContextService<OpenAiProvider>> {
        let provider = Arc::new(self.build_provider()?);
        let store = self.build_vector_store()?;
        let names = CollectionNames {
            code: self.config.store.code_collection.clone(),
            questions: self.config.store.question_collection.clone(),
        };
        let index = DualIndexStore::new(
            store,
            provider,
            names,
            self.config.llm.embedding_dimensions,
        );

        let retrieval = &self.config.retrieval;
        let ingest = &self.config.ingest;
        let mut service = RepoContextService::new(Arc::new(index))
            .with_retrieval(RetrievalConfig {
                top_k: retrieval.top_k,
                score_threshold: retrieval.score_threshold,
                rescope_threshold: retrieval.rescope_threshold,
            })
            .with_max_concurrent_fetches(ingest.max_concurrent_fetches)
            .with_question_concurrency(ingest.question_concurrency)
            .with_question_generation(ingest.generate_questions);
        if with_source {
            service = service.with_source(self.build_source()?);
        }
        Ok(service)
    }
}

/// `--config` value, then `GITCTX_CONFIG`, then `config/default.toml`.
#[must_use]
pub fn resolve_config_path(cli: Option<&Path>) -> PathBuf {
    if let Some(path) = cli {
        return path.to_owned();
    }
    if let Ok(path) = std::env::var("GITCTX_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}
