pub mod builder;
pub mod builtin;
pub mod step;

pub use builder::Pipeline;
pub use step::Step;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    GitHub(#[from] gitctx_github::GitHubError),

    #[error(transparent)]
    Index(#[from] gitctx_index::IndexError),

    #[error(transparent)]
    Memory(#[from] gitctx_memory::MemoryError),

    #[error("{0}")]
    Custom(String),
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gitctx_github::{
        AnySource, CloneFetcher, FetchedRepository, RepositoryReference, SourceFile,
    };
    use gitctx_index::{Chunker, QuestionGenerator};
    use gitctx_llm::mock::MockProvider;
    use gitctx_memory::{Collection, CollectionNames, DualIndexStore, InMemoryVectorStore};
    use serde_json::json;
    use tokio::sync::Semaphore;

    use super::builtin::{ChunkStep, ChunkedRepository, FetchStep, QuestionStep, StoreStep};
    use super::*;

    struct Append(&'static str);

    impl Step for Append {
        type Input = String;
        type Output = String;

        fn name(&self) -> &'static str {
            "append"
        }

        async fn run(&self, input: Self::Input) -> Result<Self::Output, PipelineError> {
            Ok(format!("{input}{}", self.0))
        }
    }

    struct CountChars;

    impl Step for CountChars {
        type Input = String;
        type Output = usize;

        fn name(&self) -> &'static str {
            "count"
        }

        async fn run(&self, input: Self::Input) -> Result<Self::Output, PipelineError> {
            Ok(input.chars().count())
        }
    }

    struct Fail;

    impl Step for Fail {
        type Input = String;
        type Output = String;

        fn name(&self) -> &'static str {
            "fail"
        }

        async fn run(&self, _input: Self::Input) -> Result<Self::Output, PipelineError> {
            Err(PipelineError::Custom("boom".into()))
        }
    }

    #[tokio::test]
    async fn steps_run_in_order_across_types() {
        let pipeline = Pipeline::start(Append(" world")).step(Append("!")).step(CountChars);
        assert_eq!(pipeline.step_names(), vec!["append", "append", "count"]);
        assert_eq!(pipeline.run("hello".into()).await.unwrap(), 12);
    }

    #[tokio::test]
    async fn failure_stops_later_steps() {
        let pipeline = Pipeline::start(Fail).step(CountChars);
        let err = pipeline.run("x".into()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Custom(ref m) if m == "boom"));
    }

    fn repository() -> FetchedRepository {
        let url = "https://github.com/octo/demo";
        let py = "def add(a, b):\n    return a + b\n\n\ndef sub(a, b):\n    return a - b\n";
        let md = format!("# Demo\n\n{}", "This project demonstrates retrieval. ".repeat(4));
        FetchedRepository {
            reference: RepositoryReference {
                url: url.into(),
                owner: "octo".into(),
                name: "demo".into(),
                branch: "main".into(),
            },
            files: vec![
                SourceFile::new(url, "src/example.py", py.into(), py.len() as u64),
                SourceFile::new(url, "README.md", md.clone(), md.len() as u64),
            ],
        }
    }

    fn provider() -> Arc<MockProvider> {
        Arc::new(
            MockProvider::with_responder(|_| {
                json!({"questions": ["What does it do?", "Why?", "What can fail?"]})
            })
            .with_default_embedding(vec![0.5, 0.5, 0.0]),
        )
    }

    #[tokio::test]
    async fn chunk_question_store_chain() {
        let provider = provider();
        let store = Arc::new(DualIndexStore::new(
            Arc::new(InMemoryVectorStore::new()),
            Arc::clone(&provider),
            CollectionNames::default(),
            3,
        ));
        let pipeline = Pipeline::start(ChunkStep::new(Chunker::new()))
            .step(QuestionStep::new(QuestionGenerator::new(Arc::clone(&provider)), true))
            .step(StoreStep::new(Arc::clone(&store)));

        let stored = pipeline.run(repository()).await.unwrap();
        assert_eq!(stored.document_chunks, 2);
        assert_eq!(stored.hypothetical_questions, 6);
        assert_eq!(stored.chunk_languages, vec!["markdown", "python"]);
        assert_eq!(store.count(Collection::Code).await.unwrap(), 2);
        assert_eq!(store.count(Collection::HypotheticalQuestion).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn disabled_question_step_passes_through() {
        let provider = provider();
        let step = QuestionStep::new(QuestionGenerator::new(Arc::clone(&provider)), false);
        let chunks = Chunker::new().split_files(&repository().files);
        let out = step
            .run(ChunkedRepository {
                repository: repository(),
                chunks,
            })
            .await
            .unwrap();
        assert!(out.questions.is_empty());
        assert_eq!(out.chunks.len(), 2);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn question_failure_is_index_error() {
        let step = QuestionStep::new(QuestionGenerator::new(Arc::new(MockProvider::failing())), true);
        let chunks = Chunker::new().split_files(&repository().files);
        let err = step
            .run(ChunkedRepository {
                repository: repository(),
                chunks,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Index(_)));
    }

    #[tokio::test]
    async fn fetch_step_surfaces_source_error() {
        let source = Arc::new(AnySource::from(CloneFetcher::new()));
        let step = FetchStep::new(source, Arc::new(Semaphore::new(1)));
        let err = step.run("not a url".into()).await.unwrap_err();
        assert!(matches!(err, PipelineError::GitHub(_)));
    }

    #[tokio::test]
    async fn fetch_step_fails_when_limiter_closed() {
        let admission = Arc::new(Semaphore::new(1));
        admission.close();
        let step = FetchStep::new(Arc::new(AnySource::from(CloneFetcher::new())), admission);
        let err = step
            .run("https://github.com/octo/demo".into())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("limiter closed"));
    }
}
