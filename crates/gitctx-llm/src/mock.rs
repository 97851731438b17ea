//! Test-only mock LLM provider.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::LlmError;
use crate::provider::{FunctionDefinition, LlmProvider, Message};

type Responder = Arc<dyn Fn(&[Message]) -> serde_json::Value + Send + Sync>;
type DelayFn = Arc<dyn Fn(&[Message]) -> u64 + Send + Sync>;

#[derive(Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<serde_json::Value>>>,
    responder: Option<Responder>,
    embeddings: Arc<HashMap<String, Vec<f32>>>,
    pub default_response: serde_json::Value,
    pub embedding: Vec<f32>,
    pub supports_embeddings: bool,
    pub fail_calls: bool,
    pub fail_embed: bool,
    /// Embedding calls that succeed before every later one fails.
    pub fail_embed_after: Option<usize>,
    /// Milliseconds to sleep before returning a function-call response.
    pub delay_ms: u64,
    delay_by: Option<DelayFn>,
    embed_calls: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl std::fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockProvider")
            .field("default_response", &self.default_response)
            .field("supports_embeddings", &self.supports_embeddings)
            .field("fail_calls", &self.fail_calls)
            .field("delay_ms", &self.delay_ms)
            .finish_non_exhaustive()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            responder: None,
            embeddings: Arc::new(HashMap::new()),
            default_response: serde_json::json!({"questions": []}),
            embedding: vec![0.0; 3],
            supports_embeddings: true,
            fail_calls: false,
            fail_embed: false,
            fail_embed_after: None,
            delay_ms: 0,
            delay_by: None,
            embed_calls: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl MockProvider {
    /// Queue function-call responses, returned in order.
    #[must_use]
    pub fn with_responses(responses: Vec<serde_json::Value>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    /// Compute each function-call response from the request messages.
    #[must_use]
    pub fn with_responder(
        responder: impl Fn(&[Message]) -> serde_json::Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Some(Arc::new(responder)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_calls: true,
            ..Self::default()
        }
    }

    /// Exact-text embedding table; unknown texts get `self.embedding`.
    #[must_use]
    pub fn with_embeddings<I, S>(mut self, table: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: Into<String>,
    {
        self.embeddings = Arc::new(table.into_iter().map(|(k, v)| (k.into(), v)).collect());
        self
    }

    #[must_use]
    pub fn with_default_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    #[must_use]
    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    /// Per-request delay computed from the messages; overrides `delay_ms`.
    #[must_use]
    pub fn with_delay_by(
        mut self,
        delay: impl Fn(&[Message]) -> u64 + Send + Sync + 'static,
    ) -> Self {
        self.delay_by = Some(Arc::new(delay));
        self
    }

    #[must_use]
    pub fn with_failing_embeddings(mut self) -> Self {
        self.fail_embed = true;
        self
    }

    /// Let the first `successes` embedding calls through, then fail.
    #[must_use]
    pub fn with_embed_failure_after(mut self, successes: usize) -> Self {
        self.fail_embed_after = Some(successes);
        self
    }

    #[must_use]
    pub fn without_embeddings(mut self) -> Self {
        self.supports_embeddings = false;
        self
    }

    /// Number of function calls received so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of function calls observed running at once.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn next_response(&self, messages: &[Message]) -> serde_json::Value {
        if let Some(ref responder) = self.responder {
            return responder(messages);
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            self.default_response.clone()
        } else {
            responses.remove(0)
        }
    }
}

impl LlmProvider for MockProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        if !self.supports_embeddings {
            return Err(LlmError::EmbedUnsupported { provider: "mock" });
        }
        let seen = self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_embed || self.fail_embed_after.is_some_and(|limit| seen >= limit) {
            return Err(LlmError::Other("mock embedding error".into()));
        }
        Ok(self
            .embeddings
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.embedding.clone()))
    }

    fn supports_embeddings(&self) -> bool {
        self.supports_embeddings
    }

    async fn call_function(
        &self,
        messages: &[Message],
        _function: &FunctionDefinition,
    ) -> Result<serde_json::Value, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let response = self.next_response(messages);
        let delay = self
            .delay_by
            .as_ref()
            .map_or(self.delay_ms, |delay_by| delay_by(messages));
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_calls {
            return Err(LlmError::Other("mock LLM error".into()));
        }
        Ok(response)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
