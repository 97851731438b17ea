use std::future::Future;

use super::PipelineError;

/// One typed stage of a [`Pipeline`](super::Pipeline).
pub trait Step: Send + Sync {
    type Input: Send;
    type Output: Send;

    /// Short label used in logs.
    fn name(&self) -> &'static str;

    fn run(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = Result<Self::Output, PipelineError>> + Send;
}
