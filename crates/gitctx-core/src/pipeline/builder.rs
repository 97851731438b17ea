use std::future::Future;
use std::time::Instant;

use super::PipelineError;
use super::step::Step;

/// A chain of steps that can be run as a whole.
pub trait Stages: Send + Sync {
    type Input: Send;
    type Output: Send;

    fn run(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = Result<Self::Output, PipelineError>> + Send;

    fn names(&self, out: &mut Vec<&'static str>);
}

async fn timed<S: Step>(step: &S, input: S::Input) -> Result<S::Output, PipelineError> {
    let started = Instant::now();
    let result = step.run(input).await;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    match &result {
        Ok(_) => tracing::debug!(step = step.name(), elapsed_ms, "pipeline step finished"),
        Err(e) => tracing::warn!(step = step.name(), elapsed_ms, "pipeline step failed: {e}"),
    }
    result
}

pub struct First<S>(S);

impl<S: Step> Stages for First<S> {
    type Input = S::Input;
    type Output = S::Output;

    async fn run(&self, input: Self::Input) -> Result<Self::Output, PipelineError> {
        timed(&self.0, input).await
    }

    fn names(&self, out: &mut Vec<&'static str>) {
        out.push(self.0.name());
    }
}

pub struct Then<Prev, Next> {
    prev: Prev,
    next: Next,
}

impl<Prev, Next> Stages for Then<Prev, Next>
where
    Prev: Stages,
    Next: Step<Input = Prev::Output>,
{
    type Input = Prev::Input;
    type Output = Next::Output;

    async fn run(&self, input: Self::Input) -> Result<Self::Output, PipelineError> {
        let intermediate = self.prev.run(input).await?;
        timed(&self.next, intermediate).await
    }

    fn names(&self, out: &mut Vec<&'static str>) {
        self.prev.names(out);
        out.push(self.next.name());
    }
}

/// Sequential pipeline whose step types line up at compile time.
pub struct Pipeline<S> {
    stages: S,
}

impl Pipeline<()> {
    #[must_use]
    pub fn start<S: Step>(step: S) -> Pipeline<First<S>> {
        Pipeline {
            stages: First(step),
        }
    }
}

impl<S> Pipeline<S> {
    #[must_use]
    pub fn step<T: Step>(self, step: T) -> Pipeline<Then<S, T>> {
        Pipeline {
            stages: Then {
                prev: self.stages,
                next: step,
            },
        }
    }
}

impl<S: Stages> Pipeline<S> {
    /// Step names in execution order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        self.stages.names(&mut names);
        names
    }

    /// # Errors
    ///
    /// Returns the error of the first failing step; later steps do not run.
    pub async fn run(&self, input: S::Input) -> Result<S::Output, PipelineError> {
        self.stages.run(input).await
    }
}
