//! Error guard: skip a node once the state carries an error.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::state::FaultState;

use super::{Node, RunContext};

/// Wraps a node so it passes state through untouched when `state.error()` is set.
///
/// **Interaction**: Built by [`guard`]; every business step of the pipeline is registered
/// through it so a fault drains the remaining edges without doing work.
pub struct ErrorGuard<S> {
    inner: Arc<dyn Node<S>>,
}

impl<S> ErrorGuard<S>
where
    S: FaultState + Clone + Send + Sync + Debug + 'static,
{
    pub fn new(inner: Arc<dyn Node<S>>) -> Self {
        Self { inner }
    }

    fn skip(&self, state: &S) -> bool {
        match state.error() {
            Some(error) => {
                tracing::debug!(node_id = self.inner.id(), error, "skipping node: state carries error");
                true
            }
            None => false,
        }
    }
}

/// Guards `node` with [`ErrorGuard`].
pub fn guard<S>(node: Arc<dyn Node<S>>) -> Arc<dyn Node<S>>
where
    S: FaultState + Clone + Send + Sync + Debug + 'static,
{
    Arc::new(ErrorGuard::new(node))
}

#[async_trait]
impl<S> Node<S> for ErrorGuard<S>
where
    S: FaultState + Clone + Send + Sync + Debug + 'static,
{
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn run(&self, state: S) -> Result<S, AgentError> {
        if self.skip(&state) {
            return Ok(state);
        }
        self.inner.run(state).await
    }

    async fn run_with_context(&self, state: S, ctx: &RunContext) -> Result<S, AgentError> {
        if self.skip(&state) {
            return Ok(state);
        }
        self.inner.run_with_context(state, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, Default)]
    struct Counted {
        runs: u32,
        error: Option<String>,
    }

    impl FaultState for Counted {
        fn error(&self) -> Option<&str> {
            self.error.as_deref()
        }
        fn set_error(&mut self, error: String) {
            self.error = Some(error);
        }
    }

    struct Bump;

    #[async_trait]
    impl Node<Counted> for Bump {
        fn id(&self) -> &str {
            "bump"
        }
        async fn run(&self, mut state: Counted) -> Result<Counted, AgentError> {
            state.runs += 1;
            Ok(state)
        }
    }

    /// **Scenario**: The guarded node runs normally and is skipped once an error is set.
    #[tokio::test]
    async fn guard_skips_on_error() {
        let node = guard::<Counted>(Arc::new(Bump));
        assert_eq!(node.id(), "bump");
        let s = node.run(Counted::default()).await.unwrap();
        assert_eq!(s.runs, 1);
        let mut faulty = Counted::default();
        faulty.set_error("boom".into());
        let s = node.run(faulty).await.unwrap();
        assert_eq!(s.runs, 0);
        assert_eq!(s.error(), Some("boom"));
    }
}
