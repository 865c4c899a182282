//! Conditional edges: route to the next node based on state.
//!
//! A source node has a routing function that takes the current state and returns the next
//! node id. The id must be one of the edge's declared targets; anything else is a
//! configuration error at run time.
//!
//! **Interaction**: Used by `StateGraph::add_conditional_edges` and the `CompiledStateGraph`
//! run loop to resolve the next node after a node with conditional edges runs.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::AgentError;

/// Router function: takes a reference to state and returns the next node id (or `END`).
/// Must be pure: no side effects, same state in, same id out.
pub type ConditionalRouterFn<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// Conditional edge definition: routing function plus its allowed target set.
#[derive(Clone)]
pub struct ConditionalRouter<S> {
    pub(super) path: ConditionalRouterFn<S>,
    pub(super) targets: BTreeSet<String>,
}

impl<S> ConditionalRouter<S> {
    pub fn new(path: ConditionalRouterFn<S>, targets: BTreeSet<String>) -> Self {
        Self { path, targets }
    }

    /// Declared targets, sorted. Read by compile-time reachability checks.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(String::as_str)
    }
}

impl<S> ConditionalRouter<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{

    /// Resolves the next node id from the current state.
    ///
    /// Returns `AgentError::InvalidRoute` when the router answers outside `targets`.
    pub fn resolve_next(&self, from: &str, state: &S) -> Result<String, AgentError> {
        let target = (self.path)(state);
        if self.targets.contains(&target) {
            Ok(target)
        } else {
            Err(AgentError::InvalidRoute {
                from: from.to_string(),
                target,
            })
        }
    }
}

/// How to determine the next node after a given node runs.
///
/// Nodes absent from the compiled graph's next map are terminal.
#[derive(Clone)]
pub enum NextEntry<S> {
    /// Single fixed next node (or END).
    Unconditional(String),
    /// Next node is decided by the router from state.
    Conditional(ConditionalRouter<S>),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> ConditionalRouter<i32> {
        ConditionalRouter::new(
            Arc::new(|s: &i32| if *s > 0 { "pos".to_string() } else { "other".to_string() }),
            ["pos".to_string()].into_iter().collect(),
        )
    }

    /// **Scenario**: A declared target resolves; an undeclared one is InvalidRoute.
    #[test]
    fn resolve_next_checks_declared_targets() {
        let r = router();
        assert_eq!(r.resolve_next("a", &1).unwrap(), "pos");
        match r.resolve_next("a", &0) {
            Err(AgentError::InvalidRoute { from, target }) => {
                assert_eq!(from, "a");
                assert_eq!(target, "other");
            }
            other => panic!("expected InvalidRoute, got {:?}", other.map(|_| ())),
        }
    }

    /// Plain state with none of the run-loop bounds.
    struct Unbounded;

    /// **Scenario**: Declared targets are readable for any state type, sorted.
    #[test]
    fn targets_do_not_require_run_bounds() {
        let r: ConditionalRouter<Unbounded> = ConditionalRouter::new(
            Arc::new(|_: &Unbounded| "b".to_string()),
            ["b".to_string(), "a".to_string()].into_iter().collect(),
        );
        assert_eq!(r.targets().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
