//! Graph run error types.
//!
//! Returned by `Node::run` and `CompiledStateGraph::invoke`. Step failures are not errors at
//! this level: steps record them in the state's error slot and return `Ok`.

use thiserror::Error;

/// Fatal error that aborts a graph run.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A node failed outside its own error capture (e.g. a panic-free but unrecoverable fault).
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The run executed `limit` nodes without reaching a terminal node.
    #[error("recursion limit of {limit} reached without hitting a terminal node")]
    RecursionLimit { limit: usize },

    /// A conditional edge returned a target outside its declared set.
    #[error("conditional edge from {from} returned undeclared target {target}")]
    InvalidRoute { from: String, target: String },

    /// The graph has no node to start from.
    #[error("empty graph")]
    EmptyGraph,
}

impl AgentError {
    /// True for errors caused by graph wiring rather than by a node's own work.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AgentError::RecursionLimit { .. } | AgentError::InvalidRoute { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Display of ExecutionFailed contains "execution failed" and the message.
    #[test]
    fn agent_error_display_execution_failed() {
        let s = AgentError::ExecutionFailed("msg".to_string()).to_string();
        assert!(s.contains("execution failed"), "{}", s);
        assert!(s.contains("msg"), "{}", s);
    }

    /// **Scenario**: RecursionLimit and InvalidRoute are configuration failures; ExecutionFailed is not.
    #[test]
    fn agent_error_configuration_classification() {
        assert!(AgentError::RecursionLimit { limit: 3 }.is_configuration());
        assert!(AgentError::InvalidRoute {
            from: "a".into(),
            target: "zz".into()
        }
        .is_configuration());
        assert!(!AgentError::ExecutionFailed("x".into()).is_configuration());
        let s = AgentError::InvalidRoute {
            from: "a".into(),
            target: "zz".into(),
        }
        .to_string();
        assert!(s.contains("a") && s.contains("zz"), "{}", s);
    }
}
