//! Logging helpers for graph execution.

/// Log graph execution start.
pub fn log_graph_start(thread_id: Option<&str>, checkpoint_ns: &str, first_node: &str) {
    tracing::info!(
        thread_id = thread_id.unwrap_or("-"),
        checkpoint_ns,
        first_node,
        "Starting graph execution"
    );
}

/// Log a resume from a stored checkpoint.
pub fn log_graph_resume(thread_id: &str, node_id: &str, step: usize, sequence: u64) {
    tracing::info!(thread_id, node_id, step, sequence, "Resuming graph from checkpoint");
}

/// Log node execution start.
pub fn log_node_start(node_id: &str, step: usize) {
    tracing::debug!(node_id, step, "Starting node execution");
}

/// Log node execution completion with the routing decision.
pub fn log_node_complete(node_id: &str, next: &str) {
    tracing::debug!(node_id, next, "Node execution complete");
}

/// Log the first node after which state carries an error.
pub fn log_state_fault(node_id: &str, error: &str) {
    tracing::warn!(node_id, error, "State carries an error; remaining steps drain");
}

/// Log graph execution completion.
pub fn log_graph_complete(steps: usize) {
    tracing::info!(steps, "Graph execution complete");
}

/// Log graph execution error.
pub fn log_graph_error(error: &crate::error::AgentError) {
    tracing::error!(%error, "Graph execution error");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_functions() {
        log_graph_start(Some("t"), "", "a");
        log_graph_start(None, "ns", "a");
        log_graph_resume("t", "b", 2, 3);
        log_node_start("test_node", 0);
        log_node_complete("test_node", "__end__");
        log_state_fault("test_node", "boom");
        log_graph_complete(1);
        log_graph_error(&crate::error::AgentError::ExecutionFailed(
            "test".to_string(),
        ));
    }
}
