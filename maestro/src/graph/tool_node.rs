//! Tool node: executes the tool calls requested by the last assistant message.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use crate::error::AgentError;
use crate::message::{Message, ToolCall};
use crate::state::ConversationState;
use crate::tool_source::{ToolCallContent, ToolSource, ToolSourceError};

use super::Node;

/// Tool-loop predicate: true when the last message requests tools and no error is recorded.
///
/// Returning false on error lets a faulted run leave the tool loop instead of cycling until
/// the recursion limit.
pub fn has_pending_tool_calls<S: ConversationState>(state: &S) -> bool {
    state.error().is_none()
        && state
            .messages()
            .last()
            .is_some_and(|m| !m.tool_calls().is_empty())
}

/// Runs every tool call of the last assistant message concurrently and appends one `Tool`
/// message per call, in call order. The first failing call is recorded in the error slot;
/// its message carries the error text.
///
/// **Interaction**: Registered behind a generation step; its single static edge leads back to
/// that step.
pub struct ToolNode<S> {
    id: String,
    tools: Arc<dyn ToolSource>,
    _state: PhantomData<fn() -> S>,
}

impl<S> ToolNode<S> {
    pub fn new(id: impl Into<String>, tools: Arc<dyn ToolSource>) -> Self {
        Self {
            id: id.into(),
            tools,
            _state: PhantomData,
        }
    }
}

async fn call_one(
    tools: &dyn ToolSource,
    call: &ToolCall,
) -> Result<ToolCallContent, ToolSourceError> {
    let arguments = if call.arguments.trim().is_empty() {
        serde_json::Value::Object(Default::default())
    } else {
        serde_json::from_str(&call.arguments)
            .map_err(|e| ToolSourceError::InvalidInput(format!("{}: {}", call.name, e)))?
    };
    tools.call_tool(&call.name, arguments).await
}

#[async_trait]
impl<S> Node<S> for ToolNode<S>
where
    S: ConversationState + Clone + Send + Sync + Debug + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self, mut state: S) -> Result<S, AgentError> {
        let calls: Vec<ToolCall> = state
            .messages()
            .last()
            .map(|m| m.tool_calls().to_vec())
            .unwrap_or_default();
        if calls.is_empty() {
            tracing::debug!(node_id = %self.id, "no pending tool calls");
            return Ok(state);
        }

        let tools = self.tools.as_ref();
        let results = join_all(calls.iter().map(|call| call_one(tools, call))).await;

        let mut first_error: Option<String> = None;
        for (call, result) in calls.iter().zip(results) {
            let content = match result {
                Ok(content) => {
                    tracing::debug!(node_id = %self.id, tool = %call.name, "tool call ok");
                    content.text
                }
                Err(e) => {
                    tracing::warn!(node_id = %self.id, tool = %call.name, error = %e, "tool call failed");
                    let text = format!("error: {}", e);
                    first_error.get_or_insert_with(|| format!("tool {} failed: {}", call.name, e));
                    text
                }
            };
            state
                .messages_mut()
                .push(Message::tool(call.id.clone(), call.name.clone(), content));
        }
        if let Some(error) = first_error {
            state.set_error(error);
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{FaultState, PipelineState};
    use crate::tool_source::MockToolSource;

    fn call(id: &str, name: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: name.into(),
            arguments: r#"{"query":"q"}"#.into(),
        }
    }

    fn with_calls(calls: Vec<ToolCall>) -> PipelineState {
        let mut s = PipelineState::from_input("x");
        s.messages.push(Message::assistant_with_tools("", calls));
        s
    }

    /// **Scenario**: Results are appended in call order, one Tool message per call.
    #[tokio::test]
    async fn tool_results_in_call_order() {
        let tools = Arc::new(
            MockToolSource::new(vec![])
                .with_result("a", "ra")
                .with_result("b", "rb"),
        );
        let node = ToolNode::<PipelineState>::new("tools", tools.clone());
        let state = with_calls(vec![call("1", "a"), call("2", "b")]);
        assert!(has_pending_tool_calls(&state));
        let out = node.run(state).await.unwrap();
        let tail: Vec<_> = out.messages[out.messages.len() - 2..]
            .iter()
            .map(|m| m.content().to_string())
            .collect();
        assert_eq!(tail, vec!["ra", "rb"]);
        assert!(!has_pending_tool_calls(&out));
        assert_eq!(tools.call_count(), 2);
    }

    /// **Scenario**: A failing tool sets the error slot and ends the tool loop.
    #[tokio::test]
    async fn failing_tool_records_error() {
        let tools = Arc::new(
            MockToolSource::new(vec![])
                .with_result("a", "ra")
                .with_failure("b", "quota exceeded"),
        );
        let node = ToolNode::<PipelineState>::new("tools", tools);
        let out = node
            .run(with_calls(vec![call("1", "a"), call("2", "b")]))
            .await
            .unwrap();
        assert!(out.error().unwrap().contains("quota exceeded"));
        assert_eq!(out.messages.last().unwrap().content(), "error: tool execution failed: quota exceeded");
    }

    /// **Scenario**: Malformed arguments are an InvalidInput failure for that call only.
    #[tokio::test]
    async fn malformed_arguments_fail_the_call() {
        let tools = Arc::new(MockToolSource::new(vec![]).with_result("a", "ra"));
        let node = ToolNode::<PipelineState>::new("tools", tools.clone());
        let bad = ToolCall {
            id: "1".into(),
            name: "a".into(),
            arguments: "{not json".into(),
        };
        let out = node.run(with_calls(vec![bad])).await.unwrap();
        assert!(out.error().unwrap().contains("invalid arguments"));
        assert_eq!(tools.call_count(), 0);
    }

    /// **Scenario**: An error in state makes the predicate false even with pending calls.
    #[test]
    fn predicate_is_false_on_error() {
        let mut s = with_calls(vec![call("1", "a")]);
        s.set_error("boom".into());
        assert!(!has_pending_tool_calls(&s));
    }
}
