//! LLM client abstraction for the generation steps.
//!
//! Steps depend on a callable that returns assistant text and optional tool calls; this
//! module defines the trait and a scripted mock. Model providers live outside this crate.

mod mock;

pub use mock::MockLlm;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::message::{Message, ToolCall};
use crate::tool_source::ToolSpec;

/// Response from an LLM completion: assistant message text and optional tool calls.
///
/// **Interaction**: Returned by `LlmClient::invoke()`; steps append it to the transcript as
/// an assistant message. Non-empty `tool_calls` route the graph into the tool node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LlmResponse {
    pub content: String,
    /// Tool calls from this turn; empty means the step can parse `content`.
    pub tool_calls: Vec<ToolCall>,
}

impl LlmResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::default()
        }
    }

    /// Assistant message carrying this response.
    pub fn into_message(self) -> Message {
        Message::assistant_with_tools(self.content, self.tool_calls)
    }
}

/// LLM client: given messages and the tools on offer, returns assistant text and optional
/// tool calls.
///
/// Timeouts and provider errors surface as `Err`; the calling step records them in the
/// state's error slot.
///
/// **Interaction**: Held by `pipeline::StepContext`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<LlmResponse, AgentError>;
}
