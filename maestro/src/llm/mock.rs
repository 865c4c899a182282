//! Scripted mock LLM for tests and offline runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmResponse};
use crate::message::Message;
use crate::tool_source::ToolSpec;

type ScriptFn = dyn Fn(&[Message], &[ToolSpec]) -> Result<LlmResponse, AgentError> + Send + Sync;

/// Mock LLM driven by a closure over the request, with a call counter.
///
/// The closure sees the full prompt (system prompt first), so tests can answer per step by
/// matching on the system message.
///
/// **Interaction**: Implements `LlmClient`; used by pipeline tests.
pub struct MockLlm {
    script: Box<ScriptFn>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    pub fn from_fn<F>(script: F) -> Self
    where
        F: Fn(&[Message], &[ToolSpec]) -> Result<LlmResponse, AgentError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answers `content` with no tool calls.
    pub fn fixed(content: impl Into<String>) -> Self {
        let content = content.into();
        Self::from_fn(move |_, _| Ok(LlmResponse::text(content.clone())))
    }

    /// Answers with `responses` in order, then fails once they run out.
    pub fn sequence(responses: Vec<LlmResponse>) -> Self {
        let next = AtomicUsize::new(0);
        Self::from_fn(move |_, _| {
            let i = next.fetch_add(1, Ordering::SeqCst);
            responses
                .get(i)
                .cloned()
                .ok_or_else(|| AgentError::ExecutionFailed("mock llm script exhausted".into()))
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// System prompt of every call so far, in call order.
    pub fn system_prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<LlmResponse, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            let system = messages
                .iter()
                .find(|m| matches!(m, Message::System { .. }))
                .map(|m| m.content().to_string())
                .unwrap_or_default();
            prompts.push(system);
        }
        (self.script)(messages, tools)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: A sequence answers in order and then errors.
    #[tokio::test]
    async fn sequence_answers_in_order_then_fails() {
        let llm = MockLlm::sequence(vec![LlmResponse::text("a"), LlmResponse::text("b")]);
        let msgs = [Message::system("s")];
        assert_eq!(llm.invoke(&msgs, &[]).await.unwrap().content, "a");
        assert_eq!(llm.invoke(&msgs, &[]).await.unwrap().content, "b");
        assert!(llm.invoke(&msgs, &[]).await.is_err());
        assert_eq!(llm.call_count(), 3);
        assert_eq!(llm.system_prompts(), vec!["s", "s", "s"]);
    }
}
