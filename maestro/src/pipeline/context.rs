//! Shared collaborators of the pipeline steps.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::cache::StepCache;
use crate::error::AgentError;
use crate::llm::{LlmClient, LlmResponse};
use crate::message::Message;
use crate::state::{ConversationState, PipelineState};
use crate::tool_source::ToolSpec;

/// Second turn of every step prompt; some models refuse a system-only conversation.
pub const PROCESS_INPUT_PROMPT: &str = "Please process the above input.";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification failed: {0}")]
    Failed(String),
}

/// Receives progress lines as the run advances (chat channel, terminal, ...).
///
/// Failures are logged and never affect the run.
#[async_trait]
pub trait ProgressNotifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Error)]
pub enum DemandError {
    #[error("{source_name} unavailable: {message}")]
    Unavailable {
        source_name: String,
        message: String,
    },
}

/// External system holding customer demand for a feature (CRM opportunities, ticket backlog).
#[async_trait]
pub trait DemandSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, feature: &str) -> Result<Value, DemandError>;
}

/// Demand source returning a fixed document; for tests and demos.
pub struct StaticDemandSource {
    name: String,
    data: Value,
}

impl StaticDemandSource {
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

#[async_trait]
impl DemandSource for StaticDemandSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, _feature: &str) -> Result<Value, DemandError> {
        Ok(self.data.clone())
    }
}

/// Everything a step needs besides the state. One instance is shared by all steps of a
/// workflow via `Arc`.
///
/// **Interaction**: Built by the caller, handed to `pipeline::build_workflow`.
pub struct StepContext {
    pub llm: Arc<dyn LlmClient>,
    pub cache: StepCache,
    /// Tools offered to the competitor research steps.
    pub tools: Vec<ToolSpec>,
    pub notifier: Option<Arc<dyn ProgressNotifier>>,
    pub crm: Option<Arc<dyn DemandSource>>,
    pub ticketing: Option<Arc<dyn DemandSource>>,
}

impl StepContext {
    pub fn new(llm: Arc<dyn LlmClient>, cache: StepCache) -> Self {
        Self {
            llm,
            cache,
            tools: Vec::new(),
            notifier: None,
            crm: None,
            ticketing: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ProgressNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_crm(mut self, source: Arc<dyn DemandSource>) -> Self {
        self.crm = Some(source);
        self
    }

    pub fn with_ticketing(mut self, source: Arc<dyn DemandSource>) -> Self {
        self.ticketing = Some(source);
        self
    }

    /// Appends a progress note to the transcript and forwards it to the notifier.
    pub async fn progress(&self, state: &mut PipelineState, message: impl Into<String>) {
        let message = message.into();
        if message.is_empty() {
            return;
        }
        state.messages.push(Message::system(message.clone()));
        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.notify(&message).await {
                tracing::warn!(error = %e, "progress notification failed");
            }
        }
    }

    /// One model turn for a step: the step's system prompt, the fixed human turn, then any
    /// tool rounds the step is in the middle of. Tools are offered only when `with_tools`.
    pub async fn generate(
        &self,
        state: &PipelineState,
        system_prompt: String,
        with_tools: bool,
    ) -> Result<LlmResponse, AgentError> {
        let mut messages = vec![
            Message::system(system_prompt),
            Message::human(PROCESS_INPUT_PROMPT),
        ];
        messages.extend(state.trailing_tool_exchange().iter().cloned());
        let tools: &[ToolSpec] = if with_tools { &self.tools } else { &[] };
        self.llm.invoke(&messages, tools).await
    }
}
