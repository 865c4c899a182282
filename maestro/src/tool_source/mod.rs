//! Tool source abstraction: list tools and call a tool.
//!
//! Pipeline steps advertise `ToolSpec`s to the model; `ToolNode` executes the calls the model
//! requests through a `ToolSource`. `MockToolSource` serves tests and offline runs.

mod mock;

pub use mock::MockToolSource;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Tool specification handed to the model.
///
/// **Interaction**: Returned by `ToolSource::list_tools()`; passed to `LlmClient::invoke`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    /// JSON Schema for arguments.
    pub input_schema: Value,
}

/// Result of a single tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallContent {
    pub text: String,
}

/// Errors from listing or calling tools.
///
/// **Interaction**: Returned by `ToolSource::call_tool()`; `ToolNode` records the first one
/// in the state's error slot.
#[derive(Debug, Error)]
pub enum ToolSourceError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid arguments: {0}")]
    InvalidInput(String),
    #[error("tool execution failed: {0}")]
    Execution(String),
}

/// Tool source: list tools and call a tool.
///
/// **Interaction**: Shared as `Arc<dyn ToolSource>` by `ToolNode`; `list_tools` feeds the
/// specs the pipeline passes to the model.
#[async_trait]
pub trait ToolSource: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError>;

    /// Call a tool by name with JSON arguments.
    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallContent, ToolSourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Display of each ToolSourceError variant contains expected keywords.
    #[test]
    fn tool_source_error_display_all_variants() {
        let s = ToolSourceError::NotFound("x".into()).to_string();
        assert!(s.to_lowercase().contains("not found"), "{}", s);
        let s = ToolSourceError::InvalidInput("bad".into()).to_string();
        assert!(s.to_lowercase().contains("invalid"), "{}", s);
        let s = ToolSourceError::Execution("quota".into()).to_string();
        assert!(s.contains("quota"), "{}", s);
    }
}
