//! Mock tool source for tests and offline runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{ToolCallContent, ToolSource, ToolSourceError, ToolSpec};

/// Tool source with fixed specs and canned results per tool name.
///
/// Unknown names fail with `NotFound`; names registered with `with_failure` fail with
/// `Execution`. Every call is recorded for assertions.
pub struct MockToolSource {
    specs: Vec<ToolSpec>,
    results: HashMap<String, String>,
    failures: HashMap<String, String>,
    calls: AtomicUsize,
    log: Mutex<Vec<(String, Value)>>,
}

impl MockToolSource {
    pub fn new(specs: Vec<ToolSpec>) -> Self {
        Self {
            specs,
            results: HashMap::new(),
            failures: HashMap::new(),
            calls: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Mock exposing the two web-search tools the pipeline's competitor steps use.
    pub fn search_example() -> Self {
        Self::new(vec![
            search_spec(
                crate::pipeline::TOOL_SEARCH_COMPETITORS,
                "Search the web for competitors offering a product feature.",
            ),
            search_spec(
                crate::pipeline::TOOL_SEARCH_COMPETITOR_FEATURE,
                "Search the web for how a competitor implements a product feature.",
            ),
        ])
    }

    pub fn with_result(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.results.insert(name.into(), text.into());
        self
    }

    pub fn with_failure(mut self, name: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.insert(name.into(), message.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(name, arguments)` of every call so far, in call order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

fn search_spec(name: &str, description: &str) -> ToolSpec {
    ToolSpec {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": { "query": { "type": "string" } },
            "required": ["query"]
        }),
    }
}

#[async_trait]
impl ToolSource for MockToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError> {
        Ok(self.specs.clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallContent, ToolSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut log) = self.log.lock() {
            log.push((name.to_string(), arguments));
        }
        if let Some(message) = self.failures.get(name) {
            return Err(ToolSourceError::Execution(message.clone()));
        }
        let known = self.specs.iter().any(|s| s.name == name) || self.results.contains_key(name);
        if !known {
            return Err(ToolSourceError::NotFound(name.to_string()));
        }
        Ok(ToolCallContent {
            text: self.results.get(name).cloned().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// **Scenario**: Canned results per name; unknown names are NotFound.
    #[tokio::test]
    async fn mock_tool_source_results_and_not_found() {
        let source = MockToolSource::search_example()
            .with_result(crate::pipeline::TOOL_SEARCH_COMPETITORS, "A, B");
        assert_eq!(source.list_tools().await.unwrap().len(), 2);
        let r = source
            .call_tool(crate::pipeline::TOOL_SEARCH_COMPETITORS, json!({"query": "x"}))
            .await
            .unwrap();
        assert_eq!(r.text, "A, B");
        assert!(matches!(
            source.call_tool("nope", json!({})).await,
            Err(ToolSourceError::NotFound(_))
        ));
        assert_eq!(source.call_count(), 2);
        assert_eq!(source.calls()[1].0, "nope");
    }

    /// **Scenario**: Registered failures surface as Execution errors.
    #[tokio::test]
    async fn mock_tool_source_failure() {
        let source = MockToolSource::new(vec![]).with_failure("search", "quota exceeded");
        match source.call_tool("search", json!({})).await {
            Err(ToolSourceError::Execution(m)) => assert_eq!(m, "quota exceeded"),
            other => panic!("expected Execution, got {:?}", other),
        }
    }
}
