use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::cache::CacheScope;
use crate::error::AgentError;
use crate::graph::Node;
use crate::pipeline::parse::parse_output;
use crate::pipeline::{StepContext, NODE_FETCH_COMPETITOR_LIST, TOOL_SEARCH_COMPETITORS};
use crate::state::PipelineState;

use super::{cache_label, record_failure, require_feature, returning_from_tools};

const CACHE_NODE: &str = "competitorList";
const CACHE_PROMPT: &str = "CompetitorList";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Output {
    competitor_list: Vec<String>,
}

fn system_prompt(feature: &str) -> String {
    format!(
        "You are a market analyst. List the products that compete on the feature below. \
         Use the `{}` tool when you need fresh data.\n\
         When done, answer with a JSON object: {{\"competitorList\": [string], \"error\": string | null}}.\n\n\
         Feature: {}",
        TOOL_SEARCH_COMPETITORS, feature
    )
}

/// Finds competitors for the feature, looping through the search tool node as the model asks.
/// Seeds the pending queue for the details step.
pub struct CompetitorListStep {
    ctx: Arc<StepContext>,
}

impl CompetitorListStep {
    pub fn new(ctx: Arc<StepContext>) -> Self {
        Self { ctx }
    }

    async fn finish(&self, state: &mut PipelineState, names: Vec<String>, hit: bool) {
        state.add_competitors(&names);
        state.pending_process_competitor_list = state.competitor_list.clone();
        let listed = if state.competitor_list.is_empty() {
            "none found".to_string()
        } else {
            state.competitor_list.join(", ")
        };
        self.ctx
            .progress(state, format!("{}competitors: {}", cache_label(hit), listed))
            .await;
    }
}

#[async_trait]
impl Node<PipelineState> for CompetitorListStep {
    fn id(&self) -> &str {
        NODE_FETCH_COMPETITOR_LIST
    }

    async fn run(&self, mut state: PipelineState) -> Result<PipelineState, AgentError> {
        let Some(feature) = require_feature(&mut state, NODE_FETCH_COMPETITOR_LIST) else {
            return Ok(state);
        };
        let scope = CacheScope::node(CACHE_NODE).with_feature(&feature);

        if !returning_from_tools(&state) {
            if let Some(names) = self.ctx.cache.lookup::<Vec<String>>(CACHE_PROMPT, &scope).await {
                self.finish(&mut state, names, true).await;
                return Ok(state);
            }
        }

        let response = match self.ctx.generate(&state, system_prompt(&feature), true).await {
            Ok(r) => r,
            Err(e) => {
                record_failure(&mut state, NODE_FETCH_COMPETITOR_LIST, e);
                return Ok(state);
            }
        };
        if !response.tool_calls.is_empty() {
            tracing::debug!(calls = response.tool_calls.len(), "competitor list requests tools");
            state.messages.push(response.into_message());
            return Ok(state);
        }
        match parse_output::<Output>(&response.content, "competitor list") {
            Ok(Output { competitor_list }) => {
                let names: Vec<String> = competitor_list
                    .into_iter()
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .collect();
                self.ctx.cache.store(CACHE_PROMPT, &names, &scope).await;
                self.finish(&mut state, names, false).await;
            }
            Err(e) => record_failure(&mut state, NODE_FETCH_COMPETITOR_LIST, e),
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{InMemoryScopedCache, StepCache};
    use crate::graph::has_pending_tool_calls;
    use crate::llm::{LlmResponse, MockLlm};
    use crate::message::{Message, ToolCall};

    fn with_feature() -> PipelineState {
        let mut s = PipelineState::from_input("a markdown editor");
        s.product_feature = Some("markdown editing".into());
        s
    }

    /// **Scenario**: A tool request is appended for the tool node; the final answer fills the
    /// list and the queue and is cached under the feature.
    #[tokio::test]
    async fn tool_round_then_answer() {
        let llm = Arc::new(MockLlm::sequence(vec![
            LlmResponse::tool_calls(vec![ToolCall {
                id: "c1".into(),
                name: TOOL_SEARCH_COMPETITORS.into(),
                arguments: r#"{"query":"markdown editors"}"#.into(),
            }]),
            LlmResponse::text(r#"{"competitorList": ["Typora", "Obsidian"], "error": null}"#),
        ]));
        let store = Arc::new(InMemoryScopedCache::default());
        let ctx = Arc::new(StepContext::new(llm.clone(), StepCache::new(store.clone())));
        let step = CompetitorListStep::new(ctx);

        let mut state = step.run(with_feature()).await.unwrap();
        assert!(has_pending_tool_calls(&state));
        state
            .messages
            .push(Message::tool("c1", TOOL_SEARCH_COMPETITORS, "Typora, Obsidian"));

        let state = step.run(state).await.unwrap();
        assert!(!has_pending_tool_calls(&state));
        assert_eq!(state.competitor_list, vec!["Typora", "Obsidian"]);
        assert_eq!(state.pending_process_competitor_list, state.competitor_list);
        assert_eq!(store.len().await, 1);
        assert_eq!(llm.call_count(), 2);
    }

    /// **Scenario**: A cached list for the same feature skips the model.
    #[tokio::test]
    async fn cached_list_skips_model() {
        let store = Arc::new(InMemoryScopedCache::default());
        let cache = StepCache::new(store);
        let scope = CacheScope::node(CACHE_NODE).with_feature("markdown editing");
        cache.store(CACHE_PROMPT, &vec!["A", "B"], &scope).await.unwrap();
        let llm = Arc::new(MockLlm::sequence(vec![]));
        let step = CompetitorListStep::new(Arc::new(StepContext::new(llm.clone(), cache)));
        let state = step.run(with_feature()).await.unwrap();
        assert_eq!(state.competitor_list, vec!["A", "B"]);
        assert_eq!(state.messages.last().unwrap().content(), "(Cache) competitors: A, B");
        assert_eq!(llm.call_count(), 0);
    }
}
