//! End-to-end pipeline runs with a scripted model, mock search tools and in-memory stores.

mod init_logging;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use maestro::pipeline::{
    NotifyError, TOOL_SEARCH_COMPETITORS, NODE_COMPETITOR_SUBGRAPH, NODE_FETCH_COMPETITOR_DETAILS,
};
use maestro::{
    AgentError, Checkpointer, FaultState, InMemoryScopedCache, JsonSerializer, LlmResponse,
    Message, MockLlm, MockToolSource, PipelineState, PipelineWorkflow,
    ProgressNotifier, RunnableConfig, SqliteSaver, StaticDemandSource, StepCache, StepContext,
    ToolCall, ToolSource, END,
};
use serde_json::json;

fn competitor_in(system: &str) -> Option<String> {
    system
        .lines()
        .find_map(|l| l.strip_prefix("Competitor: "))
        .map(str::to_string)
}

/// Model answering each step by its system prompt. The competitor list takes one search round.
/// `fail_details_for` makes the details step for that competitor answer with an error.
fn scripted_llm(fail_details_for: Option<&'static str>) -> MockLlm {
    MockLlm::from_fn(move |messages, tools| {
        let system = messages[0].content();
        if system.contains("name the single product feature") {
            return Ok(LlmResponse::text(
                r#"{"productFeature": "markdown editing", "error": null}"#,
            ));
        }
        if system.contains("List the products that compete") {
            if messages.len() == 2 {
                assert!(!tools.is_empty(), "search tools must be offered");
                return Ok(LlmResponse::tool_calls(vec![ToolCall {
                    id: "search-1".into(),
                    name: TOOL_SEARCH_COMPETITORS.into(),
                    arguments: r#"{"query": "markdown editing"}"#.into(),
                }]));
            }
            assert_eq!(messages.last().unwrap().content(), "A, B");
            return Ok(LlmResponse::text(r#"{"competitorList": ["A", "B"]}"#));
        }
        if system.contains("comparison table") {
            return Ok(LlmResponse::text(
                r#"{"competitorTableMatrix": "| | A | B |\n|---|---|---|\n| preview | yes | no |"}"#,
            ));
        }
        if let Some(name) = competitor_in(system) {
            if fail_details_for == Some(name.as_str()) {
                return Ok(LlmResponse::text(
                    r#"{"featureDetails": null, "error": "quota exceeded"}"#,
                ));
            }
            return Ok(LlmResponse::text(format!(
                r#"{{"featureDetails": "{} has live preview", "dataSource": "{}.example"}}"#,
                name,
                name.to_lowercase()
            )));
        }
        if system.contains("writing a PRD") {
            if system.contains("\"steps\"") {
                return Ok(LlmResponse::text(
                    r#"{"steps": [{"title": "Editor core", "details": "parser"}]}"#,
                ));
            }
            return Ok(LlmResponse::text(r#"{"content": "Section body."}"#));
        }
        Err(AgentError::ExecutionFailed(format!("unexpected prompt: {}", system)))
    })
}

#[derive(Default)]
struct Collecting(Mutex<Vec<String>>);

#[async_trait]
impl ProgressNotifier for Collecting {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        self.0.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

struct Harness {
    llm: Arc<MockLlm>,
    tools: Arc<MockToolSource>,
    notes: Arc<Collecting>,
    workflow: PipelineWorkflow,
}

async fn harness(llm: MockLlm, cache: StepCache) -> Harness {
    let llm = Arc::new(llm);
    let tools = Arc::new(MockToolSource::search_example().with_result(TOOL_SEARCH_COMPETITORS, "A, B"));
    let notes = Arc::new(Collecting::default());
    let ctx = StepContext::new(llm.clone(), cache)
        .with_tools(tools.list_tools().await.unwrap())
        .with_notifier(notes.clone())
        .with_crm(Arc::new(StaticDemandSource::new("crm", json!({"opportunities": 4}))));
    let workflow = PipelineWorkflow::new(Arc::new(ctx), tools.clone());
    Harness {
        llm,
        tools,
        notes,
        workflow,
    }
}

fn details_calls(llm: &MockLlm) -> usize {
    llm.system_prompts()
        .iter()
        .filter(|p| competitor_in(p).is_some())
        .count()
}

/// **Scenario**: A full run produces the PRD; the competitor queue ["A","B"] takes two details
/// visits; an identical rerun is served entirely from cache.
#[tokio::test]
async fn full_run_then_cached_rerun() {
    let cache = StepCache::new(Arc::new(InMemoryScopedCache::default()));
    let h = harness(scripted_llm(None), cache).await;
    let graph = h.workflow.compile().unwrap();

    let out = graph
        .invoke(PipelineState::from_input("a markdown editor"), None)
        .await
        .unwrap();
    assert!(out.error().is_none(), "{:?}", out.error());
    assert_eq!(out.product_feature.as_deref(), Some("markdown editing"));
    assert_eq!(out.competitor_list, vec!["A", "B"]);
    assert!(out.pending_process_competitor_list.is_empty());
    assert_eq!(out.competitor_feature_details.len(), 2);
    assert_eq!(details_calls(&h.llm), 2);
    assert_eq!(out.system_sales_force_data, Some(json!({"opportunities": 4})));
    assert_eq!(out.prd_sections.len(), 4);
    let prd = out.output_product_prd.as_deref().unwrap();
    assert!(prd.starts_with("# Product Requirements: markdown editing"));
    assert!(prd.contains("- **B**: B has live preview (b.example)"));
    assert!(prd.contains("## Implementation Strategy (Part 2)\n\n1. **Editor core**: parser"));
    assert_eq!(h.tools.call_count(), 1);
    let first_run_calls = h.llm.call_count();
    assert_eq!(first_run_calls, 10);

    let rerun = graph
        .invoke(PipelineState::from_input("a markdown editor"), None)
        .await
        .unwrap();
    assert_eq!(h.llm.call_count(), first_run_calls, "rerun must not call the model");
    assert_eq!(h.tools.call_count(), 1);
    assert_eq!(rerun.output_product_prd, out.output_product_prd);
    let notes = h.notes.0.lock().unwrap();
    assert!(notes.contains(&"(Cache) productFeature: `markdown editing`".to_string()));
    assert!(notes.contains(&"(Cache) Customer Analysis section generated".to_string()));
}

/// **Scenario**: An error recorded mid-run stops all later business steps; the run still
/// completes and leaves the remaining outputs untouched.
#[tokio::test]
async fn error_mid_run_drains_to_end() {
    let h = harness(scripted_llm(Some("B")), StepCache::disabled()).await;
    let out = h
        .workflow
        .compile()
        .unwrap()
        .invoke(PipelineState::from_input("a markdown editor"), None)
        .await
        .unwrap();

    assert_eq!(out.error(), Some("quota exceeded"));
    assert_eq!(out.competitor_feature_details.len(), 1);
    assert!(out.competitor_table_matrix.is_none());
    assert!(out.system_sales_force_data.is_none());
    assert!(out.prd_sections.is_empty());
    assert!(out.output_product_prd.is_none());
    // extract + list (two turns) + details for A and B
    assert_eq!(h.llm.call_count(), 5);
}

/// **Scenario**: A run cut short inside the competitor subgraph resumes there, and ends in
/// the same state as an uninterrupted run.
#[tokio::test]
async fn interrupted_run_resumes_inside_subgraph() {
    let uninterrupted = {
        let h = harness(scripted_llm(None), StepCache::disabled()).await;
        h.workflow
            .compile()
            .unwrap()
            .invoke(PipelineState::from_input("a markdown editor"), None)
            .await
            .unwrap()
    };

    let dir = tempfile::tempdir().unwrap();
    let saver: Arc<SqliteSaver<PipelineState>> = Arc::new(
        SqliteSaver::new(dir.path().join("cp.db"), Arc::new(JsonSerializer)).unwrap(),
    );
    let h = harness(scripted_llm(None), StepCache::disabled()).await;
    let graph = h.workflow.with_checkpointer(saver.clone()).compile().unwrap();
    let config = RunnableConfig::for_thread("prd-1");

    // Extraction uses one of 4 steps; the subgraph's fourth node exceeds the 3 left.
    let err = graph
        .invoke(
            PipelineState::from_input("a markdown editor"),
            Some(config.clone().with_recursion_limit(4)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::RecursionLimit { limit: 3 }));
    assert_eq!(h.llm.call_count(), 3);

    let child = saver
        .get_tuple(&config.child(NODE_COMPETITOR_SUBGRAPH))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(child.next_node, NODE_FETCH_COMPETITOR_DETAILS);

    let resumed = graph
        .invoke(PipelineState::from_input("a markdown editor"), Some(config.clone()))
        .await
        .unwrap();
    assert_eq!(h.llm.call_count(), 10, "no step before the interruption reruns");
    assert_eq!(resumed, uninterrupted);

    let parent = saver.list(&config, None).await.unwrap();
    assert_eq!(parent.last().unwrap().next_node, END);
    assert!(resumed
        .messages
        .iter()
        .any(|m| matches!(m, Message::Tool { content, .. } if content == "A, B")));
}
