use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::cache::CacheScope;
use crate::error::AgentError;
use crate::graph::Node;
use crate::pipeline::parse::parse_output;
use crate::pipeline::{StepContext, NODE_FETCH_COMPETITOR_DETAILS, TOOL_SEARCH_COMPETITOR_FEATURE};
use crate::state::{CompetitorFeatureDetail, PipelineState};

use super::{cache_label, record_failure, require_feature, returning_from_tools};

const CACHE_NODE: &str = "competitorFeatureDetails";
const CACHE_PROMPT: &str = "CompetitorFeatureDetails";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Output {
    feature_details: String,
    #[serde(default)]
    data_source: Option<String>,
}

fn system_prompt(feature: &str, competitor: &str) -> String {
    format!(
        "You are a market analyst. Describe how {competitor} implements the feature below: \
         capabilities, limits, pricing where known. Use the `{tool}` tool when you need fresh data.\n\
         When done, answer with a JSON object: \
         {{\"featureDetails\": string, \"dataSource\": string | null, \"error\": string | null}}.\n\n\
         Feature: {feature}\nCompetitor: {competitor}",
        competitor = competitor,
        tool = TOOL_SEARCH_COMPETITOR_FEATURE,
        feature = feature
    )
}

/// Batch step: each visit takes one competitor off the pending queue and records its feature
/// details. While the model is in a tool round the same competitor stays current.
///
/// **Interaction**: Re-entered by its own conditional edge while the queue is non-empty.
pub struct CompetitorDetailsStep {
    ctx: Arc<StepContext>,
}

impl CompetitorDetailsStep {
    pub fn new(ctx: Arc<StepContext>) -> Self {
        Self { ctx }
    }

    async fn finish(&self, state: &mut PipelineState, detail: CompetitorFeatureDetail, hit: bool) {
        let message = format!(
            "{}feature details: {}",
            cache_label(hit),
            detail.competitor_name
        );
        state.put_competitor_detail(detail);
        state.current_competitor = None;
        self.ctx.progress(state, message).await;
    }
}

#[async_trait]
impl Node<PipelineState> for CompetitorDetailsStep {
    fn id(&self) -> &str {
        NODE_FETCH_COMPETITOR_DETAILS
    }

    async fn run(&self, mut state: PipelineState) -> Result<PipelineState, AgentError> {
        let returning = returning_from_tools(&state);
        if !returning || state.current_competitor.is_none() {
            state.current_competitor = state.next_pending_competitor();
        }
        let Some(competitor) = state.current_competitor.clone() else {
            tracing::debug!("no competitor pending");
            return Ok(state);
        };
        let Some(feature) = require_feature(&mut state, NODE_FETCH_COMPETITOR_DETAILS) else {
            return Ok(state);
        };
        let scope = CacheScope::node(CACHE_NODE)
            .with_feature(&feature)
            .with_competitors(&competitor);

        if !returning {
            if let Some(detail) = self
                .ctx
                .cache
                .lookup::<CompetitorFeatureDetail>(CACHE_PROMPT, &scope)
                .await
            {
                self.finish(&mut state, detail, true).await;
                return Ok(state);
            }
        }

        let prompt = system_prompt(&feature, &competitor);
        let response = match self.ctx.generate(&state, prompt, true).await {
            Ok(r) => r,
            Err(e) => {
                record_failure(&mut state, NODE_FETCH_COMPETITOR_DETAILS, e);
                return Ok(state);
            }
        };
        if !response.tool_calls.is_empty() {
            tracing::debug!(%competitor, calls = response.tool_calls.len(), "feature details request tools");
            state.messages.push(response.into_message());
            return Ok(state);
        }
        match parse_output::<Output>(&response.content, "competitor feature details") {
            Ok(out) => {
                let detail = CompetitorFeatureDetail {
                    competitor_name: competitor,
                    feature_details: out.feature_details,
                    data_source: out.data_source,
                };
                self.ctx.cache.store(CACHE_PROMPT, &detail, &scope).await;
                self.finish(&mut state, detail, false).await;
            }
            Err(e) => record_failure(&mut state, NODE_FETCH_COMPETITOR_DETAILS, e),
        }
        Ok(state)
    }
}
