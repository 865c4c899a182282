use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::cache::CacheScope;
use crate::error::AgentError;
use crate::graph::Node;
use crate::pipeline::parse::parse_output;
use crate::pipeline::{StepContext, NODE_COMPETITOR_MATRIX};
use crate::state::PipelineState;

use super::{cache_label, record_failure, require_feature};

const CACHE_NODE: &str = "competitorTableMatrix";
const CACHE_PROMPT: &str = "CompetitorTableMatrix";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Output {
    competitor_table_matrix: String,
}

fn system_prompt(feature: &str, state: &PipelineState) -> String {
    let details: String = state
        .competitor_feature_details
        .iter()
        .map(|d| format!("- {}: {}\n", d.competitor_name, d.feature_details))
        .collect();
    format!(
        "You are a market analyst. Build a markdown comparison table of the competitors below for \
         the feature, one row per competitor, columns for the capabilities that differ.\n\
         Answer with a JSON object: {{\"competitorTableMatrix\": string, \"error\": string | null}}.\n\n\
         Feature: {}\nCompetitor details:\n{}",
        feature, details
    )
}

/// Builds the competitor comparison table from the gathered details.
pub struct CompetitorMatrixStep {
    ctx: Arc<StepContext>,
}

impl CompetitorMatrixStep {
    pub fn new(ctx: Arc<StepContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Node<PipelineState> for CompetitorMatrixStep {
    fn id(&self) -> &str {
        NODE_COMPETITOR_MATRIX
    }

    async fn run(&self, mut state: PipelineState) -> Result<PipelineState, AgentError> {
        let Some(feature) = require_feature(&mut state, NODE_COMPETITOR_MATRIX) else {
            return Ok(state);
        };
        if state.competitor_feature_details.is_empty() {
            self.ctx
                .progress(&mut state, "No competitor details to compare")
                .await;
            return Ok(state);
        }
        let scope = CacheScope::node(CACHE_NODE)
            .with_feature(&feature)
            .with_competitors(state.competitors_signature());

        let (matrix, hit) = match self.ctx.cache.lookup::<String>(CACHE_PROMPT, &scope).await {
            Some(matrix) => (matrix, true),
            None => {
                let response = match self
                    .ctx
                    .generate(&state, system_prompt(&feature, &state), false)
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        record_failure(&mut state, NODE_COMPETITOR_MATRIX, e);
                        return Ok(state);
                    }
                };
                match parse_output::<Output>(&response.content, "competitor table") {
                    Ok(out) => {
                        self.ctx
                            .cache
                            .store(CACHE_PROMPT, &out.competitor_table_matrix, &scope)
                            .await;
                        (out.competitor_table_matrix, false)
                    }
                    Err(e) => {
                        record_failure(&mut state, NODE_COMPETITOR_MATRIX, e);
                        return Ok(state);
                    }
                }
            }
        };
        state.competitor_table_matrix = Some(matrix);
        self.ctx
            .progress(
                &mut state,
                format!("{}Competitor table matrix created", cache_label(hit)),
            )
            .await;
        Ok(state)
    }
}
