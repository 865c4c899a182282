use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::cache::CacheScope;
use crate::error::AgentError;
use crate::graph::Node;
use crate::pipeline::parse::parse_output;
use crate::pipeline::{StepContext, NODE_EXTRACT_FEATURE};
use crate::state::PipelineState;

use super::{cache_label, record_failure};

const CACHE_NODE: &str = "extractFeature";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Output {
    product_feature: Option<String>,
}

fn system_prompt(input: &str) -> String {
    format!(
        "You are a product manager. Read the request below and name the single product feature \
         it asks for, in a few words.\n\
         Answer with a JSON object: {{\"productFeature\": string | null, \"error\": string | null}}. \
         Set \"error\" when no feature can be identified.\n\n\
         Request:\n{}",
        input
    )
}

/// Names the product feature described by `input_text`.
///
/// Cached with the input text as prompt, scoped by step only.
pub struct ExtractFeatureStep {
    ctx: Arc<StepContext>,
}

impl ExtractFeatureStep {
    pub fn new(ctx: Arc<StepContext>) -> Self {
        Self { ctx }
    }

    async fn finish(&self, state: &mut PipelineState, feature: String, hit: bool) {
        self.ctx
            .progress(
                state,
                format!("{}productFeature: `{}`", cache_label(hit), feature),
            )
            .await;
        state.product_feature = Some(feature);
    }
}

#[async_trait]
impl Node<PipelineState> for ExtractFeatureStep {
    fn id(&self) -> &str {
        NODE_EXTRACT_FEATURE
    }

    async fn run(&self, mut state: PipelineState) -> Result<PipelineState, AgentError> {
        let input = state.input_text.trim().to_string();
        if input.is_empty() {
            record_failure(&mut state, NODE_EXTRACT_FEATURE, "Input text is empty");
            return Ok(state);
        }

        let scope = CacheScope::node(CACHE_NODE);
        if let Some(feature) = self.ctx.cache.lookup::<String>(&input, &scope).await {
            self.finish(&mut state, feature, true).await;
            return Ok(state);
        }

        let response = match self.ctx.generate(&state, system_prompt(&input), false).await {
            Ok(r) => r,
            Err(e) => {
                record_failure(&mut state, NODE_EXTRACT_FEATURE, e);
                return Ok(state);
            }
        };
        match parse_output::<Output>(&response.content, "product feature") {
            Ok(Output {
                product_feature: Some(feature),
            }) if !feature.trim().is_empty() => {
                let feature = feature.trim().to_string();
                self.ctx.cache.store(&input, &feature, &scope).await;
                self.finish(&mut state, feature, false).await;
            }
            Ok(_) => record_failure(
                &mut state,
                NODE_EXTRACT_FEATURE,
                "Could not extract product feature",
            ),
            Err(e) => record_failure(&mut state, NODE_EXTRACT_FEATURE, e),
        }
        Ok(state)
    }
}
