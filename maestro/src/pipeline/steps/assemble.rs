use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::graph::Node;
use crate::pipeline::{StepContext, NODE_ASSEMBLE_PRD};
use crate::state::PipelineState;

use super::{record_failure, require_feature, PrdSection};

/// Renders the final PRD markdown from the feature, the competitor research and the sections.
pub fn render_prd(feature: &str, state: &PipelineState) -> String {
    let mut doc = format!("# Product Requirements: {}\n", feature);
    if !state.competitor_list.is_empty() || state.competitor_table_matrix.is_some() {
        doc.push_str("\n## Competitor Analysis\n\n");
        if let Some(matrix) = &state.competitor_table_matrix {
            let _ = writeln!(doc, "{}\n", matrix.trim_end());
        }
        for detail in &state.competitor_feature_details {
            let _ = write!(doc, "- **{}**: {}", detail.competitor_name, detail.feature_details);
            if let Some(source) = &detail.data_source {
                let _ = write!(doc, " ({})", source);
            }
            doc.push('\n');
        }
    }
    for section in PrdSection::ALL {
        if let Some(body) = state.prd_sections.get(section.key()) {
            let _ = write!(doc, "\n## {}\n\n{}\n", section.title(), body.trim_end());
        }
    }
    doc
}

/// Writes `output_product_prd`. Fails when no section was produced.
pub struct AssemblePrdStep {
    ctx: Arc<StepContext>,
}

impl AssemblePrdStep {
    pub fn new(ctx: Arc<StepContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Node<PipelineState> for AssemblePrdStep {
    fn id(&self) -> &str {
        NODE_ASSEMBLE_PRD
    }

    async fn run(&self, mut state: PipelineState) -> Result<PipelineState, AgentError> {
        let Some(feature) = require_feature(&mut state, NODE_ASSEMBLE_PRD) else {
            return Ok(state);
        };
        if state.prd_sections.is_empty() {
            record_failure(&mut state, NODE_ASSEMBLE_PRD, "No PRD sections were generated");
            return Ok(state);
        }
        state.output_product_prd = Some(render_prd(&feature, &state));
        self.ctx.progress(&mut state, "PRD assembled").await;
        Ok(state)
    }
}
