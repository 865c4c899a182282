//! Business steps of the pipeline. Each is a `Node<PipelineState>` that never returns `Err`:
//! model, tool and parse failures land in the state's error slot.

mod assemble;
mod competitor_details;
mod competitor_list;
mod competitor_matrix;
mod customer_demand;
mod extract_feature;
mod prd_section;

pub use assemble::AssemblePrdStep;
pub use competitor_details::CompetitorDetailsStep;
pub use competitor_list::CompetitorListStep;
pub use competitor_matrix::CompetitorMatrixStep;
pub use customer_demand::CustomerDemandStep;
pub use extract_feature::ExtractFeatureStep;
pub use prd_section::{PrdSection, PrdSectionStep};

use std::fmt::Display;

use crate::state::{FaultState, PipelineState};

/// Records a step failure in the error slot.
fn record_failure(state: &mut PipelineState, step: &str, error: impl Display) {
    let error = error.to_string();
    tracing::warn!(step, %error, "step failed");
    state.set_error(error);
}

/// The extracted feature, or a recorded failure when an upstream step left it unset.
fn require_feature(state: &mut PipelineState, step: &str) -> Option<String> {
    match state.product_feature.clone().filter(|f| !f.trim().is_empty()) {
        Some(feature) => Some(feature),
        None => {
            record_failure(state, step, "productFeature is missing");
            None
        }
    }
}

/// True while the step is between tool rounds (the transcript ends in tool requests/results).
fn returning_from_tools(state: &PipelineState) -> bool {
    use crate::state::ConversationState;
    !state.trailing_tool_exchange().is_empty()
}

fn cache_label(hit: bool) -> &'static str {
    if hit {
        "(Cache) "
    } else {
        ""
    }
}
