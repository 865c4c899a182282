//! Graph wiring of the pipeline.

use std::sync::Arc;

use crate::graph::{
    guard, has_pending_tool_calls, CompilationError, CompiledStateGraph, FaultObserverFn, Node,
    StateGraph, SubgraphNode, ToolNode, DEFAULT_RECURSION_LIMIT, END, START,
};
use crate::memory::Checkpointer;
use crate::state::{FaultState, PipelineState};
use crate::tool_source::ToolSource;

use super::steps::{
    AssemblePrdStep, CompetitorDetailsStep, CompetitorListStep, CompetitorMatrixStep,
    CustomerDemandStep, ExtractFeatureStep, PrdSection, PrdSectionStep,
};
use super::{
    StepContext, NODE_ASSEMBLE_PRD, NODE_COMPETITOR_MATRIX, NODE_COMPETITOR_SUBGRAPH,
    NODE_CUSTOMER_DEMAND, NODE_EXTRACT_FEATURE, NODE_FETCH_COMPETITOR_DETAILS,
    NODE_FETCH_COMPETITOR_LIST, NODE_PRD_SUBGRAPH, NODE_SEARCH_COMPETITOR_DETAILS,
    NODE_SEARCH_COMPETITOR_LIST,
};

/// After `fetchCompetitorList`: into the search tool node while the model asks for tools.
pub fn route_competitor_list(state: &PipelineState) -> String {
    if has_pending_tool_calls(state) {
        NODE_SEARCH_COMPETITOR_LIST.to_string()
    } else {
        NODE_FETCH_COMPETITOR_DETAILS.to_string()
    }
}

/// After `fetchCompetitorFeatureDetails`: tool round, next queued competitor, or the table.
/// A recorded error always exits the loop.
pub fn route_competitor_details(state: &PipelineState) -> String {
    if has_pending_tool_calls(state) {
        NODE_SEARCH_COMPETITOR_DETAILS.to_string()
    } else if state.error().is_none() && !state.pending_process_competitor_list.is_empty() {
        NODE_FETCH_COMPETITOR_DETAILS.to_string()
    } else {
        NODE_COMPETITOR_MATRIX.to_string()
    }
}

fn fault_observer() -> FaultObserverFn<PipelineState> {
    Arc::new(|state: &PipelineState| state.error.clone())
}

fn step(node: impl Node<PipelineState> + 'static) -> Arc<dyn Node<PipelineState>> {
    guard(Arc::new(node))
}

/// Builds the pipeline graph.
///
/// Business steps are guarded so a recorded error drains the remaining edges. Subgraphs share
/// the checkpointer; their snapshots live under the child namespace.
///
/// **Interaction**: Uses `StepContext` for every step and `ToolSource` for both search tool nodes.
pub struct PipelineWorkflow {
    ctx: Arc<StepContext>,
    tools: Arc<dyn ToolSource>,
    checkpointer: Option<Arc<dyn Checkpointer<PipelineState>>>,
    recursion_limit: usize,
}

impl PipelineWorkflow {
    pub fn new(ctx: Arc<StepContext>, tools: Arc<dyn ToolSource>) -> Self {
        Self {
            ctx,
            tools,
            checkpointer: None,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer<PipelineState>>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    /// Ceiling applied to the parent graph and to each subgraph.
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    fn finish(
        &self,
        graph: StateGraph<PipelineState>,
    ) -> Result<CompiledStateGraph<PipelineState>, CompilationError> {
        let graph = graph
            .with_recursion_limit(self.recursion_limit)
            .with_fault_observer(fault_observer());
        match &self.checkpointer {
            Some(cp) => graph.compile_with_checkpointer(Arc::clone(cp)),
            None => graph.compile(),
        }
    }

    /// `fetchCompetitorList ⇄ searchCompetitorList`, then the details batch loop with its own
    /// tool node, then `createCompetitorTableMatrix → END`.
    pub fn competitor_subgraph(
        &self,
    ) -> Result<CompiledStateGraph<PipelineState>, CompilationError> {
        let mut graph = StateGraph::new();
        graph
            .add_node(
                NODE_FETCH_COMPETITOR_LIST,
                step(CompetitorListStep::new(self.ctx.clone())),
            )
            .add_node(
                NODE_SEARCH_COMPETITOR_LIST,
                Arc::new(ToolNode::new(NODE_SEARCH_COMPETITOR_LIST, self.tools.clone())),
            )
            .add_node(
                NODE_FETCH_COMPETITOR_DETAILS,
                step(CompetitorDetailsStep::new(self.ctx.clone())),
            )
            .add_node(
                NODE_SEARCH_COMPETITOR_DETAILS,
                Arc::new(ToolNode::new(NODE_SEARCH_COMPETITOR_DETAILS, self.tools.clone())),
            )
            .add_node(
                NODE_COMPETITOR_MATRIX,
                step(CompetitorMatrixStep::new(self.ctx.clone())),
            )
            .add_edge(START, NODE_FETCH_COMPETITOR_LIST)
            .add_conditional_edges(
                NODE_FETCH_COMPETITOR_LIST,
                Arc::new(route_competitor_list),
                [NODE_SEARCH_COMPETITOR_LIST, NODE_FETCH_COMPETITOR_DETAILS],
            )
            .add_edge(NODE_SEARCH_COMPETITOR_LIST, NODE_FETCH_COMPETITOR_LIST)
            .add_conditional_edges(
                NODE_FETCH_COMPETITOR_DETAILS,
                Arc::new(route_competitor_details),
                [
                    NODE_SEARCH_COMPETITOR_DETAILS,
                    NODE_FETCH_COMPETITOR_DETAILS,
                    NODE_COMPETITOR_MATRIX,
                ],
            )
            .add_edge(NODE_SEARCH_COMPETITOR_DETAILS, NODE_FETCH_COMPETITOR_DETAILS)
            .add_edge(NODE_COMPETITOR_MATRIX, END);
        self.finish(graph)
    }

    /// The four section writers in document order.
    pub fn prd_subgraph(&self) -> Result<CompiledStateGraph<PipelineState>, CompilationError> {
        let mut graph = StateGraph::new();
        let mut previous = START;
        for section in PrdSection::ALL {
            graph
                .add_node(
                    section.node_id(),
                    step(PrdSectionStep::new(section, self.ctx.clone())),
                )
                .add_edge(previous, section.node_id());
            previous = section.node_id();
        }
        graph.add_edge(previous, END);
        self.finish(graph)
    }

    /// The full pipeline.
    pub fn compile(&self) -> Result<CompiledStateGraph<PipelineState>, CompilationError> {
        let competitors = SubgraphNode::new(NODE_COMPETITOR_SUBGRAPH, self.competitor_subgraph()?);
        let prd = SubgraphNode::new(NODE_PRD_SUBGRAPH, self.prd_subgraph()?);

        let mut graph = StateGraph::new();
        graph
            .add_node(
                NODE_EXTRACT_FEATURE,
                step(ExtractFeatureStep::new(self.ctx.clone())),
            )
            .add_node(NODE_COMPETITOR_SUBGRAPH, step(competitors))
            .add_node(
                NODE_CUSTOMER_DEMAND,
                step(CustomerDemandStep::new(self.ctx.clone())),
            )
            .add_node(NODE_PRD_SUBGRAPH, step(prd))
            .add_node(NODE_ASSEMBLE_PRD, step(AssemblePrdStep::new(self.ctx.clone())))
            .add_edge(START, NODE_EXTRACT_FEATURE)
            .add_edge(NODE_EXTRACT_FEATURE, NODE_COMPETITOR_SUBGRAPH)
            .add_edge(NODE_COMPETITOR_SUBGRAPH, NODE_CUSTOMER_DEMAND)
            .add_edge(NODE_CUSTOMER_DEMAND, NODE_PRD_SUBGRAPH)
            .add_edge(NODE_PRD_SUBGRAPH, NODE_ASSEMBLE_PRD)
            .add_edge(NODE_ASSEMBLE_PRD, END);
        self.finish(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Message, ToolCall};

    fn tool_request() -> Message {
        Message::assistant_with_tools(
            "",
            vec![ToolCall {
                id: "c1".into(),
                name: "search".into(),
                arguments: "{}".into(),
            }],
        )
    }

    /// **Scenario**: The details router prefers a tool round, then the queue, then the table;
    /// an error exits even with work queued.
    #[test]
    fn details_routing() {
        let mut s = PipelineState::default();
        s.pending_process_competitor_list = vec!["B".into()];
        s.messages.push(tool_request());
        assert_eq!(route_competitor_details(&s), NODE_SEARCH_COMPETITOR_DETAILS);
        s.messages.push(Message::system("done"));
        assert_eq!(route_competitor_details(&s), NODE_FETCH_COMPETITOR_DETAILS);
        s.error = Some("quota exceeded".into());
        assert_eq!(route_competitor_details(&s), NODE_COMPETITOR_MATRIX);
        s.messages.push(tool_request());
        assert_eq!(route_competitor_details(&s), NODE_COMPETITOR_MATRIX);
    }

    #[test]
    fn list_routing() {
        let mut s = PipelineState::default();
        assert_eq!(route_competitor_list(&s), NODE_FETCH_COMPETITOR_DETAILS);
        s.messages.push(tool_request());
        assert_eq!(route_competitor_list(&s), NODE_SEARCH_COMPETITOR_LIST);
    }
}
