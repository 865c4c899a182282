//! Document-generation pipeline: feature extraction, competitor research, customer demand and
//! PRD writing, wired as a graph of guarded, cache-first steps.
//!
//! # Main types
//!
//! - [`StepContext`]: the model client, step cache, tools, progress notifier and demand
//!   sources shared by all steps.
//! - [`PipelineWorkflow`]: builds the parent graph with the competitor and PRD subgraphs.
//! - [`Stores`]: the durable cache and checkpoint stores opened from `Settings`.
//!
//! # Flow
//!
//! `extractProductFeature → competitorSubgraph → fetchCustomerDemand → prdSubgraph →
//! assemblePrd`. The competitor subgraph loops `fetchCompetitorList` and
//! `fetchCompetitorFeatureDetails` through their search tool nodes, drains the pending
//! competitor queue, then builds the comparison table.

mod context;
pub mod parse;
mod steps;
mod stores;
mod workflow;

pub use context::{
    DemandError, DemandSource, NotifyError, ProgressNotifier, StaticDemandSource, StepContext,
    PROCESS_INPUT_PROMPT,
};
pub use steps::{
    AssemblePrdStep, CompetitorDetailsStep, CompetitorListStep, CompetitorMatrixStep,
    CustomerDemandStep, ExtractFeatureStep, PrdSection, PrdSectionStep,
};
pub use stores::{StoreError, Stores};
pub use workflow::{route_competitor_details, route_competitor_list, PipelineWorkflow};

/// Web search for competitors of a feature.
pub const TOOL_SEARCH_COMPETITORS: &str = "search_competitors";
/// Web search for one competitor's take on a feature.
pub const TOOL_SEARCH_COMPETITOR_FEATURE: &str = "search_competitor_feature";

pub const NODE_EXTRACT_FEATURE: &str = "extractProductFeature";
pub const NODE_COMPETITOR_SUBGRAPH: &str = "competitorSubgraph";
pub const NODE_FETCH_COMPETITOR_LIST: &str = "fetchCompetitorList";
pub const NODE_SEARCH_COMPETITOR_LIST: &str = "searchCompetitorList";
pub const NODE_FETCH_COMPETITOR_DETAILS: &str = "fetchCompetitorFeatureDetails";
pub const NODE_SEARCH_COMPETITOR_DETAILS: &str = "searchCompetitorFeatureDetails";
pub const NODE_COMPETITOR_MATRIX: &str = "createCompetitorTableMatrix";
pub const NODE_CUSTOMER_DEMAND: &str = "fetchCustomerDemand";
pub const NODE_PRD_SUBGRAPH: &str = "prdSubgraph";
pub const NODE_ASSEMBLE_PRD: &str = "assemblePrd";
