//! # Maestro
//!
//! A graph-driven document pipeline: one shared state record flows through named steps
//! (feature extraction, competitor research, customer demand, PRD writing), with conditional
//! routing, tool-call loops, a recursion ceiling and resumable checkpoints. Expensive
//! generation steps are memoized in a scoped cache.
//!
//! ## Design principles
//!
//! - **Single state type**: every node receives the state and returns it; no node keeps a
//!   reference across invocations.
//! - **Errors as data**: steps record failures in the state's error slot. The [`guard`]
//!   combinator turns every later step into a pass-through, so a faulted run drains to a
//!   terminal node. Only wiring faults ([`AgentError::RecursionLimit`],
//!   [`AgentError::InvalidRoute`]) abort a run.
//! - **Stores never fail a run**: cache and checkpoint I/O errors are logged and treated as
//!   misses.
//!
//! ## Main modules
//!
//! - [`graph`]: [`StateGraph`], [`CompiledStateGraph`], [`Node`], [`guard`], [`SubgraphNode`],
//!   [`ToolNode`] and [`has_pending_tool_calls`].
//! - [`memory`]: [`Checkpointer`], [`MemorySaver`], [`SqliteSaver`], [`RunnableConfig`].
//! - [`cache`]: [`ScopedCache`], [`InMemoryScopedCache`], [`SqliteScopedCache`], [`StepCache`].
//! - [`state`]: [`PipelineState`] plus the [`FaultState`] / [`ConversationState`] traits.
//! - [`message`]: [`Message`], [`ToolCall`].
//! - [`llm`]: [`LlmClient`], [`LlmResponse`], [`MockLlm`].
//! - [`tool_source`]: [`ToolSource`], [`ToolSpec`], [`MockToolSource`].
//! - [`pipeline`]: [`StepContext`], the steps, [`PipelineWorkflow`], [`Stores`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use maestro::{
//!     InMemoryScopedCache, MockLlm, MockToolSource, PipelineState, PipelineWorkflow,
//!     RunnableConfig, StepCache, StepContext,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let llm = Arc::new(MockLlm::fixed(r#"{"productFeature": "markdown editing"}"#));
//! let cache = StepCache::new(Arc::new(InMemoryScopedCache::default()));
//! let ctx = Arc::new(StepContext::new(llm, cache));
//! let graph = PipelineWorkflow::new(ctx, Arc::new(MockToolSource::search_example()))
//!     .compile()
//!     .unwrap();
//! let state = graph
//!     .invoke(PipelineState::from_input("a markdown editor"), Some(RunnableConfig::default()))
//!     .await
//!     .unwrap();
//! println!("{:?}", state.output_product_prd);
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod graph;
pub mod llm;
pub mod memory;
pub mod message;
pub mod pipeline;
pub mod state;
pub mod tool_source;

pub use cache::{
    CacheEntry, CacheError, CacheOptions, CacheScope, InMemoryScopedCache, ListMatch,
    ScopeField, ScopedCache, SqliteScopedCache, StepCache,
};
pub use error::AgentError;
pub use graph::{
    guard, has_pending_tool_calls, CompilationError, CompiledStateGraph, Node, RunContext,
    StateGraph, SubgraphNode, ToolNode, DEFAULT_RECURSION_LIMIT, END, START,
};
pub use llm::{LlmClient, LlmResponse, MockLlm};
pub use memory::{
    Checkpoint, CheckpointError, CheckpointListItem, Checkpointer, JsonSerializer, MemorySaver,
    RunnableConfig, SqliteSaver,
};
pub use message::{Message, ToolCall};
pub use pipeline::{
    DemandSource, PipelineWorkflow, PrdSection, ProgressNotifier, StaticDemandSource,
    StepContext, Stores,
};
pub use state::{CompetitorFeatureDetail, ConversationState, FaultState, PipelineState};
pub use tool_source::{MockToolSource, ToolSource, ToolSourceError, ToolSpec};
