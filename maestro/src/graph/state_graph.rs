//! State graph: nodes + explicit edges (from → to) and optional conditional edges.
//!
//! Add nodes with `add_node`, wire them with `add_edge(from, to)` using `START` and `END` for
//! entry and exit, and use `add_conditional_edges` to route on state. Then `compile` or
//! `compile_with_checkpointer` to get a `CompiledStateGraph`.
//!
//! # Conditional edges
//!
//! From a source node, a routing function `(state) -> id` is called after the node runs; the
//! id must be one of the declared targets. A node has either one outgoing `add_edge` or
//! `add_conditional_edges`, not both. A node with neither is terminal.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::Debug;
use std::sync::Arc;

use crate::graph::compile_error::CompilationError;
use crate::graph::compiled::{CompiledStateGraph, FaultObserverFn};
use crate::graph::conditional::{ConditionalRouter, ConditionalRouterFn, NextEntry};
use crate::graph::node::Node;
use crate::memory::Checkpointer;

/// Sentinel for graph entry: use as `from_id` in `add_edge(START, first_node_id)`.
pub const START: &str = "__start__";

/// Sentinel for graph exit: use as `to_id` in `add_edge(last_node_id, END)`.
pub const END: &str = "__end__";

/// Node executions allowed per run unless overridden.
pub const DEFAULT_RECURSION_LIMIT: usize = 100;

/// State graph: nodes plus explicit edges and optional conditional edges.
///
/// Generic over state type `S`. Build with `add_node` / `add_edge(from, to)` and optionally
/// `add_conditional_edges`, then `compile()` to obtain an executable graph.
///
/// **Interaction**: Accepts `Arc<dyn Node<S>>`; produces `CompiledStateGraph<S>`.
pub struct StateGraph<S> {
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    /// Edges (from_id, to_id) in declaration order.
    edges: Vec<(String, String)>,
    conditional_edges: HashMap<String, ConditionalRouter<S>>,
    recursion_limit: usize,
    fault_observer: Option<FaultObserverFn<S>>,
}

impl<S> Default for StateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: Vec::new(),
            conditional_edges: HashMap::new(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            fault_observer: None,
        }
    }

    /// Sets the node-execution ceiling for runs of the compiled graph.
    /// `RunnableConfig::recursion_limit` overrides it per run.
    pub fn with_recursion_limit(self, limit: usize) -> Self {
        Self {
            recursion_limit: limit,
            ..self
        }
    }

    /// Installs an observer that reads the error slot of the state after each node. The engine
    /// only logs what it returns; routing is unaffected.
    pub fn with_fault_observer(self, observer: FaultObserverFn<S>) -> Self {
        Self {
            fault_observer: Some(observer),
            ..self
        }
    }

    /// Adds a node; id must be unique. Replaces if same id.
    pub fn add_node(&mut self, id: impl Into<String>, node: Arc<dyn Node<S>>) -> &mut Self {
        self.nodes.insert(id.into(), node);
        self
    }

    /// Adds an edge from `from_id` to `to_id`. Use `START` for entry and `END` for exit.
    pub fn add_edge(&mut self, from_id: impl Into<String>, to_id: impl Into<String>) -> &mut Self {
        self.edges.push((from_id.into(), to_id.into()));
        self
    }

    /// Adds conditional edges from `source`: after it runs, `path(state)` names the next node,
    /// which must be one of `targets` (node ids or `END`).
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// graph.add_conditional_edges(
    ///     "fetchCompetitorList",
    ///     Arc::new(|s: &PipelineState| {
    ///         if has_pending_tool_calls(s) { "searchCompetitorList".into() } else { "next".into() }
    ///     }),
    ///     ["searchCompetitorList", "next"],
    /// );
    /// ```
    pub fn add_conditional_edges<I, T>(
        &mut self,
        source: impl Into<String>,
        path: ConditionalRouterFn<S>,
        targets: I,
    ) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let targets: BTreeSet<String> = targets.into_iter().map(Into::into).collect();
        self.conditional_edges
            .insert(source.into(), ConditionalRouter::new(path, targets));
        self
    }

    /// Builds the executable graph after validating the declaration.
    pub fn compile(self) -> Result<CompiledStateGraph<S>, CompilationError> {
        self.compile_internal(None)
    }

    /// Builds the executable graph with a checkpointer. Runs invoked with a `thread_id` save a
    /// snapshot after every node and resume from the latest unfinished one.
    pub fn compile_with_checkpointer(
        self,
        checkpointer: Arc<dyn Checkpointer<S>>,
    ) -> Result<CompiledStateGraph<S>, CompilationError> {
        self.compile_internal(Some(checkpointer))
    }

    fn compile_internal(
        self,
        checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    ) -> Result<CompiledStateGraph<S>, CompilationError> {
        for (from, to) in &self.edges {
            if from != START && !self.nodes.contains_key(from) {
                return Err(CompilationError::NodeNotFound(from.clone()));
            }
            if to != END && !self.nodes.contains_key(to) {
                return Err(CompilationError::NodeNotFound(to.clone()));
            }
        }
        for (source, router) in &self.conditional_edges {
            if !self.nodes.contains_key(source) {
                return Err(CompilationError::NodeNotFound(source.clone()));
            }
            if router.targets.is_empty() {
                return Err(CompilationError::InvalidConditionalTarget(source.clone()));
            }
            for target in &router.targets {
                if target != END && !self.nodes.contains_key(target) {
                    return Err(CompilationError::InvalidConditionalTarget(target.clone()));
                }
            }
        }

        let mut start_edges = self.edges.iter().filter(|(f, _)| f == START);
        let first = match (start_edges.next(), start_edges.next()) {
            (Some((_, to)), None) if to != END => to.clone(),
            _ => return Err(CompilationError::MissingStart),
        };

        let mut next_map: HashMap<String, NextEntry<S>> = HashMap::new();
        for (from, to) in self.edges.iter().filter(|(f, _)| f != START) {
            if next_map
                .insert(from.clone(), NextEntry::Unconditional(to.clone()))
                .is_some()
            {
                return Err(CompilationError::DuplicateEdge(from.clone()));
            }
        }
        for (source, router) in &self.conditional_edges {
            if next_map.contains_key(source) {
                return Err(CompilationError::NodeHasBothEdgeAndConditional(
                    source.clone(),
                ));
            }
            next_map.insert(source.clone(), NextEntry::Conditional(router.clone()));
        }

        if !terminal_reachable(&first, &next_map) {
            return Err(CompilationError::NoTerminalReachable);
        }

        Ok(CompiledStateGraph {
            nodes: self.nodes,
            first_node_id: first,
            next_map,
            checkpointer,
            recursion_limit: self.recursion_limit,
            fault_observer: self.fault_observer,
        })
    }
}

/// Breadth-first walk from `first`: true when some reachable node can end the run.
fn terminal_reachable<S>(first: &str, next_map: &HashMap<String, NextEntry<S>>) -> bool {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::from([first]);
    while let Some(id) = queue.pop_front() {
        if !seen.insert(id) {
            continue;
        }
        let successors: Vec<&str> = match next_map.get(id) {
            None => return true,
            Some(NextEntry::Unconditional(to)) => vec![to.as_str()],
            Some(NextEntry::Conditional(router)) => router.targets().collect(),
        };
        for to in successors {
            if to == END {
                return true;
            }
            queue.push_back(to);
        }
    }
    false
}
