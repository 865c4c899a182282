use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::cache::CacheScope;
use crate::error::AgentError;
use crate::graph::Node;
use crate::pipeline::parse::parse_output;
use crate::pipeline::StepContext;
use crate::state::PipelineState;

use super::{cache_label, record_failure, require_feature};

/// Sections of the PRD, in document order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrdSection {
    CustomerAnalysis,
    ProductStrategy,
    ImplementationStrategyPart1,
    ImplementationStrategyPart2,
}

impl PrdSection {
    pub const ALL: [PrdSection; 4] = [
        PrdSection::CustomerAnalysis,
        PrdSection::ProductStrategy,
        PrdSection::ImplementationStrategyPart1,
        PrdSection::ImplementationStrategyPart2,
    ];

    /// Key in `PipelineState::prd_sections`; also the cache prompt label.
    pub fn key(self) -> &'static str {
        match self {
            PrdSection::CustomerAnalysis => "CustomerAnalysis",
            PrdSection::ProductStrategy => "ProductStrategy",
            PrdSection::ImplementationStrategyPart1 => "ImplementationStrategyPart1",
            PrdSection::ImplementationStrategyPart2 => "ImplementationStrategyPart2",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            PrdSection::CustomerAnalysis => "Customer Analysis",
            PrdSection::ProductStrategy => "Product Strategy",
            PrdSection::ImplementationStrategyPart1 => "Implementation Strategy (Part 1)",
            PrdSection::ImplementationStrategyPart2 => "Implementation Strategy (Part 2)",
        }
    }

    /// Graph node id of the step writing this section.
    pub fn node_id(self) -> &'static str {
        match self {
            PrdSection::CustomerAnalysis => "writeCustomerAnalysis",
            PrdSection::ProductStrategy => "writeProductStrategy",
            PrdSection::ImplementationStrategyPart1 => "writeImplementationStrategyPart1",
            PrdSection::ImplementationStrategyPart2 => "writeImplementationStrategyPart2",
        }
    }

    fn cache_node(self) -> &'static str {
        match self {
            PrdSection::CustomerAnalysis => "customerAnalysis",
            PrdSection::ProductStrategy => "productStrategy",
            PrdSection::ImplementationStrategyPart1 => "implementationStrategyPart1",
            PrdSection::ImplementationStrategyPart2 => "implementationStrategyPart2",
        }
    }

    fn instructions(self) -> &'static str {
        match self {
            PrdSection::CustomerAnalysis => {
                "Write the customer analysis: target segments, their pain points and the demand \
                 evidence from CRM and ticket data."
            }
            PrdSection::ProductStrategy => {
                "Write the product strategy: positioning against the competitors, differentiators \
                 and success metrics."
            }
            PrdSection::ImplementationStrategyPart1 => {
                "Plan the first implementation phase: the minimum feature set, its milestones and \
                 dependencies."
            }
            PrdSection::ImplementationStrategyPart2 => {
                "Plan the follow-up implementation phase: extensions after the first release, \
                 rollout and risks."
            }
        }
    }

    fn is_plan(self) -> bool {
        matches!(
            self,
            PrdSection::ImplementationStrategyPart1 | PrdSection::ImplementationStrategyPart2
        )
    }
}

#[derive(Deserialize)]
struct PlanStep {
    title: String,
    #[serde(default)]
    details: String,
}

#[derive(Deserialize)]
struct Output {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    steps: Option<Vec<PlanStep>>,
}

impl Output {
    fn into_markdown(self) -> Option<String> {
        if let Some(content) = self.content.filter(|c| !c.trim().is_empty()) {
            return Some(content);
        }
        let steps = self.steps.filter(|s| !s.is_empty())?;
        let mut out = String::new();
        for (i, step) in steps.iter().enumerate() {
            let _ = write!(out, "{}. **{}**", i + 1, step.title);
            if !step.details.is_empty() {
                let _ = write!(out, ": {}", step.details);
            }
            out.push('\n');
        }
        Some(out)
    }
}

fn system_prompt(section: PrdSection, feature: &str, state: &PipelineState) -> String {
    let mut prompt = format!(
        "You are a senior product manager writing a PRD for the feature: {}.\n{}\n",
        feature,
        section.instructions()
    );
    if section.is_plan() {
        prompt.push_str(
            "Answer with a JSON object: {\"steps\": [{\"title\": string, \"details\": string}], \
             \"error\": string | null}.\n",
        );
    } else {
        prompt.push_str(
            "Answer with a JSON object: {\"content\": markdown string, \"error\": string | null}.\n",
        );
    }
    if let Some(matrix) = &state.competitor_table_matrix {
        let _ = write!(prompt, "\nCompetitor matrix:\n{}\n", matrix);
    }
    if let Some(crm) = &state.system_sales_force_data {
        let _ = write!(prompt, "\nCRM data:\n{}\n", crm);
    }
    if let Some(tickets) = &state.system_jira_data {
        let _ = write!(prompt, "\nTicket data:\n{}\n", tickets);
    }
    for earlier in PrdSection::ALL.iter().take_while(|s| **s != section) {
        if let Some(body) = state.prd_sections.get(earlier.key()) {
            let _ = write!(prompt, "\n{}:\n{}\n", earlier.title(), body);
        }
    }
    prompt
}

/// Writes one PRD section. Cached per section, feature and competitor set.
pub struct PrdSectionStep {
    section: PrdSection,
    ctx: Arc<StepContext>,
}

impl PrdSectionStep {
    pub fn new(section: PrdSection, ctx: Arc<StepContext>) -> Self {
        Self { section, ctx }
    }
}

#[async_trait]
impl Node<PipelineState> for PrdSectionStep {
    fn id(&self) -> &str {
        self.section.node_id()
    }

    async fn run(&self, mut state: PipelineState) -> Result<PipelineState, AgentError> {
        let node_id = self.section.node_id();
        let Some(feature) = require_feature(&mut state, node_id) else {
            return Ok(state);
        };
        let scope = CacheScope::node(self.section.cache_node())
            .with_feature(&feature)
            .with_competitors(state.competitors_signature());
        let label = self.section.key();

        let (body, hit) = match self.ctx.cache.lookup::<String>(label, &scope).await {
            Some(body) => (body, true),
            None => {
                let prompt = system_prompt(self.section, &feature, &state);
                let response = match self.ctx.generate(&state, prompt, false).await {
                    Ok(r) => r,
                    Err(e) => {
                        record_failure(&mut state, node_id, e);
                        return Ok(state);
                    }
                };
                let body = match parse_output::<Output>(&response.content, self.section.title()) {
                    Ok(out) => out.into_markdown(),
                    Err(e) => {
                        record_failure(&mut state, node_id, e);
                        return Ok(state);
                    }
                };
                let Some(body) = body else {
                    record_failure(
                        &mut state,
                        node_id,
                        format!("Could not generate {}", self.section.title()),
                    );
                    return Ok(state);
                };
                self.ctx.cache.store(label, &body, &scope).await;
                (body, false)
            }
        };
        state.prd_sections.insert(label.to_string(), body);
        self.ctx
            .progress(
                &mut state,
                format!("{}{} section generated", cache_label(hit), self.section.title()),
            )
            .await;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{InMemoryScopedCache, StepCache};
    use crate::llm::MockLlm;

    fn state(competitors: &[&str]) -> PipelineState {
        let mut s = PipelineState::from_input("x");
        s.product_feature = Some("markdown editing".into());
        s.add_competitors(competitors);
        s
    }

    #[test]
    fn plan_steps_render_as_numbered_list() {
        let out = Output {
            content: None,
            steps: Some(vec![
                PlanStep {
                    title: "Editor core".into(),
                    details: "parser and renderer".into(),
                },
                PlanStep {
                    title: "Export".into(),
                    details: String::new(),
                },
            ]),
        };
        assert_eq!(
            out.into_markdown().unwrap(),
            "1. **Editor core**: parser and renderer\n2. **Export**\n"
        );
        assert!(Output { content: None, steps: None }.into_markdown().is_none());
    }

    /// **Scenario**: A section is cached per competitor set; a different set recomputes.
    #[tokio::test]
    async fn section_cached_per_competitor_set() {
        let llm = Arc::new(MockLlm::fixed(r#"{"content": "Writers who want speed."}"#));
        let cache = StepCache::new(Arc::new(InMemoryScopedCache::default()));
        let step = PrdSectionStep::new(
            PrdSection::CustomerAnalysis,
            Arc::new(StepContext::new(llm.clone(), cache)),
        );

        let out = step.run(state(&["A", "B"])).await.unwrap();
        assert_eq!(out.prd_sections["CustomerAnalysis"], "Writers who want speed.");
        assert_eq!(
            out.messages.last().unwrap().content(),
            "Customer Analysis section generated"
        );
        let out = step.run(state(&["B", "A"])).await.unwrap();
        assert_eq!(
            out.messages.last().unwrap().content(),
            "(Cache) Customer Analysis section generated"
        );
        assert_eq!(llm.call_count(), 1);

        step.run(state(&["C"])).await.unwrap();
        assert_eq!(llm.call_count(), 2);
    }

    /// **Scenario**: Later sections see the earlier ones in their prompt.
    #[tokio::test]
    async fn later_sections_see_earlier_ones() {
        let llm = Arc::new(MockLlm::fixed(r#"{"steps": [{"title": "MVP", "details": "core"}]}"#));
        let step = PrdSectionStep::new(
            PrdSection::ImplementationStrategyPart1,
            Arc::new(StepContext::new(llm.clone(), StepCache::disabled())),
        );
        let mut s = state(&[]);
        s.prd_sections
            .insert("ProductStrategy".into(), "Win on speed.".into());
        let out = step.run(s).await.unwrap();
        assert_eq!(out.prd_sections["ImplementationStrategyPart1"], "1. **MVP**: core\n");
        assert!(llm.system_prompts()[0].contains("Win on speed."));
    }
}
