use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::graph::Node;
use crate::pipeline::{DemandSource, StepContext, NODE_CUSTOMER_DEMAND};
use crate::state::PipelineState;

use super::{record_failure, require_feature};

/// Pulls customer demand for the feature from the CRM and ticketing sources. Not cached:
/// demand data changes between runs. A missing source is skipped.
pub struct CustomerDemandStep {
    ctx: Arc<StepContext>,
}

impl CustomerDemandStep {
    pub fn new(ctx: Arc<StepContext>) -> Self {
        Self { ctx }
    }
}

async fn fetch(
    source: Option<&Arc<dyn DemandSource>>,
    feature: &str,
) -> Option<Result<(String, serde_json::Value), String>> {
    let source = source?;
    Some(
        source
            .fetch(feature)
            .await
            .map(|data| (source.name().to_string(), data))
            .map_err(|e| e.to_string()),
    )
}

#[async_trait]
impl Node<PipelineState> for CustomerDemandStep {
    fn id(&self) -> &str {
        NODE_CUSTOMER_DEMAND
    }

    async fn run(&self, mut state: PipelineState) -> Result<PipelineState, AgentError> {
        let Some(feature) = require_feature(&mut state, NODE_CUSTOMER_DEMAND) else {
            return Ok(state);
        };
        let (crm, ticketing) = futures::join!(
            fetch(self.ctx.crm.as_ref(), &feature),
            fetch(self.ctx.ticketing.as_ref(), &feature)
        );

        match crm {
            Some(Ok((name, data))) => {
                state.system_sales_force_data = Some(data);
                self.ctx
                    .progress(&mut state, format!("Customer demand loaded from {}", name))
                    .await;
            }
            Some(Err(e)) => {
                record_failure(&mut state, NODE_CUSTOMER_DEMAND, e);
                return Ok(state);
            }
            None => tracing::debug!("no CRM source configured"),
        }
        match ticketing {
            Some(Ok((name, data))) => {
                state.system_jira_data = Some(data);
                self.ctx
                    .progress(&mut state, format!("Customer demand loaded from {}", name))
                    .await;
            }
            Some(Err(e)) => record_failure(&mut state, NODE_CUSTOMER_DEMAND, e),
            None => tracing::debug!("no ticketing source configured"),
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::cache::StepCache;
    use crate::llm::MockLlm;
    use crate::pipeline::{DemandError, StaticDemandSource};
    use crate::state::FaultState;

    struct Down;

    #[async_trait]
    impl DemandSource for Down {
        fn name(&self) -> &str {
            "tickets"
        }
        async fn fetch(&self, _: &str) -> Result<serde_json::Value, DemandError> {
            Err(DemandError::Unavailable {
                source_name: "tickets".into(),
                message: "timeout".into(),
            })
        }
    }

    fn state() -> PipelineState {
        let mut s = PipelineState::from_input("x");
        s.product_feature = Some("markdown editing".into());
        s
    }

    /// **Scenario**: Both sources fill their slots; an unavailable one records the failure.
    #[tokio::test]
    async fn loads_demand_and_records_outage() {
        let ctx = StepContext::new(Arc::new(MockLlm::fixed("{}")), StepCache::disabled())
            .with_crm(Arc::new(StaticDemandSource::new("crm", json!({"opportunities": 3}))))
            .with_ticketing(Arc::new(StaticDemandSource::new("tickets", json!([]))));
        let out = CustomerDemandStep::new(Arc::new(ctx)).run(state()).await.unwrap();
        assert_eq!(out.system_sales_force_data, Some(json!({"opportunities": 3})));
        assert_eq!(out.system_jira_data, Some(json!([])));
        assert_eq!(out.messages.len(), 2);

        let ctx = StepContext::new(Arc::new(MockLlm::fixed("{}")), StepCache::disabled())
            .with_ticketing(Arc::new(Down));
        let out = CustomerDemandStep::new(Arc::new(ctx)).run(state()).await.unwrap();
        assert_eq!(out.error(), Some("tickets unavailable: timeout"));
        assert!(out.system_sales_force_data.is_none());
    }
}
