//! State record for the feature → competitors → PRD pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ConversationState, FaultState};
use crate::message::Message;

/// Feature details gathered for one competitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorFeatureDetail {
    pub competitor_name: String,
    pub feature_details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
}

/// State for one pipeline run.
///
/// Each domain field is written once by its owning step. `pending_process_competitor_list`
/// is a work queue: the details step dequeues one item per visit and its edge re-enters the
/// same node while items remain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub messages: Vec<Message>,
    pub input_text: String,
    #[serde(default)]
    pub product_feature: Option<String>,
    #[serde(default)]
    pub competitor_list: Vec<String>,
    #[serde(default)]
    pub pending_process_competitor_list: Vec<String>,
    /// Competitor being processed by the details step across its tool rounds.
    #[serde(default)]
    pub current_competitor: Option<String>,
    #[serde(default)]
    pub competitor_feature_details: Vec<CompetitorFeatureDetail>,
    #[serde(default)]
    pub competitor_table_matrix: Option<String>,
    #[serde(default)]
    pub system_sales_force_data: Option<serde_json::Value>,
    #[serde(default)]
    pub system_jira_data: Option<serde_json::Value>,
    /// PRD section title -> markdown.
    #[serde(default)]
    pub prd_sections: BTreeMap<String, String>,
    #[serde(default)]
    pub output_product_prd: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PipelineState {
    /// Seeds a run with the immutable input text.
    pub fn from_input(input_text: impl Into<String>) -> Self {
        Self {
            input_text: input_text.into(),
            ..Self::default()
        }
    }

    /// Appends competitors not already present, preserving first-seen order.
    /// Returns how many were added.
    pub fn add_competitors<I, T>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut added = 0;
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty()
                || self
                    .competitor_list
                    .iter()
                    .any(|c| c.eq_ignore_ascii_case(name))
            {
                continue;
            }
            self.competitor_list.push(name.to_string());
            added += 1;
        }
        added
    }

    /// Sorted, comma-joined competitor names; the cache signature of the competitor set.
    pub fn competitors_signature(&self) -> String {
        let mut names = self.competitor_list.clone();
        names.sort();
        names.join(",")
    }

    /// Removes and returns the next competitor waiting for details.
    pub fn next_pending_competitor(&mut self) -> Option<String> {
        if self.pending_process_competitor_list.is_empty() {
            None
        } else {
            Some(self.pending_process_competitor_list.remove(0))
        }
    }

    /// Records details for a competitor, replacing an earlier record with the same name.
    pub fn put_competitor_detail(&mut self, detail: CompetitorFeatureDetail) {
        match self
            .competitor_feature_details
            .iter_mut()
            .find(|d| d.competitor_name == detail.competitor_name)
        {
            Some(existing) => *existing = detail,
            None => self.competitor_feature_details.push(detail),
        }
    }
}

impl FaultState for PipelineState {
    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn set_error(&mut self, error: String) {
        self.error = Some(error);
    }
}

impl ConversationState for PipelineState {
    fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn messages_mut(&mut self) -> &mut Vec<Message> {
        &mut self.messages
    }
}
