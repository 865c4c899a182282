//! Shared state threaded through every node of a run.
//!
//! The engine is generic over the state type. Two small traits let generic machinery
//! (the error guard and the tool node) read the parts they need without knowing domain fields.
//!
//! # Main types
//!
//! - [`FaultState`]: the optional error slot. Once set, guarded steps stop doing work.
//! - [`ConversationState`]: the append-only message transcript.
//! - [`PipelineState`]: the document pipeline's state record.

mod pipeline_state;

pub use pipeline_state::{CompetitorFeatureDetail, PipelineState};

use crate::message::Message;

/// State with an error slot.
pub trait FaultState {
    fn error(&self) -> Option<&str>;
    fn set_error(&mut self, error: String);
}

/// State with an ordered message transcript.
pub trait ConversationState: FaultState {
    fn messages(&self) -> &[Message];
    fn messages_mut(&mut self) -> &mut Vec<Message>;

    /// Trailing tool rounds: the suffix of `messages` made only of tool requests and results.
    fn trailing_tool_exchange(&self) -> &[Message] {
        let messages = self.messages();
        let start = messages
            .iter()
            .rposition(|m| !m.is_tool_exchange())
            .map_or(0, |i| i + 1);
        &messages[start..]
    }
}
