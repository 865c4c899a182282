//! Role-tagged conversation turns stored in shared state.
//!
//! An `Assistant` message with non-empty `tool_calls` marks "invocation requested"; a `Tool`
//! message carries the result of one invocation. The tool-loop predicate and `ToolNode` talk
//! to each other only through this shape.

use serde::{Deserialize, Serialize};

/// A single tool invocation requested by the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Id used to correlate the `Tool` message answering this call.
    pub id: String,
    /// Tool name as listed by the `ToolSource`.
    pub name: String,
    /// Arguments as a JSON string.
    pub arguments: String,
}

/// A single message in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    /// System prompt or progress note.
    System { content: String },
    /// Human input.
    Human { content: String },
    /// Model reply; may request tools.
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    /// Result of one tool invocation.
    Tool {
        call_id: String,
        name: String,
        content: String,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self::Human {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls,
        }
    }

    pub fn tool(
        call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::Tool {
            call_id: call_id.into(),
            name: name.into(),
            content: content.into(),
        }
    }

    /// Text content regardless of role.
    pub fn content(&self) -> &str {
        match self {
            Message::System { content }
            | Message::Human { content }
            | Message::Assistant { content, .. }
            | Message::Tool { content, .. } => content,
        }
    }

    /// Pending tool invocations carried by this message (empty for non-assistant roles).
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    /// True for the two shapes that make up a tool round: a requesting assistant turn or a result.
    pub fn is_tool_exchange(&self) -> bool {
        matches!(self, Message::Tool { .. }) || !self.tool_calls().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Constructors produce the expected roles and content.
    #[test]
    fn message_constructors() {
        assert!(matches!(Message::system("s"), Message::System { ref content } if content == "s"));
        assert!(matches!(Message::human("h"), Message::Human { ref content } if content == "h"));
        let a = Message::assistant("a");
        assert_eq!(a.content(), "a");
        assert!(a.tool_calls().is_empty());
        assert!(!a.is_tool_exchange());
    }

    /// **Scenario**: An assistant message with tool calls and a tool result both count as tool exchange.
    #[test]
    fn tool_exchange_detection() {
        let call = ToolCall {
            id: "c1".into(),
            name: "web_search".into(),
            arguments: "{}".into(),
        };
        let req = Message::assistant_with_tools("", vec![call.clone()]);
        assert_eq!(req.tool_calls(), &[call]);
        assert!(req.is_tool_exchange());
        assert!(Message::tool("c1", "web_search", "r").is_tool_exchange());
        assert!(!Message::human("x").is_tool_exchange());
    }

    /// **Scenario**: Messages serialize with a role tag and omit empty tool_calls.
    #[test]
    fn message_serde_shape() {
        let json = serde_json::to_value(Message::assistant("hi")).unwrap();
        assert_eq!(json["role"], "assistant");
        assert!(json.get("tool_calls").is_none());
        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(back, Message::assistant("hi"));
    }
}
