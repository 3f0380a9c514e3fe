use serde::{Deserialize, Serialize};

/// Maximum size (in characters) for a tool result kept in history and sent
/// back to the API. Large results (like base64 screenshots) blow up the
/// context window and the bill, so they are truncated with a marker.
pub const MAX_TOOL_RESULT_CHARS: usize = 10_000;

/// One message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMessage {
    /// One of `"user"`, `"assistant"`, `"system"`, or `"tool"`.
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

/// The conversation so far, oldest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationHistory {
    messages: Vec<AgentMessage>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: &str) {
        self.messages.push(AgentMessage {
            role: "user".into(),
            content: content.into(),
            tool_call_id: None,
            tool_name: None,
        });
    }

    pub fn push_assistant(&mut self, content: &str) {
        self.messages.push(AgentMessage {
            role: "assistant".into(),
            content: content.into(),
            tool_call_id: None,
            tool_name: None,
        });
    }

    /// Record a tool result, truncating oversized payloads.
    pub fn push_tool_result(&mut self, call_id: &str, tool_name: &str, result: &str) {
        self.messages.push(AgentMessage {
            role: "tool".into(),
            content: truncate_tool_result(result),
            tool_call_id: Some(call_id.into()),
            tool_name: Some(tool_name.into()),
        });
    }

    pub fn messages(&self) -> &[AgentMessage] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Cap a tool result at [`MAX_TOOL_RESULT_CHARS`], appending a marker naming
/// how much was dropped. Truncation is never silent.
pub fn truncate_tool_result(result: &str) -> String {
    let total = result.chars().count();
    if total <= MAX_TOOL_RESULT_CHARS {
        return result.to_string();
    }
    let kept: String = result.chars().take(MAX_TOOL_RESULT_CHARS).collect();
    let dropped = total - MAX_TOOL_RESULT_CHARS;
    format!("{kept}\n[truncated {dropped} characters]")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn history_accumulates_in_order() {
        let mut history = ConversationHistory::new();
        history.push_user("add a cube");
        history.push_assistant("Placing a cube now.");
        history.push_tool_result("call_1", "scene_query", r#"{"matches":[]}"#);

        assert_eq!(history.len(), 3);
        let roles: Vec<&str> = history.messages().iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["user", "assistant", "tool"]);
        assert_eq!(
            history.messages()[2].tool_call_id.as_deref(),
            Some("call_1")
        );
    }

    #[test]
    fn clear_empties_history() {
        let mut history = ConversationHistory::new();
        history.push_user("hello");
        assert!(!history.is_empty());
        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn small_tool_results_pass_through() {
        let result = truncate_tool_result("short");
        assert_eq!(result, "short");
    }

    #[test]
    fn oversized_tool_results_are_truncated_with_marker() {
        let big = "x".repeat(MAX_TOOL_RESULT_CHARS + 500);
        let result = truncate_tool_result(&big);
        assert!(result.len() < big.len());
        assert!(result.contains("[truncated 500 characters]"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let big = "\u{00e9}".repeat(MAX_TOOL_RESULT_CHARS + 1);
        let result = truncate_tool_result(&big);
        assert!(result.contains("[truncated 1 characters]"));
        // Still valid UTF-8 by construction; the kept prefix is whole chars.
        assert!(result.starts_with('\u{00e9}'));
    }

    #[test]
    fn push_tool_result_applies_truncation() {
        let mut history = ConversationHistory::new();
        let big = "y".repeat(MAX_TOOL_RESULT_CHARS * 2);
        history.push_tool_result("call_2", "viewport_screenshot", &big);
        assert!(history.messages()[0].content.contains("[truncated"));
    }

    #[test]
    fn message_serialization_omits_empty_tool_fields() {
        let mut history = ConversationHistory::new();
        history.push_user("hi");
        let json = serde_json::to_string(&history.messages()[0]).unwrap();
        assert!(!json.contains("tool_call_id"));
        assert!(!json.contains("tool_name"));
    }
}
