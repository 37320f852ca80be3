use crate::traits::ChatMessage;

/// Prefix marking a transcript turn as tool output rather than user speech.
pub const TOOL_RESULT_PREFIX: &str = "Tool result: ";

/// Append-only transcript of one chat session.
///
/// Owned by the driver (the REPL) and lent to the agent loop for the
/// duration of a user turn. Nothing is persisted; dropping the session
/// discards the conversation.
#[derive(Debug, Clone, Default)]
pub struct Session {
    turns: Vec<ChatMessage>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(ChatMessage::assistant(content));
    }

    pub fn push_tool_result(&mut self, output: &str) {
        self.turns
            .push(ChatMessage::tool_result(format!("{TOOL_RESULT_PREFIX}{output}")));
    }

    pub fn turns(&self) -> &[ChatMessage] {
        &self.turns
    }

    /// The last `max` turns, or the whole transcript when `max` is 0.
    pub fn recent(&self, max: usize) -> &[ChatMessage] {
        if max == 0 || self.turns.len() <= max {
            &self.turns
        } else {
            &self.turns[self.turns.len() - max..]
        }
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Role;

    #[test]
    fn tool_results_carry_prefix() {
        let mut session = Session::new();
        session.push_tool_result("In Paris, France, it's currently clear sky.");
        assert_eq!(session.turns()[0].role, Role::ToolResult);
        assert_eq!(
            session.turns()[0].content,
            "Tool result: In Paris, France, it's currently clear sky."
        );
    }

    #[test]
    fn recent_window() {
        let mut session = Session::new();
        for i in 0..5 {
            session.push_user(format!("u{i}"));
        }
        assert_eq!(session.recent(0).len(), 5);
        assert_eq!(session.recent(10).len(), 5);
        let window = session.recent(2);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].content, "u3");
        assert_eq!(window[1].content, "u4");
    }
}
