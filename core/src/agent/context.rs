use crate::traits::ToolSpec;
use std::fmt::Write;
use std::path::{Path, PathBuf};

const BOOTSTRAP_MAX_CHARS: usize = 20_000;

pub const PERSONA_FILE: &str = "PERSONA.md";

pub const DEFAULT_PERSONA: &str = "You are a friendly, casual assistant. Respond like a human in normal conversation: be helpful, chatty, and natural. For weather questions, suggest the tool in JSON ONLY if needed. Do NOT add extra text to JSON suggestions.

ONLY suggest a tool for questions it can answer. For everything else (like greetings), chat normally.";

pub struct ContextBuilder {
    pub workspace: Option<PathBuf>,
    pub tool_specs: Vec<ToolSpec>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self {
            workspace: None,
            tool_specs: vec![],
        }
    }

    pub fn with_workspace(mut self, workspace: impl AsRef<Path>) -> Self {
        self.workspace = Some(workspace.as_ref().to_path_buf());
        self
    }

    pub fn with_tool_specs(mut self, tool_specs: Vec<ToolSpec>) -> Self {
        self.tool_specs = tool_specs;
        self
    }

    pub fn build_system_prompt(&self) -> String {
        let mut parts = vec![self.load_persona().unwrap_or_else(|| DEFAULT_PERSONA.to_string())];

        if let Some(instructions) = self.get_tool_instructions() {
            parts.push(instructions);
        }

        parts.push(self.get_runtime_context());

        parts.join("\n\n")
    }

    fn get_tool_instructions(&self) -> Option<String> {
        if self.tool_specs.is_empty() {
            return None;
        }

        let mut instructions = String::new();
        instructions.push_str("To suggest a tool: Output PURE JSON like: {\"tool\": \"tool_name\", \"args\": {\"param\": \"value\"}}.\n");
        instructions.push_str("The whole reply must be that JSON object and nothing else.\n\n");
        instructions.push_str("Available tools:\n");

        for tool in &self.tool_specs {
            let _ = writeln!(
                instructions,
                "- {}: {} Parameters: {}",
                tool.name, tool.description, tool.parameters_schema
            );
        }

        if self.tool_specs.iter().any(|t| t.name == "get_weather") {
            instructions.push_str(
                "
Examples:
User: hi
Response: Hey there! What's up?

User: What's the weather in Paris?
Response: {\"tool\": \"get_weather\", \"args\": {\"city\": \"Paris\"}}
",
            );
        }

        instructions.push_str(
            "
When you get a tool result (like \"Tool result: In Paris, France, it's currently clear sky with a temperature of 15.0°C.\"), summarize it casually WITHOUT inventing details. Use ONLY the provided info.
Example response: Sure, let me check... Oh, in Paris, it's clear skies at 15°C right now. Anything else?",
        );

        Some(instructions)
    }

    fn get_runtime_context(&self) -> String {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M (%A)");
        format!("Current time: {}", timestamp)
    }

    fn load_persona(&self) -> Option<String> {
        let path = self.workspace.as_ref()?.join(PERSONA_FILE);
        let content = std::fs::read_to_string(path).ok()?;
        let trimmed = content.trim();

        if trimmed.is_empty() {
            return None;
        }

        if trimmed.chars().count() > BOOTSTRAP_MAX_CHARS {
            let truncated: String = trimmed.chars().take(BOOTSTRAP_MAX_CHARS).collect();
            Some(format!(
                "{}\n\n[... truncated at {} chars]",
                truncated, BOOTSTRAP_MAX_CHARS
            ))
        } else {
            Some(trimmed.to_string())
        }
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn weather_spec() -> ToolSpec {
        ToolSpec {
            name: "get_weather".into(),
            description: "Get the current weather for a city.".into(),
            parameters_schema: json!({"type": "object", "required": ["city"]}),
        }
    }

    #[test]
    fn default_persona_without_workspace() {
        let prompt = ContextBuilder::new().build_system_prompt();
        assert!(prompt.starts_with(DEFAULT_PERSONA));
        assert!(!prompt.contains("PURE JSON"));
    }

    #[test]
    fn tool_protocol_lists_tools() {
        let prompt = ContextBuilder::new()
            .with_tool_specs(vec![weather_spec()])
            .build_system_prompt();
        assert!(prompt.contains("PURE JSON"));
        assert!(prompt.contains("- get_weather: Get the current weather for a city."));
        assert!(prompt.contains(r#"{"tool": "get_weather", "args": {"city": "Paris"}}"#));
        assert!(prompt.contains("Tool result: "));
    }

    #[test]
    fn persona_file_overrides_default() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(PERSONA_FILE), "  You are a grumpy sailor.\n").unwrap();

        let prompt = ContextBuilder::new()
            .with_workspace(tmp.path())
            .build_system_prompt();
        assert!(prompt.starts_with("You are a grumpy sailor."));
        assert!(!prompt.contains(DEFAULT_PERSONA));
    }

    #[test]
    fn blank_persona_file_is_ignored() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(PERSONA_FILE), "\n\n").unwrap();

        let prompt = ContextBuilder::new()
            .with_workspace(tmp.path())
            .build_system_prompt();
        assert!(prompt.starts_with(DEFAULT_PERSONA));
    }

    #[test]
    fn oversized_persona_is_truncated() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(PERSONA_FILE), "x".repeat(BOOTSTRAP_MAX_CHARS + 10)).unwrap();

        let prompt = ContextBuilder::new()
            .with_workspace(tmp.path())
            .build_system_prompt();
        assert!(prompt.contains("[... truncated at 20000 chars]"));
    }
}
