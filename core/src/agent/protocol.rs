//! Detection of tool requests in assistant replies.
//!
//! A reply is a tool request only when the whole text (ignoring surrounding
//! whitespace) is a JSON object of the form
//! `{"tool": "<name>", "args": {...}}`. Anything else, including a valid
//! request wrapped in prose or code fences, is ordinary conversation.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct ToolRequest {
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ToolRequest {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Whether `key` carries a usable value of the JSON schema type
    /// `expected` (any non-null value when the schema names no type).
    /// Strings must not be blank.
    pub fn has_arg(&self, key: &str, expected: Option<&str>) -> bool {
        let Some(value) = self.arguments.get(key) else {
            return false;
        };
        if let Value::String(s) = value
            && s.trim().is_empty()
        {
            return false;
        }
        match expected {
            Some("string") => value.is_string(),
            Some("number") => value.is_number(),
            Some("integer") => value.is_i64() || value.is_u64(),
            Some("boolean") => value.is_boolean(),
            Some("object") => value.is_object(),
            Some("array") => value.is_array(),
            _ => !value.is_null(),
        }
    }

    pub fn arguments_value(&self) -> Value {
        Value::Object(self.arguments.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssistantReply {
    Decoded(ToolRequest),
    PlainText(String),
}

#[derive(Deserialize)]
struct WireRequest {
    tool: String,
    args: Map<String, Value>,
}

pub fn decode_reply(text: &str) -> AssistantReply {
    match serde_json::from_str::<WireRequest>(text.trim()) {
        Ok(wire) => AssistantReply::Decoded(ToolRequest::new(wire.tool, wire.args)),
        Err(e) => {
            debug!(error = %e, "reply is not a tool request");
            AssistantReply::PlainText(text.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded(text: &str) -> ToolRequest {
        match decode_reply(text) {
            AssistantReply::Decoded(req) => req,
            AssistantReply::PlainText(t) => panic!("expected tool request, got text: {t}"),
        }
    }

    #[test]
    fn exact_request_decodes() {
        let req = decoded(r#"{"tool": "get_weather", "args": {"city": "Paris"}}"#);
        assert_eq!(req.name, "get_weather");
        assert_eq!(req.arguments.get("city"), Some(&Value::from("Paris")));
        assert!(req.has_arg("city", Some("string")));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let req = decoded("\n  {\"tool\": \"get_weather\", \"args\": {\"city\": \"Oslo\"}}  \n");
        assert_eq!(req.arguments.get("city"), Some(&Value::from("Oslo")));
    }

    #[test]
    fn greeting_is_plain_text() {
        assert_eq!(
            decode_reply("Hey there! What's up?"),
            AssistantReply::PlainText("Hey there! What's up?".into())
        );
    }

    #[test]
    fn decorated_json_is_plain_text() {
        let text = r#"Sure! {"tool": "get_weather", "args": {"city": "Paris"}}"#;
        assert_eq!(decode_reply(text), AssistantReply::PlainText(text.into()));

        let fenced = "```json\n{\"tool\": \"get_weather\", \"args\": {\"city\": \"Paris\"}}\n```";
        assert_eq!(decode_reply(fenced), AssistantReply::PlainText(fenced.into()));
    }

    #[test]
    fn wrong_shapes_are_plain_text() {
        for text in [
            "42",
            "\"get_weather\"",
            "[1, 2]",
            r#"{"tool": "get_weather"}"#,
            r#"{"tool": "get_weather", "args": "Paris"}"#,
            r#"{"name": "get_weather", "arguments": {"city": "Paris"}}"#,
            r#"{"tool": "get_weather", "args": {"city": "Paris"}"#,
        ] {
            assert_eq!(
                decode_reply(text),
                AssistantReply::PlainText(text.into()),
                "{text}"
            );
        }
    }

    #[test]
    fn missing_or_blank_city() {
        for text in [
            r#"{"tool": "get_weather", "args": {}}"#,
            r#"{"tool": "get_weather", "args": {"city": "  "}}"#,
            r#"{"tool": "get_weather", "args": {"city": null}}"#,
        ] {
            let req = decoded(text);
            assert!(!req.has_arg("city", Some("string")), "{text}");
            assert!(!req.has_arg("city", None), "{text}");
        }
    }

    #[test]
    fn argument_types_follow_schema() {
        let req = decoded(r#"{"tool": "get_weather", "args": {"city": 42, "flag": true}}"#);
        assert!(!req.has_arg("city", Some("string")));
        assert!(req.has_arg("city", Some("integer")));
        assert!(req.has_arg("city", Some("number")));
        assert!(req.has_arg("city", None));
        assert!(!req.has_arg("flag", Some("string")));
        assert!(req.has_arg("flag", Some("boolean")));
    }
}
