use crate::agent::protocol::{AssistantReply, ToolRequest, decode_reply};
use crate::agent::{ContextBuilder, Session, ToolRegistry};
use crate::traits::{ChatRequest, Provider};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_MAX_ITERATIONS: usize = 3;
const DEFAULT_MAX_HISTORY: usize = 0;

enum LoopState {
    AwaitingModel,
    ToolDetected { request: ToolRequest, reply: String },
    Done(String),
}

/// Alternates between the model and the tools it asks for, for at most
/// `max_iterations` model calls per user turn. A tool requested on the last
/// iteration still runs; its result stays in the session for the next turn.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    context_builder: ContextBuilder,
    tool_registry: Arc<ToolRegistry>,
    max_iterations: usize,
    max_history: usize,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        context_builder: ContextBuilder,
        tool_registry: Arc<ToolRegistry>,
    ) -> Self {
        let context_builder = context_builder.with_tool_specs(tool_registry.get_specs());
        Self {
            provider,
            context_builder,
            tool_registry,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_history: DEFAULT_MAX_HISTORY,
        }
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    /// Caps how many trailing transcript turns are sent to the model.
    /// 0 sends the whole transcript.
    pub fn with_max_history(mut self, max: usize) -> Self {
        self.max_history = max;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Runs one user turn against `session` and returns the final
    /// assistant text.
    pub async fn process(&self, session: &mut Session, message: &str) -> Result<String> {
        session.push_user(message);

        let system_prompt = self.context_builder.build_system_prompt();
        let mut iterations = 0;
        let mut state = LoopState::AwaitingModel;

        loop {
            state = match state {
                LoopState::AwaitingModel => {
                    iterations += 1;
                    let reply = self.ask_model(&system_prompt, session).await?;
                    debug!(iteration = iterations, reply = %reply, "raw model output");
                    session.push_assistant(reply.clone());

                    match self.detect_tool_request(&reply) {
                        Some(request) => LoopState::ToolDetected { request, reply },
                        None => LoopState::Done(reply),
                    }
                }
                LoopState::ToolDetected { request, reply } => {
                    let result = self
                        .tool_registry
                        .execute(&request.name, request.arguments_value())
                        .await;
                    let output = result.as_text();
                    debug!(tool = %request.name, output, "tool result");
                    session.push_tool_result(output);

                    if iterations >= self.max_iterations {
                        debug!(
                            max_iterations = self.max_iterations,
                            "iteration cap reached"
                        );
                        LoopState::Done(reply)
                    } else {
                        LoopState::AwaitingModel
                    }
                }
                LoopState::Done(output) => return Ok(output),
            };
        }
    }

    async fn ask_model(&self, system_prompt: &str, session: &Session) -> Result<String> {
        let request = ChatRequest {
            system_prompt,
            messages: session.recent(self.max_history),
        };

        let response = self
            .provider
            .chat(request)
            .await
            .with_context(|| format!("{} provider request failed", self.provider.name()))?;

        Ok(response.text.unwrap_or_default())
    }

    fn detect_tool_request(&self, reply: &str) -> Option<ToolRequest> {
        match decode_reply(reply) {
            AssistantReply::Decoded(request) => {
                self.tool_registry.resolve(&request)?;
                Some(request)
            }
            AssistantReply::PlainText(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{ChatMessage, ChatResponse, Role, Tool, ToolResult};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const PARIS_REQUEST: &str = r#"{"tool": "get_weather", "args": {"city": "Paris"}}"#;

    /// Replays canned replies and records every request it sees.
    struct ScriptedProvider {
        replies: Mutex<VecDeque<anyhow::Result<String>>>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedProvider {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
                seen: Mutex::new(vec![]),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(VecDeque::from([Err(anyhow::anyhow!("connection refused"))])),
                seen: Mutex::new(vec![]),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }

        fn request(&self, n: usize) -> Vec<ChatMessage> {
            self.seen.lock().unwrap()[n].clone()
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<ChatResponse> {
            assert!(!request.system_prompt.is_empty());
            self.seen.lock().unwrap().push(request.messages.to_vec());
            let next = self.replies.lock().unwrap().pop_front();
            match next {
                Some(reply) => reply.map(ChatResponse::text),
                None => Ok(ChatResponse::text(PARIS_REQUEST)),
            }
        }
    }

    /// Stand-in for the weather tool that records the cities it was asked for.
    struct RecordingWeather {
        cities: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Tool for Arc<RecordingWeather> {
        fn name(&self) -> &str {
            "get_weather"
        }

        fn description(&self) -> &str {
            "Get the current weather for a city."
        }

        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": { "city": { "type": "string" } },
                "required": ["city"]
            })
        }

        async fn execute(&self, args: Value) -> anyhow::Result<ToolResult> {
            let city = crate::tools::extract_string_arg(&args, "city")?;
            self.cities.lock().unwrap().push(city.clone());
            Ok(ToolResult::success(format!(
                "In {city}, France, it's currently clear sky with a temperature of 15.0°C."
            )))
        }
    }

    fn setup(provider: Arc<ScriptedProvider>) -> (AgentLoop, Arc<RecordingWeather>) {
        let weather = Arc::new(RecordingWeather {
            cities: Mutex::new(vec![]),
        });
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(weather.clone()));
        let agent = AgentLoop::new(provider, ContextBuilder::new(), Arc::new(registry));
        (agent, weather)
    }

    fn cities(weather: &RecordingWeather) -> Vec<String> {
        weather.cities.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn greeting_ends_after_one_call() {
        let provider = ScriptedProvider::new(&["Hey there! What's up?"]);
        let (agent, weather) = setup(provider.clone());
        let mut session = Session::new();

        let output = agent.process(&mut session, "hi").await.unwrap();

        assert_eq!(output, "Hey there! What's up?");
        assert_eq!(provider.calls(), 1);
        assert!(cities(&weather).is_empty());
        assert_eq!(session.len(), 2);
    }

    #[tokio::test]
    async fn weather_request_runs_tool_then_summarizes() {
        let provider = ScriptedProvider::new(&[PARIS_REQUEST, "Oh, in Paris it's clear at 15°C."]);
        let (agent, weather) = setup(provider.clone());
        let mut session = Session::new();

        let output = agent
            .process(&mut session, "What's the weather in Paris?")
            .await
            .unwrap();

        assert_eq!(output, "Oh, in Paris it's clear at 15°C.");
        assert_eq!(cities(&weather), vec!["Paris".to_string()]);
        assert_eq!(provider.calls(), 2);

        let roles: Vec<Role> = session.turns().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::ToolResult, Role::Assistant]
        );

        let second = provider.request(1);
        assert_eq!(second.len(), 3);
        assert!(second[2].content.starts_with("Tool result: In Paris, France"));
    }

    #[tokio::test]
    async fn iteration_cap_bounds_model_calls() {
        // With no script left the provider keeps asking for the tool.
        let provider = ScriptedProvider::new(&[]);
        let (agent, weather) = setup(provider.clone());
        let mut session = Session::new();

        let output = agent
            .process(&mut session, "weather, forever")
            .await
            .unwrap();

        assert_eq!(provider.calls(), DEFAULT_MAX_ITERATIONS);
        assert_eq!(cities(&weather).len(), DEFAULT_MAX_ITERATIONS);
        assert_eq!(output, PARIS_REQUEST);
        // user + (assistant, tool result) per iteration
        assert_eq!(session.len(), 1 + 2 * DEFAULT_MAX_ITERATIONS);
    }

    #[tokio::test]
    async fn single_iteration_runs_tool_once() {
        let provider = ScriptedProvider::new(&[PARIS_REQUEST]);
        let (agent, weather) = setup(provider.clone());
        let agent = agent.with_max_iterations(1);
        let mut session = Session::new();

        let output = agent.process(&mut session, "weather in Paris").await.unwrap();

        assert_eq!(output, PARIS_REQUEST);
        assert_eq!(provider.calls(), 1);
        assert_eq!(cities(&weather), vec!["Paris".to_string()]);
        assert_eq!(session.turns()[2].role, Role::ToolResult);
        assert_eq!(session.len(), 3);
    }

    #[tokio::test]
    async fn non_requests_pass_through_unmodified() {
        for reply in [
            "Sure! {\"tool\": \"get_weather\", \"args\": {\"city\": \"Paris\"}}",
            "{\"tool\": \"get_weather\", \"args\": {}}",
            "{\"tool\": \"get_weather\", \"args\": {\"city\": \"\"}}",
            "{\"tool\": \"get_weather\", \"args\": {\"city\": 42}}",
            "{\"tool\": \"get_weather\", \"args\": {\"city\": true}}",
            "{\"tool\": \"get_stock_price\", \"args\": {\"city\": \"Paris\"}}",
            "{not json at all",
        ] {
            let provider = ScriptedProvider::new(&[reply]);
            let (agent, weather) = setup(provider.clone());
            let mut session = Session::new();

            let output = agent.process(&mut session, "hello").await.unwrap();

            assert_eq!(output, reply);
            assert_eq!(provider.calls(), 1, "{reply}");
            assert!(cities(&weather).is_empty(), "{reply}");
            assert_eq!(session.len(), 2);
        }
    }

    #[tokio::test]
    async fn provider_errors_propagate() {
        let provider = ScriptedProvider::failing();
        let (agent, _) = setup(provider);
        let mut session = Session::new();

        let err = agent.process(&mut session, "hi").await.unwrap_err();

        assert!(format!("{err:#}").contains("connection refused"));
        assert_eq!(session.len(), 1);
    }

    #[tokio::test]
    async fn session_carries_across_turns() {
        let provider = ScriptedProvider::new(&["Hello!", "You said hi earlier."]);
        let (agent, _) = setup(provider.clone());
        let mut session = Session::new();

        agent.process(&mut session, "hi").await.unwrap();
        agent.process(&mut session, "what did I say?").await.unwrap();

        let second = provider.request(1);
        let contents: Vec<&str> = second.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hi", "Hello!", "what did I say?"]);
    }

    #[tokio::test]
    async fn default_sends_whole_transcript() {
        let replies: Vec<String> = (0..60).map(|i| format!("reply {i}")).collect();
        let replies: Vec<&str> = replies.iter().map(String::as_str).collect();
        let provider = ScriptedProvider::new(&replies);
        let (agent, _) = setup(provider.clone());
        let mut session = Session::new();

        for i in 0..60 {
            agent.process(&mut session, &format!("message {i}")).await.unwrap();
        }

        assert_eq!(session.len(), 120);
        let last = provider.request(59);
        assert_eq!(last.len(), 119);
        assert_eq!(last[0].content, "message 0");
    }

    #[tokio::test]
    async fn history_window_limits_sent_turns() {
        let provider = ScriptedProvider::new(&["one", "two"]);
        let (agent, _) = setup(provider.clone());
        let agent = agent.with_max_history(1);
        let mut session = Session::new();

        agent.process(&mut session, "first").await.unwrap();
        agent.process(&mut session, "second").await.unwrap();

        let sent = provider.request(1);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].content, "second");
        assert_eq!(session.len(), 4);
    }
}
