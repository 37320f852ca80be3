use crate::traits::{ChatMessage, ChatRequest, ChatResponse, Provider, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    options: OllamaOptions,
    stream: bool,
}

#[derive(Debug, Serialize, PartialEq)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    content: Option<String>,
}

pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f64,
}

impl OllamaProvider {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2:1b".to_string(),
            temperature: 0.2,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let url = base_url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Ollama has no tool-result role for prompted tools, so tool output
    /// travels as a user message; its "Tool result:" prefix marks it.
    fn convert_messages<'a>(
        system_prompt: &'a str,
        messages: &'a [ChatMessage],
    ) -> Vec<OllamaMessage<'a>> {
        let mut result = Vec::with_capacity(messages.len() + 1);

        if !system_prompt.is_empty() {
            result.push(OllamaMessage {
                role: "system",
                content: system_prompt,
            });
        }

        for m in messages {
            let role = match m.role {
                Role::User | Role::ToolResult => "user",
                Role::Assistant => "assistant",
            };
            result.push(OllamaMessage {
                role,
                content: &m.content,
            });
        }

        result
    }

    /// Only `content` is the reply; reasoning traces are never surfaced.
    fn into_chat_response(response: OllamaResponse) -> ChatResponse {
        ChatResponse {
            text: response.message.content,
        }
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<ChatResponse> {
        let ollama_request = OllamaRequest {
            model: &self.model,
            messages: Self::convert_messages(request.system_prompt, request.messages),
            options: OllamaOptions {
                temperature: self.temperature,
            },
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&ollama_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Ollama API error ({}): {}",
                status,
                error_text
            ));
        }

        let ollama_response: OllamaResponse = response.json().await?;
        Ok(Self::into_chat_response(ollama_response))
    }
}
