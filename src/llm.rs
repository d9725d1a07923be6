//! Chat-completion types and the OpenAI-compatible HTTP client.
//!
//! The pipeline talks to the language model through the [`ChatProvider`]
//! trait. Production code uses [`OpenAiChat`], a thin reqwest client for the
//! `/chat/completions` endpoint; tests inject scripted implementations via
//! [`crate::config::ReportConfig::chat`].
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 5xx errors from LLM APIs are transient and frequent.
//! Exponential backoff (`retry_backoff_ms * 2^attempt`) avoids hammering a
//! recovering endpoint: with 500 ms base and 3 retries the wait sequence is
//! 500 ms → 1 s → 2 s. Authentication failures (401/403) are returned
//! immediately — retrying a bad key never helps.

use crate::error::ReportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

/// Default endpoint for [`OpenAiChat`]. Override with
/// [`OpenAiChat::with_base_url`] for proxies or test servers.
pub const DEFAULT_CHAT_BASE_URL: &str = "https://api.openai.com/v1";

// ── Message types ────────────────────────────────────────────────────────

/// One turn in a chat conversation, in OpenAI wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// An assistant turn that requested tool invocations. Echoed back into
    /// the conversation so the model can see its own requests.
    pub fn assistant_tool_request(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: "assistant".into(),
            content,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    /// The observation produced by executing one tool call.
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".into(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionCall,
}

/// The function name and JSON-encoded arguments inside a [`ToolCall`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object, exactly as the model produced it.
    /// May be malformed; callers must parse defensively.
    pub arguments: String,
}

/// A tool the model is allowed to call.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionSpec,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema for the argument object.
    pub parameters: serde_json::Value,
}

/// Sampling options forwarded with every completion request.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: usize,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 4096,
        }
    }
}

/// The model's reply to one completion request.
#[derive(Debug, Clone, Default)]
pub struct AssistantTurn {
    /// Free-form answer text. Empty when the turn is purely tool calls.
    pub content: String,
    /// Tool invocations the model requested this turn, in order.
    pub tool_calls: Vec<ToolCall>,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

impl AssistantTurn {
    /// True when the model produced a final answer instead of tool calls.
    pub fn is_final(&self) -> bool {
        self.tool_calls.is_empty()
    }
}

// ── Provider trait ───────────────────────────────────────────────────────

/// Abstraction over a chat-completion backend.
///
/// `tools: None` forbids tool use for that request — the model must answer
/// in text. This is how the agent loop forces a final answer once the
/// search budget is spent.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolSpec]>,
        options: &CompletionOptions,
    ) -> Result<AssistantTurn, ReportError>;
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolSpec]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'a str>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

// ── HTTP client ──────────────────────────────────────────────────────────

/// reqwest-backed [`ChatProvider`] for OpenAI-compatible endpoints.
pub struct OpenAiChat {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl OpenAiChat {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
        max_retries: u32,
        retry_backoff_ms: u64,
    ) -> Result<Self, ReportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ReportError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: DEFAULT_CHAT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            max_retries,
            retry_backoff_ms,
        })
    }

    /// Point the client at a different OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn send_once(
        &self,
        request: &ChatRequest<'_>,
        start: Instant,
    ) -> Result<AssistantTurn, ReportError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReportError::ApiTimeout {
                        elapsed_ms: start.elapsed().as_millis() as u64,
                    }
                } else {
                    ReportError::LlmApi {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let detail = response.text().await.unwrap_or_default();
            return Err(ReportError::AuthFailed { detail });
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(ReportError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::LlmApi {
                message: format!("HTTP {status}: {body}"),
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| ReportError::LlmApi {
            message: format!("malformed response body: {e}"),
        })?;

        let usage = parsed.usage.unwrap_or_default();
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ReportError::LlmApi {
                message: "response contained no choices".into(),
            })?;

        Ok(AssistantTurn {
            content: choice.message.content.unwrap_or_default(),
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        })
    }
}

/// Auth errors are permanent; everything else is worth another attempt.
fn is_retryable(err: &ReportError) -> bool {
    !matches!(err, ReportError::AuthFailed { .. })
}

#[async_trait]
impl ChatProvider for OpenAiChat {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolSpec]>,
        options: &CompletionOptions,
    ) -> Result<AssistantTurn, ReportError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            tools,
            tool_choice: tools.map(|_| "auto"),
        };

        let start = Instant::now();
        let mut last_err: Option<ReportError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "LLM request: retry {}/{} after {}ms",
                    attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match self.send_once(&request, start).await {
                Ok(turn) => {
                    debug!(
                        "LLM request: {} input tokens, {} output tokens, {:?}",
                        turn.prompt_tokens,
                        turn.completion_tokens,
                        start.elapsed()
                    );
                    return Ok(turn);
                }
                Err(e) if is_retryable(&e) => {
                    warn!("LLM request: attempt {} failed — {}", attempt + 1, e);
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| ReportError::LlmApi {
            message: "unknown error".into(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serialises_tools_and_tool_choice() {
        let messages = vec![ChatMessage::user("hi")];
        let tools = vec![ToolSpec {
            kind: "function".into(),
            function: FunctionSpec {
                name: "web_search".into(),
                description: "search the web".into(),
                parameters: serde_json::json!({"type": "object"}),
            },
        }];
        let request = ChatRequest {
            model: "gpt-4o",
            messages: &messages,
            temperature: 0.3,
            max_tokens: 4096,
            tools: Some(&tools),
            tool_choice: Some("auto"),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["tools"][0]["function"]["name"], "web_search");
        assert_eq!(json["tool_choice"], "auto");
        assert_eq!(json["model"], "gpt-4o");
    }

    #[test]
    fn request_without_tools_omits_fields() {
        let messages = vec![ChatMessage::user("hi")];
        let request = ChatRequest {
            model: "gpt-4o",
            messages: &messages,
            temperature: 0.3,
            max_tokens: 4096,
            tools: None,
            tool_choice: None,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("\"tools\""));
        assert!(!json.contains("\"tool_choice\""));
    }

    #[test]
    fn message_serialisation_skips_absent_fields() {
        let json = serde_json::to_string(&ChatMessage::user("hello")).unwrap();
        assert!(!json.contains("tool_calls"));
        assert!(!json.contains("tool_call_id"));

        let json = serde_json::to_string(&ChatMessage::tool("call_1", "result")).unwrap();
        assert!(json.contains("\"tool_call_id\":\"call_1\""));
    }

    #[test]
    fn response_with_tool_calls_parses() {
        let body = r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "web_search", "arguments": "{\"query\": \"perovskite market\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 120, "completion_tokens": 18}
        }"#;

        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        let choice = &parsed.choices[0];
        let calls = choice.message.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "web_search");
        assert!(calls[0].function.arguments.contains("perovskite"));
        assert_eq!(parsed.usage.unwrap().prompt_tokens, 120);
    }

    #[test]
    fn response_without_usage_parses() {
        let body = r#"{"choices": [{"message": {"content": "done"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.usage.is_none());
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("done")
        );
    }

    #[test]
    fn auth_errors_are_not_retryable() {
        assert!(!is_retryable(&ReportError::AuthFailed {
            detail: "bad key".into()
        }));
        assert!(is_retryable(&ReportError::RateLimited {
            retry_after_secs: None
        }));
        assert!(is_retryable(&ReportError::ApiTimeout { elapsed_ms: 1000 }));
    }

    #[test]
    fn final_turn_detection() {
        let turn = AssistantTurn {
            content: "answer".into(),
            ..Default::default()
        };
        assert!(turn.is_final());

        let turn = AssistantTurn {
            tool_calls: vec![ToolCall {
                id: "1".into(),
                kind: "function".into(),
                function: FunctionCall {
                    name: "web_search".into(),
                    arguments: "{}".into(),
                },
            }],
            ..Default::default()
        };
        assert!(!turn.is_final());
    }
}
