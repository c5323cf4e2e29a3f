use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// A message in an LLM conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: String,
    pub content: String,
}

/// Request to an LLM.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system_prompt: String,
    pub messages: Vec<LlmMessage>,
    pub max_tokens: u32,
    /// JSON schema the response must satisfy, for providers that can enforce one.
    pub response_schema: Option<serde_json::Value>,
}

/// Response from an LLM.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
}

/// Facade trait for LLM providers.
///
/// One chat-completion style call covers every provider: a system
/// instruction plus user messages in, a single text completion out.
pub trait LlmClient: Send + Sync {
    fn chat<'a>(
        &'a self,
        request: &'a LlmRequest,
    ) -> Pin<Box<dyn Future<Output = Result<LlmResponse, LlmError>> + Send + 'a>>;
}

fn build_http(timeout: Duration) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::Http(format!("failed to build HTTP client: {e}")))
}

fn map_send_error(e: reqwest::Error, timeout: Duration) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout(timeout.as_secs())
    } else {
        LlmError::Http(e.to_string())
    }
}

async fn read_json(
    resp: reqwest::Response,
    timeout: Duration,
) -> Result<serde_json::Value, LlmError> {
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(LlmError::Api { status, body });
    }

    resp.json()
        .await
        .map_err(|e| match map_send_error(e, timeout) {
            LlmError::Http(msg) => LlmError::Parse(format!("failed to parse response: {msg}")),
            other => other,
        })
}

/// OpenAI `/chat/completions` client. Also used for the managed proxy, which
/// speaks the same protocol.
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl OpenAiCompatibleClient {
    pub fn new(
        base_url: String,
        model: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            http: build_http(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            timeout,
        })
    }

    pub fn build_body(&self, request: &LlmRequest) -> serde_json::Value {
        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": request.system_prompt,
        })];

        for msg in &request.messages {
            messages.push(serde_json::json!({
                "role": msg.role,
                "content": msg.content,
            }));
        }

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": request.max_tokens,
        });

        if let Some(schema) = &request.response_schema {
            body["response_format"] = serde_json::json!({
                "type": "json_schema",
                "json_schema": {
                    "name": "tool_decision",
                    "strict": true,
                    "schema": schema,
                },
            });
        }

        body
    }
}

impl LlmClient for OpenAiCompatibleClient {
    fn chat<'a>(
        &'a self,
        request: &'a LlmRequest,
    ) -> Pin<Box<dyn Future<Output = Result<LlmResponse, LlmError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!("{}/chat/completions", self.base_url);
            let mut req = self.http.post(&url).json(&self.build_body(request));

            if let Some(key) = &self.api_key {
                req = req.bearer_auth(key);
            }

            let resp = req
                .send()
                .await
                .map_err(|e| map_send_error(e, self.timeout))?;
            let json = read_json(resp, self.timeout).await?;

            let content = json["choices"][0]["message"]["content"]
                .as_str()
                .ok_or_else(|| LlmError::Parse(format!("no content in response: {json}")))?
                .to_string();

            Ok(LlmResponse { content })
        })
    }
}

/// Anthropic `/messages` client. Has no native response schema, so callers
/// embed the schema in the prompt instead.
pub struct AnthropicClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl AnthropicClient {
    pub fn new(
        base_url: String,
        model: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            http: build_http(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            timeout,
        })
    }

    pub fn build_body(&self, request: &LlmRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|msg| {
                serde_json::json!({
                    "role": msg.role,
                    "content": msg.content,
                })
            })
            .collect();

        serde_json::json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "system": request.system_prompt,
            "messages": messages,
        })
    }
}

impl LlmClient for AnthropicClient {
    fn chat<'a>(
        &'a self,
        request: &'a LlmRequest,
    ) -> Pin<Box<dyn Future<Output = Result<LlmResponse, LlmError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!("{}/messages", self.base_url);
            let resp = self
                .http
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&self.build_body(request))
                .send()
                .await
                .map_err(|e| map_send_error(e, self.timeout))?;
            let json = read_json(resp, self.timeout).await?;

            let content = json["content"]
                .as_array()
                .and_then(|blocks| {
                    blocks
                        .iter()
                        .find(|b| b["type"] == "text")
                        .and_then(|b| b["text"].as_str())
                })
                .ok_or_else(|| LlmError::Parse(format!("no text block in response: {json}")))?
                .to_string();

            Ok(LlmResponse { content })
        })
    }
}

/// Stub LLM client that returns deterministic responses for testing.
pub struct StubLlmClient {
    responses: Vec<String>,
    call_count: std::sync::atomic::AtomicUsize,
}

impl StubLlmClient {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            call_count: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Create a stub that always returns the given response.
    pub fn constant(response: &str) -> Self {
        Self::new(vec![response.to_string()])
    }

    pub fn calls(&self) -> usize {
        self.call_count.load(std::sync::atomic::Ordering::Relaxed)
    }
}

impl LlmClient for StubLlmClient {
    fn chat<'a>(
        &'a self,
        _request: &'a LlmRequest,
    ) -> Pin<Box<dyn Future<Output = Result<LlmResponse, LlmError>> + Send + 'a>> {
        Box::pin(async move {
            let idx = self
                .call_count
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            let response = if self.responses.is_empty() {
                "stub response".to_string()
            } else {
                self.responses[idx % self.responses.len()].clone()
            };
            Ok(LlmResponse { content: response })
        })
    }
}
