use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// 一次经代理转发的对话请求
///
/// `api_url` 是最终的上游地址，由代理负责转发；`options` 会合并进请求体，
/// 同名字段覆盖默认字段。
#[derive(Clone, Debug)]
pub struct ChatRequest {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub options: Map<String, Value>,
    pub timeout: Duration,
}

impl ChatRequest {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        messages: Vec<ChatMessage>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            messages,
            options: Map::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 代理请求体：`{apiUrl, apiKey, model, messages, ...options}`
    pub fn proxy_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("apiUrl".to_string(), Value::String(self.api_url.clone()));
        body.insert("apiKey".to_string(), Value::String(self.api_key.clone()));
        body.insert("model".to_string(), Value::String(self.model.clone()));
        body.insert(
            "messages".to_string(),
            serde_json::to_value(&self.messages).unwrap_or_else(|_| Value::Array(Vec::new())),
        );
        for (k, v) in &self.options {
            body.insert(k.clone(), v.clone());
        }
        Value::Object(body)
    }
}

#[derive(Clone, Debug)]
pub struct ChatResponse {
    pub text: String,
    pub raw: Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: String,
}

#[derive(thiserror::Error, Debug)]
pub enum LlmError {
    #[error("missing env {0}")]
    MissingEnv(&'static str),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("gateway timeout: upstream API did not respond in time (504)")]
    GatewayTimeout,
    #[error("API request failed ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("connection test failed: HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// 超时直接失败，其余错误都可重试
    pub fn is_retryable(&self) -> bool {
        !matches!(self, LlmError::Timeout(_))
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, LlmError>;
}
