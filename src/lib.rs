//! 转发对话请求到 OpenAI 兼容代理或 Gemini 的轻量客户端

pub mod ai;
pub mod config;

pub use ai::{
    gemini_base, is_gemini_host, normalize_endpoint, ApiClient, ChatMessage, ChatRequest,
    ChatResponse, LlmError, LlmProvider, RetryPolicy,
};
pub use config::ClientConfig;
