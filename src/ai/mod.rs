pub mod client;
pub mod endpoint;
pub mod response;
pub mod retry;
pub mod types;

pub use client::{ApiClient, PROXY_PATH};
pub use endpoint::{gemini_base, is_gemini_host, normalize_endpoint};
pub use retry::RetryPolicy;
pub use types::{ChatMessage, ChatRequest, ChatResponse, LlmError, LlmProvider, ModelEntry};

pub(crate) fn build_llm_http_client(proxy: Option<&str>) -> Result<reqwest::Client, LlmError> {
    let mut builder = reqwest::Client::builder();

    if let Some(raw) = proxy {
        let t = raw.trim();
        if !t.is_empty() {
            let url = if t.contains("://") {
                t.to_string()
            } else {
                format!("socks5h://{}", t)
            };
            let proxy = reqwest::Proxy::all(&url).map_err(|e| LlmError::Http(e.to_string()))?;
            builder = builder.proxy(proxy);
        }
    }

    builder.build().map_err(|e| LlmError::Http(e.to_string()))
}
