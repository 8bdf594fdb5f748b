use crate::ai::build_llm_http_client;
use crate::ai::endpoint::{gemini_models_url, is_gemini_host, models_url};
use crate::ai::response::{error_message, extract_text, normalize_model_list};
use crate::ai::retry::RetryPolicy;
use crate::ai::types::{ChatRequest, ChatResponse, LlmError, LlmProvider};
use crate::config::ClientConfig;
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// 本地代理的固定转发路径
pub const PROXY_PATH: &str = "/api/proxy";

/// API 客户端
///
/// 对话请求统一 POST 到本地代理，由代理转发到 `ChatRequest::api_url`；
/// 连通性测试则直接访问服务商。重试次数与退避时间在构造时确定。
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    proxy_url: String,
    retry: RetryPolicy,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, LlmError> {
        let client = build_llm_http_client(config.http_proxy.as_deref())?;
        Ok(Self::with_http_client(config, client))
    }

    /// 使用调用方提供的 `reqwest::Client`
    pub fn with_http_client(config: &ClientConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            proxy_url: format!("{}{}", config.proxy_base.trim_end_matches('/'), PROXY_PATH),
            retry: RetryPolicy::new(config.max_retries, config.base_delay),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn proxy_url(&self) -> &str {
        &self.proxy_url
    }

    /// 经代理发送对话请求，返回服务商的原始 JSON
    ///
    /// 超时立即失败；其他错误按 `base_delay * 2^n` 退避后重试，
    /// 用完次数后返回最后一次的错误。
    pub async fn call_openai_api(&self, req: &ChatRequest) -> Result<Value, LlmError> {
        let body = req.proxy_body();
        let max_tries = self.retry.max_retries();
        let mut attempt = 0;

        loop {
            match self.send_proxy_once(&body, req.timeout).await {
                Ok(v) => {
                    info!(
                        "{} call_openai_api(model={}) [{} tries]",
                        self,
                        req.model,
                        attempt + 1
                    );
                    return Ok(v);
                }
                Err(e) if !e.is_retryable() => {
                    warn!("{} call_openai_api(...) [{}]", self, e);
                    return Err(e);
                }
                Err(e) if attempt + 1 >= max_tries => {
                    warn!(
                        "{} call_openai_api(...) [max {} tries ran out: {}]",
                        self, max_tries, e
                    );
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        "{} call_openai_api(...) [try {}/{} failed: {}, retry in {:?}]",
                        self,
                        attempt + 1,
                        max_tries,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn send_proxy_once(&self, body: &Value, timeout: Duration) -> Result<Value, LlmError> {
        let attempt = async {
            let resp = self
                .client
                .post(&self.proxy_url)
                .header("Content-Type", "application/json")
                .json(body)
                .send()
                .await
                .map_err(|e| transport_error(e, timeout))?;

            let status = resp.status();
            let raw = resp.text().await.map_err(|e| transport_error(e, timeout))?;

            if status == StatusCode::GATEWAY_TIMEOUT {
                return Err(LlmError::GatewayTimeout);
            }
            if !status.is_success() {
                let message = error_message(&raw).unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown status")
                        .to_string()
                });
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            serde_json::from_str::<Value>(&raw)
                .map_err(|e| LlmError::MalformedResponse(format!("{e}, raw={raw}")))
        };

        match tokio::time::timeout(timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(timeout)),
        }
    }

    /// 测试与服务商的连通性（不重试）
    ///
    /// Gemini 返回 `[{id}]` 形式的模型列表，其余服务商返回 `/models` 的原始 JSON。
    pub async fn test_connection(&self, api_url: &str, api_key: &str) -> Result<Value, LlmError> {
        if is_gemini_host(api_url) {
            let url = gemini_models_url(api_url);
            let resp = self
                .client
                .get(&url)
                .query(&[("key", api_key)])
                .header("x-goog-api-key", api_key)
                .send()
                .await
                .map_err(|e| LlmError::Http(e.to_string()))?;
            let v = read_json(resp).await?;
            info!("{} test_connection(...) [gemini {}]", self, url);
            Ok(normalize_model_list(v))
        } else {
            let url = models_url(api_url);
            let resp = self
                .client
                .get(&url)
                .bearer_auth(api_key)
                .header("Content-Type", "application/json")
                .send()
                .await
                .map_err(|e| LlmError::Http(e.to_string()))?;
            let v = read_json(resp).await?;
            info!("{} test_connection(...) [{}]", self, url);
            Ok(v)
        }
    }
}

fn transport_error(e: reqwest::Error, timeout: Duration) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout(timeout)
    } else {
        LlmError::Http(e.to_string())
    }
}

async fn read_json(resp: Response) -> Result<Value, LlmError> {
    let status = resp.status();
    let raw = resp
        .text()
        .await
        .map_err(|e| LlmError::Http(e.to_string()))?;

    if !status.is_success() {
        debug!("test_connection failed: {} {}", status.as_u16(), raw);
        return Err(LlmError::Status {
            status: status.as_u16(),
            body: raw,
        });
    }

    serde_json::from_str(&raw).map_err(|e| LlmError::MalformedResponse(format!("{e}, raw={raw}")))
}

#[async_trait]
impl LlmProvider for ApiClient {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, LlmError> {
        let raw = self.call_openai_api(&req).await?;
        let text = extract_text(&raw)?;
        Ok(ChatResponse { text, raw })
    }
}

impl std::fmt::Display for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<ApiClient [{}]>", self.proxy_url)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("proxy_url", &self.proxy_url)
            .field("retry", &self.retry)
            .finish()
    }
}
