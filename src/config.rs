use crate::ai::retry::{DEFAULT_BASE_DELAY, DEFAULT_MAX_RETRIES};
use crate::ai::LlmError;
use std::time::Duration;

pub const DEFAULT_RELAY_BASE: &str = "http://127.0.0.1:3000";

/// 客户端配置
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// 本地代理服务地址，请求会 POST 到 `{proxy_base}/api/proxy`
    pub proxy_base: String,
    pub max_retries: usize,
    pub base_delay: Duration,
    /// 出站 HTTP/SOCKS 代理，不带 scheme 时按 `socks5h://` 处理
    pub http_proxy: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            proxy_base: DEFAULT_RELAY_BASE.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            http_proxy: None,
        }
    }
}

impl ClientConfig {
    pub fn new(proxy_base: impl Into<String>) -> Self {
        Self {
            proxy_base: proxy_base.into(),
            ..Self::default()
        }
    }

    pub fn with_retries(mut self, max_retries: usize, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    /// 从环境变量读取配置
    ///
    /// * `LLM_RELAY_BASE` - 代理服务地址
    /// * `LLM_MAX_RETRIES` - 最大尝试次数
    /// * `LLM_RETRY_DELAY_MS` - 退避基础时间（毫秒）
    /// * `LLM_PROXY` - 出站代理
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// 读取必需的环境变量，缺失或为空时返回 `MissingEnv`
    pub fn require_env(name: &'static str) -> Result<String, LlmError> {
        require_from(|k| std::env::var(k).ok(), name)
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, LlmError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| {
            lookup(k)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut cfg = Self::default();

        if let Some(base) = get("LLM_RELAY_BASE") {
            cfg.proxy_base = base;
        }
        if let Some(raw) = get("LLM_MAX_RETRIES") {
            cfg.max_retries = raw
                .parse()
                .map_err(|_| LlmError::InvalidConfig(format!("LLM_MAX_RETRIES={raw}")))?;
        }
        if let Some(raw) = get("LLM_RETRY_DELAY_MS") {
            let ms: u64 = raw
                .parse()
                .map_err(|_| LlmError::InvalidConfig(format!("LLM_RETRY_DELAY_MS={raw}")))?;
            cfg.base_delay = Duration::from_millis(ms);
        }
        cfg.http_proxy = get("LLM_PROXY");

        Ok(cfg)
    }
}

fn require_from<F>(lookup: F, name: &'static str) -> Result<String, LlmError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(LlmError::MissingEnv(name))
}
