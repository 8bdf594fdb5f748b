use regex::Regex;
use reqwest::Url;
use std::sync::OnceLock;

/// Gemini API 主机名
pub const GEMINI_HOST: &str = "generativelanguage.googleapis.com";

/// 未找到版本段时使用的 Gemini API 版本
pub const GEMINI_DEFAULT_VERSION: &str = "v1beta";

/// Gemini 模型名前缀，如 `models/gemini-pro`
pub const GEMINI_MODEL_PREFIX: &str = "models/";

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

fn gemini_host_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(^|\.)generativelanguage\.googleapis\.com$").expect("valid regex"))
}

fn version_segment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^v\d").expect("valid regex"))
}

/// 判断 URL 是否指向 Gemini API，无法解析的 URL 返回 false
pub fn is_gemini_host(url: &str) -> bool {
    Url::parse(url.trim())
        .ok()
        .and_then(|u| u.host_str().map(|h| gemini_host_re().is_match(h)))
        .unwrap_or(false)
}

/// 提取 Gemini 的版本化基础地址，如 `https://generativelanguage.googleapis.com/v1beta`
///
/// 路径中没有 `v<数字>` 段时回退到 [`GEMINI_DEFAULT_VERSION`]；
/// URL 无法解析时原样返回。
pub fn gemini_base(url: &str) -> String {
    let parsed = match Url::parse(url.trim()) {
        Ok(u) => u,
        Err(_) => return url.to_string(),
    };
    let version = parsed
        .path_segments()
        .and_then(|mut segs| segs.find(|s| version_segment_re().is_match(s)))
        .unwrap_or(GEMINI_DEFAULT_VERSION)
        .to_string();
    format!("{}/{}", parsed.origin().ascii_serialization(), version)
}

/// 规范化对话接口地址：以 `/v1` 结尾时补全 `/chat/completions`
pub fn normalize_endpoint(url: &str) -> String {
    if is_gemini_host(url) {
        return url.to_string();
    }
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.ends_with("/v1") {
        format!("{}{}", trimmed, CHAT_COMPLETIONS_PATH)
    } else {
        url.to_string()
    }
}

pub fn gemini_models_url(url: &str) -> String {
    format!("{}/models", gemini_base(url))
}

pub fn models_url(url: &str) -> String {
    format!("{}/models", url.trim().trim_end_matches('/'))
}
