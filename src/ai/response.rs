use crate::ai::endpoint::GEMINI_MODEL_PREFIX;
use crate::ai::types::{LlmError, ModelEntry};
use serde_json::Value;

/// 从 OpenAI 风格的返回中取出文本
pub fn extract_text(v: &Value) -> Result<String, LlmError> {
    if let Some(choice0) = v.get("choices").and_then(|c| c.get(0)) {
        // 兼容多种返回结构：message.content（字符串或数组）、content（字符串或数组）、text
        let content = choice0
            .get("message")
            .and_then(|m| m.get("content"))
            .or_else(|| choice0.get("content"));

        if let Some(content) = content {
            return match content {
                Value::String(s) => Ok(s.clone()),
                Value::Array(arr) => {
                    let parts: Vec<&str> = arr
                        .iter()
                        .filter_map(|it| it.get("text").and_then(|x| x.as_str()).or(it.as_str()))
                        .collect();
                    Ok(parts.join("\n"))
                }
                _ => Err(LlmError::InvalidResponse(format!(
                    "unexpected content type, raw={v}"
                ))),
            };
        }
        if let Some(Value::String(s)) = choice0.get("text") {
            return Ok(s.clone());
        }
    }

    if let Some(Value::String(s)) = v.get("output_text") {
        return Ok(s.clone());
    }

    Err(LlmError::InvalidResponse(format!(
        "missing content/text in choices[0], raw={v}"
    )))
}

/// 尽力从错误响应体中取出服务端给出的信息
pub fn error_message(raw: &str) -> Option<String> {
    let v: Value = serde_json::from_str(raw).ok()?;
    let candidates = [
        v.get("error").and_then(|e| e.get("message")),
        v.get("error"),
        v.get("message"),
        v.get("detail"),
    ];
    let msg = candidates
        .into_iter()
        .flatten()
        .find_map(|c| c.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    msg
}

/// 把 Gemini 的模型列表转换成 `[{id}]`，没有 `models` 列表时原样返回
pub fn normalize_model_list(v: Value) -> Value {
    let Some(models) = v.get("models").and_then(|m| m.as_array()) else {
        return v;
    };
    let entries: Vec<ModelEntry> = models
        .iter()
        .filter_map(|m| m.get("name").and_then(|n| n.as_str()))
        .map(|name| ModelEntry {
            id: name
                .strip_prefix(GEMINI_MODEL_PREFIX)
                .unwrap_or(name)
                .to_string(),
        })
        .collect();
    serde_json::to_value(entries).unwrap_or(v)
}
