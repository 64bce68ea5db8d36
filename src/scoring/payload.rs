use anyhow::{Result, anyhow};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)\s*```").expect("fence regex"));

/// 从模型输出中取出 JSON 对象
///
/// 先去掉 ``` / ```json 代码块包裹；若仍不是合法 JSON，再退而取最外层的 `{...}`。
/// 结果必须是 JSON 对象，否则报错。
pub fn extract_json_payload(raw: &str) -> Result<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("模型输出为空"));
    }

    let body = FENCE
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(trimmed);

    let value = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(first_err) => {
            let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) else {
                return Err(anyhow!("模型输出不是 JSON: {}", first_err));
            };
            if end <= start {
                return Err(anyhow!("模型输出不是 JSON: {}", first_err));
            }
            serde_json::from_str::<Value>(&body[start..=end])
                .map_err(|e| anyhow!("模型输出不是 JSON: {}", e))?
        }
    };

    if value.is_object() {
        Ok(value)
    } else {
        Err(anyhow!("模型输出的 JSON 不是对象"))
    }
}
