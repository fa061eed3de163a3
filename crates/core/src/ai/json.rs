use anyhow::Context;
use serde_json::Value;

/// Salvage a JSON object from model text output: strip Markdown fences, or
/// fall back to the first '{' .. last '}' span.
pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        let mut inner = trimmed;
        if let Some(after_first) = inner.splitn(2, '\n').nth(1) {
            inner = after_first;
        }
        if let Some(end) = inner.rfind("```") {
            inner = &inner[..end];
        }
        return Some(inner.trim().to_string());
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

pub fn parse_object(text: &str) -> anyhow::Result<Value> {
    let json_str = extract_json(text).unwrap_or_else(|| text.trim().to_string());
    serde_json::from_str::<Value>(&json_str)
        .with_context(|| format!("model output is not valid JSON: {json_str}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_handles_fenced_blocks() {
        let body = "{\"a\":1}";
        let fenced = format!("```json\n{body}\n```\n");
        assert_eq!(extract_json(&fenced), Some(body.to_string()));
    }

    #[test]
    fn extract_json_falls_back_to_braces() {
        let s = "prefix {\"a\":1} suffix";
        assert_eq!(extract_json(s), Some("{\"a\":1}".to_string()));
    }

    #[test]
    fn extract_json_rejects_braceless_text() {
        assert_eq!(extract_json("no json here"), None);
    }

    #[test]
    fn parse_object_accepts_prose_wrapped_json() {
        let v = parse_object("Here you go:\n{\"strengths\": [\"garden\"]}").unwrap();
        assert_eq!(v["strengths"][0], "garden");
    }

    #[test]
    fn parse_object_rejects_invalid_json() {
        assert!(parse_object("{not json}").is_err());
    }
}
