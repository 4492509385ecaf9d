//! Response Parser
//!
//! Extracts a structured object from raw oracle text. Handles both a bare
//! body and a chat-completion envelope (`choices[0].message.content`), and
//! strips Markdown code fences. Never fails: unusable text becomes
//! [`ParsedResponse::Malformed`] so the caller can retry.

use serde_json::Value;

/// Outcome of parsing raw oracle text
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    /// Decoded structured data (not yet schema-checked)
    Object(Value),

    /// Sentinel for text that could not be decoded
    Malformed { reason: String },
}

impl ParsedResponse {
    pub fn is_malformed(&self) -> bool {
        matches!(self, ParsedResponse::Malformed { .. })
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            ParsedResponse::Object(value) => Some(value),
            ParsedResponse::Malformed { .. } => None,
        }
    }
}

/// Parse raw oracle text into structured data
pub fn parse(raw: &str) -> ParsedResponse {
    let body = unwrap_envelope(raw);
    let content = strip_fences(&body);

    if content.is_empty() {
        return ParsedResponse::Malformed {
            reason: "empty response".to_string(),
        };
    }

    match serde_json::from_str::<Value>(content) {
        Ok(value) => ParsedResponse::Object(value),
        Err(e) => ParsedResponse::Malformed {
            reason: format!("unable to parse response: {}", e),
        },
    }
}

/// Pull message content out of a chat-completion envelope, if `raw` is one
fn unwrap_envelope(raw: &str) -> String {
    let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(raw.trim()) else {
        return raw.to_string();
    };

    obj.get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| raw.to_string())
}

/// Remove a leading ```` ```lang ```` line and a trailing fence
fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_bare_json() {
        let parsed = parse(r#"{"response": "ok"}"#);
        assert_eq!(parsed, ParsedResponse::Object(json!({"response": "ok"})));
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = "```json\n{\"passed\": true, \"issues\": []}\n```";
        assert_eq!(
            parse(raw),
            ParsedResponse::Object(json!({"passed": true, "issues": []}))
        );

        let raw = "```\n{\"a\": 1}\n```\n";
        assert_eq!(parse(raw), ParsedResponse::Object(json!({"a": 1})));
    }

    #[test]
    fn test_parse_chat_completion_envelope() {
        let raw = json!({
            "choices": [{"message": {"role": "assistant", "content": "```json\n{\"response\": \"hi\"}\n```"}}]
        })
        .to_string();
        assert_eq!(parse(&raw), ParsedResponse::Object(json!({"response": "hi"})));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(parse("Sure! Here is your plan: step 1...").is_malformed());
        assert!(parse("").is_malformed());
        assert!(parse("```json\n```").is_malformed());
        assert!(parse("{\"unterminated\": ").into_value().is_none());
    }

    #[test]
    fn test_envelope_without_content_is_parsed_as_is() {
        let raw = r#"{"choices": []}"#;
        assert_eq!(parse(raw), ParsedResponse::Object(json!({"choices": []})));
    }
}
