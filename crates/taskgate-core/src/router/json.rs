//! Lenient JSON extraction from model output.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use super::error::{RouterError, RouterResult};

const SNIPPET_CHARS: usize = 120;

fn fence_pattern() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\r?\n?(.*?)```").ok())
        .as_ref()
}

/// Parse `content` as JSON directly, else from the first fenced code block
/// (```` ```json ```` or bare ```` ``` ````) whose contents parse.
pub fn parse_json_content(content: &str) -> RouterResult<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(content.trim()) {
        return Ok(value);
    }

    if let Some(fence) = fence_pattern() {
        for captures in fence.captures_iter(content) {
            if let Some(body) = captures.get(1) {
                if let Ok(value) = serde_json::from_str::<Value>(body.as_str().trim()) {
                    return Ok(value);
                }
            }
        }
    }

    Err(RouterError::ResponseNotJson {
        snippet: content.chars().take(SNIPPET_CHARS).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fenced_and_unfenced_parse_identically() {
        let raw = r#"{"verdict":"APPROVE","confidence":0.9}"#;
        let fenced = format!("Here you go:\n```json\n{raw}\n```\nThanks.");
        assert_eq!(parse_json_content(raw).unwrap(), parse_json_content(&fenced).unwrap());
    }

    #[test]
    fn test_bare_fence_and_later_fence() {
        let content = "```\nnot json\n```\nthen\n```\n[1, 2]\n```";
        assert_eq!(parse_json_content(content).unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_unparseable_is_response_not_json() {
        let err = parse_json_content("I cannot help with that.").unwrap_err();
        match err {
            RouterError::ResponseNotJson { snippet } => assert!(snippet.starts_with("I cannot")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
