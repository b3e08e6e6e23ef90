//! # Structured Extraction
//!
//! Turns free-form model text into a JSON object. Three ordered tiers, first
//! success wins:
//!
//! 1. direct - the whole (trimmed) text is a JSON object
//! 2. fenced - the first Markdown code fence holds a JSON object
//! 3. brace span - the first balanced `{ ... }` span is a JSON object
//!
//! Nothing beyond structural extraction is attempted. Malformed JSON is
//! reported, not repaired.

use crate::error::{WorkflowError, WorkflowResult};
use serde_json::Value;

/// Parse model output into a JSON object
pub fn parse_structured(raw: &str) -> WorkflowResult<Value> {
    let tiers: [(&str, fn(&str) -> Option<Value>); 3] = [
        ("direct", parse_direct),
        ("fenced", parse_fenced),
        ("brace_span", parse_brace_span),
    ];

    for (tier, parse) in tiers {
        if let Some(value) = parse(raw) {
            tracing::debug!(tier, "Extracted JSON object");
            return Ok(value);
        }
    }

    Err(WorkflowError::Extraction {
        message: "no tier produced a JSON object".to_string(),
        raw: raw.to_string(),
    })
}

/// Tier 1: the trimmed text parses as an object
pub fn parse_direct(text: &str) -> Option<Value> {
    as_object(text.trim())
}

/// Tier 2: the first fenced block (```` ```json ```` or bare ```` ``` ````)
pub fn parse_fenced(text: &str) -> Option<Value> {
    let re = regex::Regex::new(r"(?s)```[A-Za-z0-9_-]*[^\S\n]*\n?(.*?)```").ok()?;
    let body = re.captures(text)?.get(1)?.as_str();
    as_object(body.trim())
}

/// Tier 3: the first balanced brace span, ignoring braces inside strings
pub fn parse_brace_span(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return as_object(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

fn as_object(candidate: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_direct_tier() {
        let value = parse_structured("  {\"passed\": true}\n").unwrap();
        assert_eq!(value, json!({"passed": true}));
    }

    #[test]
    fn test_fenced_tier_after_prose() {
        let raw = "Here you go:\n```json\n{\"passed\": true, \"issues\": [], \"suggested_fixes\": []}\n```";
        assert!(parse_direct(raw).is_none());
        let value = parse_structured(raw).unwrap();
        assert_eq!(
            value,
            json!({"passed": true, "issues": [], "suggested_fixes": []})
        );
    }

    #[test]
    fn test_bare_fence() {
        let raw = "```\n{\"a\": 1}\n```\ntrailing words";
        assert_eq!(parse_fenced(raw), Some(json!({"a": 1})));
    }

    #[test]
    fn test_brace_span_ignores_braces_in_strings() {
        let raw = "Sure! {\"text\": \"use } and { freely\", \"n\": {\"x\": 2}} hope that helps";
        assert!(parse_fenced(raw).is_none());
        assert_eq!(
            parse_brace_span(raw),
            Some(json!({"text": "use } and { freely", "n": {"x": 2}}))
        );
    }

    #[test]
    fn test_brace_span_handles_escaped_quotes() {
        let raw = r#"result: {"q": "say \"hi\" {now}"}"#;
        assert_eq!(parse_brace_span(raw), Some(json!({"q": "say \"hi\" {now}"})));
    }

    #[test]
    fn test_non_object_json_is_rejected() {
        assert!(parse_direct("[1, 2, 3]").is_none());
        assert!(parse_direct("\"just a string\"").is_none());
    }

    #[test]
    fn test_all_tiers_fail_carries_raw() {
        let raw = "I cannot produce JSON today. {not json}";
        match parse_structured(raw).unwrap_err() {
            WorkflowError::Extraction { raw: carried, .. } => assert_eq!(carried, raw),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unbalanced_braces() {
        assert!(parse_brace_span("{\"a\": {\"b\": 1}").is_none());
    }
}
