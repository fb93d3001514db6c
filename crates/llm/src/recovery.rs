//! Recovery of structured results from raw model text
//!
//! Models wrap JSON in prose or code fences more often than not. Each
//! strategy below extracts one candidate substring; the first candidate
//! that parses and passes the shape check wins.

use clipsight_common::{ClipsightError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use tracing::{debug, warn};

use crate::fallback::summary_from_text;
use crate::prompts::ReplyLanguage;
use crate::types::{MindmapDocument, SubtitleSummary};

/// How a result was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryMethod {
    /// The whole reply was JSON
    Direct,
    /// JSON inside the first ``` fence
    CodeBlock,
    /// Span from the first `{` to the last `}`
    BraceSpan,
    /// Salvaged from prose
    TextFallback,
}

impl RecoveryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryMethod::Direct => "direct",
            RecoveryMethod::CodeBlock => "code block",
            RecoveryMethod::BraceSpan => "brace span",
            RecoveryMethod::TextFallback => "text fallback",
        }
    }
}

impl fmt::Display for RecoveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct RecoveryOptions {
    /// Salvage summaries from prose when every JSON strategy fails
    pub enable_text_fallback: bool,
    /// Emit a warning log line for each failed strategy
    pub log_warnings: bool,
    /// Language of fallback placeholders
    pub language: ReplyLanguage,
}

impl Default for RecoveryOptions {
    fn default() -> Self {
        Self {
            enable_text_fallback: true,
            log_warnings: true,
            language: ReplyLanguage::default(),
        }
    }
}

/// Recovered value plus how it was found
#[derive(Debug, Clone)]
pub struct Recovered<T> {
    pub value: T,
    pub method: RecoveryMethod,
    /// One entry per strategy that was tried and failed
    pub warnings: Vec<String>,
}

type Extractor = fn(&str) -> Option<&str>;

/// Tried in this order
const STRATEGIES: [(RecoveryMethod, Extractor); 3] = [
    (RecoveryMethod::Direct, extract_direct),
    (RecoveryMethod::CodeBlock, extract_code_block),
    (RecoveryMethod::BraceSpan, extract_brace_span),
];

fn extract_direct(text: &str) -> Option<&str> {
    Some(text)
}

/// Body of the first ``` fence, with an optional `json` tag stripped
pub fn extract_code_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let rest = &text[open + 3..];
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let close = rest.find("```")?;
    Some(rest[..close].trim())
}

/// Greedy span from the first `{` to the last `}`
pub fn extract_brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Run the extraction cascade and return the first candidate that validates
pub fn recover<T, F>(raw: &str, is_valid: F, options: &RecoveryOptions) -> Result<Recovered<T>>
where
    T: DeserializeOwned,
    F: Fn(&Value) -> bool,
{
    if raw.is_empty() {
        return Err(ClipsightError::EmptyContent);
    }

    let mut warnings = Vec::new();
    for (method, extract) in STRATEGIES {
        let Some(candidate) = extract(raw) else {
            continue;
        };

        let value = match serde_json::from_str::<Value>(candidate) {
            Ok(value) => value,
            Err(e) => {
                note(&mut warnings, options, format!("{} parse failed: {}", method, e));
                continue;
            }
        };
        if !is_valid(&value) {
            note(&mut warnings, options, format!("{} result has an unexpected shape", method));
            continue;
        }

        // A validated candidate is final, later strategies are not tried
        let value = serde_json::from_value::<T>(value).map_err(|e| {
            ClipsightError::parse(format!("{} result could not be read: {}", method, e))
        })?;
        debug!("Recovered model output via {}", method);
        return Ok(Recovered {
            value,
            method,
            warnings,
        });
    }

    Err(ClipsightError::parse(format!(
        "No valid JSON found in model output ({} characters)",
        raw.chars().count()
    )))
}

fn note(warnings: &mut Vec<String>, options: &RecoveryOptions, message: String) {
    if options.log_warnings {
        warn!("{}", message);
    }
    warnings.push(message);
}

/// Summary recovery, falling back to prose salvage when enabled
pub fn recover_summary(raw: &str, options: &RecoveryOptions) -> Result<Recovered<SubtitleSummary>> {
    match recover(raw, is_valid_subtitle_summary, options) {
        Err(ClipsightError::Parse(reason)) if options.enable_text_fallback => {
            if options.log_warnings {
                warn!("{}, using text fallback", reason);
            }
            Ok(Recovered {
                value: summary_from_text(raw, &options.language),
                method: RecoveryMethod::TextFallback,
                warnings: vec![reason],
            })
        }
        other => other,
    }
}

/// Mindmap recovery; there is no prose fallback for mindmaps
///
/// Duplicate node ids are reported as warnings, the document is kept.
pub fn recover_mindmap(raw: &str, options: &RecoveryOptions) -> Result<Recovered<MindmapDocument>> {
    let mut recovered: Recovered<MindmapDocument> = recover(raw, is_valid_mindmap_data, options)?;

    let duplicates = recovered.value.duplicate_ids();
    if !duplicates.is_empty() {
        note(
            &mut recovered.warnings,
            options,
            format!("mindmap has duplicate node ids: {}", duplicates.join(", ")),
        );
    }
    Ok(recovered)
}

/// Object with a string `summary` and string arrays `keyPoints` / `topics`
pub fn is_valid_subtitle_summary(value: &Value) -> bool {
    let all_strings = |field: &str| {
        value[field]
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string))
    };
    value.is_object() && value["summary"].is_string() && all_strings("keyPoints") && all_strings("topics")
}

/// Object whose `nodeData` has string `topic` and `id`
pub fn is_valid_mindmap_data(value: &Value) -> bool {
    let node = &value["nodeData"];
    value.is_object() && node.is_object() && node["topic"].is_string() && node["id"].is_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUMMARY: &str = r#"{"summary":"s","keyPoints":["k"],"topics":["t"]}"#;

    fn quiet() -> RecoveryOptions {
        RecoveryOptions {
            log_warnings: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_direct() {
        let result = recover_summary(SUMMARY, &quiet()).unwrap();
        assert_eq!(result.method, RecoveryMethod::Direct);
        assert!(result.warnings.is_empty());
        assert_eq!(result.value.topics, vec!["t"]);
    }

    #[test]
    fn test_code_block() {
        let raw = format!("Here you go:\n```json\n{}\n```\nThanks", SUMMARY);
        let result = recover_summary(&raw, &quiet()).unwrap();
        assert_eq!(result.method, RecoveryMethod::CodeBlock);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_code_block_beats_brace_span() {
        // The brace span would cover both objects and fail to parse
        let raw = format!("```\n{}\n```\nAlso {{\"summary\": 1}}", SUMMARY);
        let result = recover_summary(&raw, &quiet()).unwrap();
        assert_eq!(result.method, RecoveryMethod::CodeBlock);
        assert_eq!(result.value.summary, "s");
    }

    #[test]
    fn test_brace_span() {
        let raw = format!("Sure! {} Hope this helps.", SUMMARY);
        let result = recover_summary(&raw, &quiet()).unwrap();
        assert_eq!(result.method, RecoveryMethod::BraceSpan);
        assert_eq!(result.value.key_points, vec!["k"]);
    }

    #[test]
    fn test_wrong_shape_falls_through_to_text() {
        let raw = r#"{"summary": "s", "keyPoints": "not a list", "topics": []}"#;
        let result = recover_summary(raw, &quiet()).unwrap();
        assert_eq!(result.method, RecoveryMethod::TextFallback);
        assert!(!result.value.summary.is_empty());
    }

    #[test]
    fn test_text_fallback_disabled() {
        let options = RecoveryOptions {
            enable_text_fallback: false,
            ..quiet()
        };
        let err = recover_summary("just words", &options).unwrap_err();
        assert!(matches!(err, ClipsightError::Parse(_)));
    }

    #[test]
    fn test_empty_reply() {
        let err = recover_summary("", &quiet()).unwrap_err();
        assert!(matches!(err, ClipsightError::EmptyContent));

        let err = recover_mindmap("", &quiet()).unwrap_err();
        assert!(matches!(err, ClipsightError::EmptyContent));
    }

    #[test]
    fn test_mindmap_recovery() {
        let raw = r#"```json
{"nodeData": {"topic": "Root", "id": "root", "children": [{"topic": "A", "id": "1"}]}}
```"#;
        let result = recover_mindmap(raw, &quiet()).unwrap();
        assert_eq!(result.method, RecoveryMethod::CodeBlock);
        assert_eq!(result.value.node_count(), 2);
    }

    #[test]
    fn test_mindmap_irregular_below_root_is_accepted() {
        let documents = [
            r#"{"nodeData": {"topic": "Root", "id": "0", "children": [{"topic": "A", "id": "1", "tags": "x"}]}}"#,
            r#"{"nodeData": {"topic": "Root", "id": "0"}, "summaries": [{"id": "s", "label": "l", "parent": "1", "start": 0.0, "end": 1}]}"#,
            r#"{"nodeData": {"topic": "Root", "id": "0"}, "arrows": [{"id": "a", "label": 42, "from": "0", "to": "1"}]}"#,
        ];

        for raw in documents {
            let value: Value = serde_json::from_str(raw).unwrap();
            assert!(is_valid_mindmap_data(&value));

            let result = recover_mindmap(raw, &quiet()).unwrap();
            assert_eq!(result.method, RecoveryMethod::Direct);
            assert_eq!(result.value.node_data.topic, "Root");
        }
    }

    #[test]
    fn test_mindmap_duplicate_ids_are_warned() {
        let raw = r#"{"nodeData": {"topic": "r", "id": "1", "children": [{"topic": "a", "id": "1"}]}}"#;
        let result = recover_mindmap(raw, &quiet()).unwrap();
        assert_eq!(result.value.node_count(), 2);
        assert_eq!(result.warnings, vec!["mindmap has duplicate node ids: 1".to_string()]);
    }

    #[test]
    fn test_mindmap_without_root_id_fails() {
        let raw = r#"{"nodeData": {"topic": "Root"}}"#;
        let err = recover_mindmap(raw, &quiet()).unwrap_err();
        assert!(matches!(err, ClipsightError::Parse(_)));
    }

    #[test]
    fn test_mindmap_never_uses_text_fallback() {
        let err = recover_mindmap("Summary: a mindmap", &RecoveryOptions::default()).unwrap_err();
        assert!(matches!(err, ClipsightError::Parse(_)));
    }

    #[test]
    fn test_extractors() {
        assert_eq!(extract_code_block("a ```json {} ``` b"), Some("{}"));
        assert_eq!(extract_code_block("```\n[1]\n```"), Some("[1]"));
        assert_eq!(extract_code_block("``` unterminated"), None);
        assert_eq!(extract_brace_span("x {a} y {b} z"), Some("{a} y {b}"));
        assert_eq!(extract_brace_span("} backwards {"), None);
    }

    #[test]
    fn test_validators() {
        assert!(is_valid_subtitle_summary(&serde_json::json!({
            "summary": "", "keyPoints": [], "topics": []
        })));
        assert!(!is_valid_subtitle_summary(&serde_json::json!(["summary"])));
        assert!(!is_valid_subtitle_summary(&serde_json::json!({
            "summary": "", "keyPoints": [1], "topics": []
        })));
        assert!(is_valid_mindmap_data(&serde_json::json!({
            "nodeData": {"topic": "t", "id": "1"}
        })));
        assert!(!is_valid_mindmap_data(&serde_json::json!({
            "nodeData": {"topic": "t", "id": 1}
        })));
    }
}
