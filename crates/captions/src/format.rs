use clipsight_common::{ClipsightError, Result};
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::types::CaptionFragment;

/// Maximum characters of caption text sent for analysis
pub const MAX_ANALYSIS_CHARS: usize = 8000;

/// A cut point is only accepted past this many characters
const MIN_CUT_CHARS: usize = 7000;

/// Flatten caption fragments into a single prompt-ready string
///
/// Drops empty and adjacent duplicate lines, folds CJK punctuation and
/// whitespace runs into single spaces, and caps the result at
/// [`MAX_ANALYSIS_CHARS`].
pub fn format_for_analysis(fragments: &[CaptionFragment]) -> Result<String> {
    if fragments.is_empty() {
        return Err(ClipsightError::invalid_input("No captions to analyse"));
    }

    let mut lines: Vec<&str> = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        let text = fragment.text.trim();
        if text.is_empty() || lines.last() == Some(&text) {
            continue;
        }
        lines.push(text);
    }

    let formatted = fold_separators(&lines.join(" "));
    let truncated = truncate_for_analysis(&formatted);

    debug!(
        "Formatted {} fragments into {} chars for analysis",
        fragments.len(),
        truncated.chars().count()
    );
    Ok(truncated)
}

/// Collapse runs of whitespace and CJK punctuation into one space
fn fold_separators(text: &str) -> String {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    let re = SEPARATORS
        .get_or_init(|| Regex::new(r"[\s。，！？；：、]+").expect("separator pattern"));
    re.replace_all(text, " ").trim().to_string()
}

/// Cap text at [`MAX_ANALYSIS_CHARS`], preferring a sentence or word boundary
pub fn truncate_for_analysis(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= MAX_ANALYSIS_CHARS {
        return text.to_string();
    }

    let window = &chars[..MAX_ANALYSIS_CHARS];
    let last_period = window.iter().rposition(|&c| c == '。');
    let last_space = window.iter().rposition(|&c| c == ' ');

    let cut = match (last_period, last_space) {
        (Some(p), _) if p > MIN_CUT_CHARS => p + 1,
        (_, Some(s)) if s > MIN_CUT_CHARS => s,
        _ => MAX_ANALYSIS_CHARS,
    };

    chars[..cut].iter().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(text: &str) -> CaptionFragment {
        CaptionFragment::new(0.0, 1.0, text)
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let err = format_for_analysis(&[]).unwrap_err();
        assert!(matches!(err, ClipsightError::InvalidInput(_)));
    }

    #[test]
    fn test_dedupes_and_folds() {
        let fragments = vec![
            frag("  大家好，"),
            frag("大家好，"),
            frag(""),
            frag("今天  我们聊聊 Rust。"),
            frag("大家好，"),
        ];

        let text = format_for_analysis(&fragments).unwrap();
        assert_eq!(text, "大家好 今天 我们聊聊 Rust 大家好");
    }

    #[test]
    fn test_short_text_untouched() {
        assert_eq!(truncate_for_analysis("short text"), "short text");
    }

    #[test]
    fn test_truncates_at_last_space() {
        let word = "abcdefghi ";
        let text = word.repeat(1000);
        let truncated = truncate_for_analysis(&text);

        assert!(truncated.chars().count() <= MAX_ANALYSIS_CHARS);
        assert!(truncated.chars().count() > MIN_CUT_CHARS);
        assert!(truncated.ends_with("abcdefghi"));
    }

    #[test]
    fn test_truncates_hard_without_boundary() {
        let text = "x".repeat(MAX_ANALYSIS_CHARS + 500);
        assert_eq!(truncate_for_analysis(&text).chars().count(), MAX_ANALYSIS_CHARS);
    }

    #[test]
    fn test_prefers_sentence_end() {
        let mut text = "字".repeat(7500);
        text.push('。');
        text.push_str(&"词 ".repeat(400));
        let truncated = truncate_for_analysis(&text);
        assert!(truncated.ends_with('。'));
        assert_eq!(truncated.chars().count(), 7501);
    }
}
