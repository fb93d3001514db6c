//! Caption merging
//!
//! Platforms deliver captions as many tiny timestamped fragments. The merger
//! folds consecutive fragments into readable lines in one greedy pass.

use tracing::debug;

use crate::types::{CaptionFragment, MergedCaption};

/// Accumulated length (chars) at which a group is closed
pub const SOFT_MAX_CHARS: usize = 50;

/// Hard cap on accumulated length (chars)
pub const HARD_MAX_CHARS: usize = 120;

/// Silence (seconds) between fragments that forces a new line
pub const MAX_GAP_SECS: f64 = 2.0;

/// Sentence-terminal punctuation, CJK and ASCII
const SENTENCE_ENDINGS: &[char] = &['。', '！', '？', '.', '!', '?'];

/// Merge caption fragments into readable lines
///
/// Fragments must be time-ordered. Text is never dropped or reordered:
/// space-joining the output texts gives the space-joined input texts.
pub fn merge_captions(fragments: &[CaptionFragment]) -> Vec<MergedCaption> {
    let mut merged = Vec::new();
    let mut group: Vec<&CaptionFragment> = Vec::new();
    let mut text = String::new();

    for (i, current) in fragments.iter().enumerate() {
        if !group.is_empty() {
            text.push(' ');
        }
        text.push_str(&current.text);
        group.push(current);

        if should_close(current, fragments.get(i + 1), &text) {
            merged.push(flush(&group, &text));
            group.clear();
            text.clear();
        }
    }

    debug!(
        "Merged {} caption fragments into {} lines",
        fragments.len(),
        merged.len()
    );
    merged
}

fn should_close(current: &CaptionFragment, next: Option<&CaptionFragment>, text: &str) -> bool {
    let len = text.chars().count();

    let next = match next {
        Some(next) => next,
        None => return true,
    };

    len >= SOFT_MAX_CHARS
        || next.start - current.end() > MAX_GAP_SECS
        || len >= HARD_MAX_CHARS
        || ends_sentence(&current.text)
}

fn ends_sentence(text: &str) -> bool {
    text.trim_end().ends_with(SENTENCE_ENDINGS)
}

fn flush(group: &[&CaptionFragment], text: &str) -> MergedCaption {
    // Callers only flush non-empty groups
    let first = group[0];
    let last = group[group.len() - 1];

    MergedCaption {
        start: first.start,
        dur: last.end() - first.start,
        text: text.trim().to_string(),
    }
}
