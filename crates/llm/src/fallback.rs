use regex::Regex;
use std::sync::OnceLock;

use crate::prompts::ReplyLanguage;
use crate::types::SubtitleSummary;

/// Characters of prose kept when no summary label is present
pub const FALLBACK_SUMMARY_CHARS: usize = 200;
/// At most this many key points are salvaged
pub const MAX_FALLBACK_KEY_POINTS: usize = 6;
/// Leading lines used as key points when no label is present
const UNLABELLED_KEY_POINT_LINES: usize = 4;
/// At most this many topics are salvaged
pub const MAX_FALLBACK_TOPICS: usize = 5;

fn summary_label() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:总结|summary)[：:]([^\n]*)").expect("summary label pattern"))
}

fn key_points_label() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:关键要点|要点|keypoints?)[：:]").expect("key points label pattern"))
}

fn topics_label() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:话题|topics?)[：:]").expect("topics label pattern"))
}

fn bullet_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:[0-9]+[.)、]?|[\-*\s])+").expect("bullet prefix pattern"))
}

/// Placeholder texts for fields the fallback could not fill
struct Placeholders {
    summary: &'static str,
    key_point: &'static str,
    topics_missing: [&'static str; 2],
    topics_empty: &'static str,
}

impl Placeholders {
    fn for_language(language: &ReplyLanguage) -> Self {
        match language {
            ReplyLanguage::Chinese => Self {
                summary: "视频内容总结",
                key_point: "内容要点提取",
                topics_missing: ["视频内容分析", "知识提取"],
                topics_empty: "视频分析",
            },
            _ => Self {
                summary: "Video content summary",
                key_point: "Key points extracted from the content",
                topics_missing: ["Video content analysis", "Knowledge extraction"],
                topics_empty: "Video analysis",
            },
        }
    }
}

/// Salvage a summary from free-form prose
///
/// Looks for `summary:` / `keypoints:` / `topics:` style labels (English or
/// Chinese, either colon) and fills anything missing with placeholders.
/// Never fails and never returns empty fields.
pub fn summary_from_text(text: &str, language: &ReplyLanguage) -> SubtitleSummary {
    let placeholders = Placeholders::for_language(language);

    let summary = extract_summary(text);
    let summary = if summary.trim().is_empty() {
        placeholders.summary.to_string()
    } else {
        summary
    };

    let mut key_points = extract_key_points(text);
    if key_points.is_empty() {
        key_points.push(placeholders.key_point.to_string());
    }

    let topics = match extract_topics(text) {
        Some(topics) if topics.is_empty() => vec![placeholders.topics_empty.to_string()],
        Some(topics) => topics,
        None => placeholders
            .topics_missing
            .iter()
            .map(|t| t.to_string())
            .collect(),
    };

    SubtitleSummary {
        summary,
        key_points,
        topics,
    }
}

fn extract_summary(text: &str) -> String {
    if let Some(caps) = summary_label().captures(text) {
        return caps[1].trim().to_string();
    }

    let chars = text.chars().count();
    if chars > FALLBACK_SUMMARY_CHARS {
        let head: String = text.chars().take(FALLBACK_SUMMARY_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Lines between the key points label and the topics label (or the end),
/// else the first few lines of the text
fn extract_key_points(text: &str) -> Vec<String> {
    let Some(label) = key_points_label().find(text) else {
        return text
            .split('\n')
            .filter(|line| !line.trim().is_empty())
            .take(UNLABELLED_KEY_POINT_LINES)
            .map(strip_bullet)
            .filter(|line| !line.is_empty())
            .collect();
    };

    let rest = &text[label.end()..];
    let section = match topics_label().find(rest) {
        Some(next) => &rest[..next.start()],
        None => rest,
    };

    section
        .split('\n')
        .map(strip_bullet)
        .filter(|line| !line.is_empty())
        .take(MAX_FALLBACK_KEY_POINTS)
        .collect()
}

/// `None` when no topics label exists, otherwise the (possibly empty) list
fn extract_topics(text: &str) -> Option<Vec<String>> {
    let label = topics_label().find(text)?;

    Some(
        text[label.end()..]
            .split([',', '，', '\n'])
            .map(strip_bullet)
            .filter(|topic| !topic.is_empty())
            .take(MAX_FALLBACK_TOPICS)
            .collect(),
    )
}

fn strip_bullet(line: &str) -> String {
    bullet_prefix().replace(line, "").trim().to_string()
}
