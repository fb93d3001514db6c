//! Prompt templates for summaries and mindmaps
//!
//! The reply language is always passed in explicitly.

use std::fmt;

/// Language the model is asked to answer in
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReplyLanguage {
    #[default]
    Chinese,
    English,
    /// Any other language, named as it should appear in the prompt
    Other(String),
}

impl ReplyLanguage {
    /// Interpret a language tag, name or POSIX locale (`zh`, `english`, `en_US.UTF-8`)
    pub fn from_tag(tag: &str) -> Self {
        // Drop encoding/modifier suffixes like ".UTF-8" or "@euro"
        let base = tag.trim().split(['.', '@']).next().unwrap_or_default();
        let lower = base.to_lowercase();

        if lower.starts_with("zh") || lower.contains("cn") || lower == "chinese" || base == "中文" {
            ReplyLanguage::Chinese
        } else if lower.is_empty() || lower.starts_with("en") || lower == "c" || lower == "posix" {
            ReplyLanguage::English
        } else {
            ReplyLanguage::Other(base.to_string())
        }
    }

    /// Name used inside prompts
    pub fn prompt_name(&self) -> &str {
        match self {
            ReplyLanguage::Chinese => "Simplified Chinese",
            ReplyLanguage::English => "English",
            ReplyLanguage::Other(name) => name,
        }
    }
}

impl fmt::Display for ReplyLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prompt_name())
    }
}

/// System prompt for structured caption summaries
pub fn summary_system_prompt(language: &ReplyLanguage) -> String {
    format!(
        r#"You are a video content analyst who extracts knowledge from transcripts. Read the captions provided by the user and produce a structured analysis:

1. summary: a 150-300 word overview of the core content and main arguments
2. keyPoints: the 3-8 most important ideas, each short and self-contained
3. topics: 2-6 topic tags that help categorise and find the video

Reply with JSON only, in exactly this shape:
{{
  "summary": "overview of the video",
  "keyPoints": ["point 1", "point 2", "point 3"],
  "topics": ["tag 1", "tag 2"]
}}

Rules:
- Write every field in {language}
- Stay objective and accurate
- Avoid repeating the same idea
- The output must be valid JSON"#,
        language = language.prompt_name()
    )
}

/// User prompt carrying the captions to summarise
pub fn summary_user_prompt(captions: &str) -> String {
    format!(
        "Analyse the following video captions:\n\nCaptions:\n{}\n\nProduce the structured result described in the instructions.",
        captions
    )
}

/// System prompt describing the mindmap document format
pub fn mindmap_system_prompt(language: &ReplyLanguage) -> String {
    format!(
        r#"```ts
interface NodeObj {{
  topic: string
  id: string
  tags?: string[]
  children?: NodeObj[]
}}

// Brackets children `start`..`end` of node `parent` with a label
interface Summary {{
  id: string
  label: string
  parent: string
  start: number
  end: number
}}

// Labelled link between any two nodes
interface Arrow {{
  id: string
  label: string
  from: string
  to: string
  delta1: {{ x: number, y: number }} // control point offset from `from`
  delta2: {{ x: number, y: number }} // control point offset from `to`
  bidirectional?: boolean
}}
```

Answer with a single JSON object of the form {{ "nodeData": NodeObj, "arrows"?: Arrow[], "summaries"?: Summary[] }}. It describes a mindmap as a recursive tree. `nodeData`, `arrows` and `summaries` are siblings at the top level.

Guidelines:
- Use incrementing numbers as node ids
- Prefer a real hierarchy over long flat lists of siblings
- Only the root node may carry tags; tags must be generic enough to group similar content
- A Summary brackets several children of the same parent; never summarise the root node
- Arrows may connect any two nodes, with a label explaining the relation; delta defaults to 50,50
- Do not draw arrows for direct parent/child relations
- Add summaries and arrows where they help

Rules:
- Write every topic and label in {language}
- Return valid JSON and nothing else"#,
        language = language.prompt_name()
    )
}

/// User prompt for a video mindmap
pub fn mindmap_video_user_prompt(captions: &str) -> String {
    format!(
        "Build a mindmap from the following video captions:\n\n{}",
        captions
    )
}

/// User prompt for an article mindmap
pub fn mindmap_article_user_prompt(title: &str, content: &str) -> String {
    format!(
        "Build a mindmap from the following article:\n\nTitle: {}\n\nContent:\n{}",
        title, content
    )
}
