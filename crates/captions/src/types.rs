use serde::{Deserialize, Serialize};

/// Raw timestamped caption unit as delivered by the source platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionFragment {
    /// Start time in seconds
    pub start: f64,

    /// Duration in seconds
    pub dur: f64,

    /// Caption text
    pub text: String,
}

impl CaptionFragment {
    /// Create a new fragment
    pub fn new(start: f64, dur: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            dur,
            text: text.into(),
        }
    }

    /// End time in seconds
    pub fn end(&self) -> f64 {
        self.start + self.dur
    }
}

/// One readable line built from consecutive fragments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedCaption {
    /// Start of the first fragment
    pub start: f64,

    /// Span from the first fragment's start to the last fragment's end
    pub dur: f64,

    /// Space-joined fragment texts
    pub text: String,
}

impl MergedCaption {
    /// End time in seconds
    pub fn end(&self) -> f64 {
        self.start + self.dur
    }

    /// Get formatted time range string
    pub fn time_range(&self) -> String {
        format!(
            "{} - {}",
            format_timestamp(self.start),
            format_timestamp(self.end())
        )
    }
}

/// Format seconds as `MM:SS`, or `H:MM:SS` past the first hour
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;

    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

/// Render merged captions as a markdown transcript
pub fn to_markdown(title: &str, captions: &[MergedCaption]) -> String {
    let mut md = format!("# {}\n\n", title);
    for caption in captions {
        md.push_str(&format!("[{}] {}\n", caption.time_range(), caption.text));
    }
    md
}
