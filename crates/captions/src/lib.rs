//! Clipsight captions
//!
//! Caption fragment types, platform payload parsing, merging into readable
//! lines, and flattening for analysis prompts

mod format;
mod merge;
mod source;
mod types;

pub use format::{format_for_analysis, truncate_for_analysis, MAX_ANALYSIS_CHARS};
pub use merge::{merge_captions, HARD_MAX_CHARS, MAX_GAP_SECS, SOFT_MAX_CHARS};
pub use source::{parse_bilibili, parse_captions, parse_youtube_json3};
pub use types::{format_timestamp, to_markdown, CaptionFragment, MergedCaption};
