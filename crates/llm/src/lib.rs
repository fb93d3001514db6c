//! Clipsight LLM integration
//!
//! Provider adapters behind one HTTP gateway, recovery of structured
//! results from model text, and the summary/mindmap analysis service

mod analysis;
mod cache;
mod fallback;
mod gateway;
mod llm_trait;
mod prompts;
mod provider;
mod recovery;
mod types;

pub use analysis::{AnalysisService, AnalysisSettings};
pub use cache::{cache_key, AnalysisCache, AnalysisKind, CacheEntry, JsonFileCache, MemoryCache};
pub use fallback::summary_from_text;
pub use gateway::ProviderGateway;
pub use llm_trait::LlmClient;
pub use prompts::{
    mindmap_article_user_prompt, mindmap_system_prompt, mindmap_video_user_prompt,
    summary_system_prompt, summary_user_prompt, ReplyLanguage,
};
pub use provider::{
    AdapterRegistry, AnalysisRequest, ClaudeAdapter, GeminiAdapter, OpenAiAdapter,
    OpenAiCompatibleAdapter, ProviderAdapter, ProviderId, RequestDescriptor,
};
pub use recovery::{
    extract_brace_span, extract_code_block, is_valid_mindmap_data, is_valid_subtitle_summary,
    recover, recover_mindmap, recover_summary, Recovered, RecoveryMethod, RecoveryOptions,
};
pub use types::{
    Delta, MindmapArrow, MindmapDocument, MindmapNode, MindmapSummary, SubtitleSummary,
};
