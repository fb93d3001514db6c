use chrono::Duration;
use clipsight_captions::{format_for_analysis, CaptionFragment};
use clipsight_common::{AppConfig, ClipsightError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::{cache_key, AnalysisCache, AnalysisKind, CacheEntry};
use crate::llm_trait::LlmClient;
use crate::prompts::{
    mindmap_article_user_prompt, mindmap_system_prompt, mindmap_video_user_prompt,
    summary_system_prompt, summary_user_prompt, ReplyLanguage,
};
use crate::provider::{AnalysisRequest, ProviderId};
use crate::recovery::{recover_mindmap, recover_summary, Recovered, RecoveryOptions};
use crate::types::{MindmapDocument, SubtitleSummary};

/// Resolved analysis settings for the selected provider
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub enabled: bool,
    pub provider: ProviderId,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub language: ReplyLanguage,
    pub cache_max_age: Duration,
}

impl AnalysisSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let provider: ProviderId = config.provider.parse()?;
        let id = provider.as_str();

        Ok(Self {
            enabled: config.analysis_enabled,
            provider,
            model: config.effective_model().to_string(),
            api_key: config.api_key_for(id).map(str::to_string),
            base_url: config.base_url_for(id).map(str::to_string),
            language: ReplyLanguage::from_tag(&config.reply_language),
            cache_max_age: cache_max_age(config.cache_max_age_secs)?,
        })
    }
}

fn cache_max_age(secs: u64) -> Result<Duration> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| ClipsightError::config(format!("Cache max age out of range: {} seconds", secs)))
}

type Recover<T> = fn(&str, &RecoveryOptions) -> Result<Recovered<T>>;

/// Summaries and mindmaps on top of an [`LlmClient`]
pub struct AnalysisService {
    client: Arc<dyn LlmClient>,
    settings: AnalysisSettings,
    cache: Option<Arc<dyn AnalysisCache>>,
}

impl AnalysisService {
    pub fn new(client: Arc<dyn LlmClient>, settings: AnalysisSettings) -> Self {
        Self {
            client,
            settings,
            cache: None,
        }
    }

    /// Reuse results for identical inputs within the configured max age
    pub fn with_cache(mut self, cache: Arc<dyn AnalysisCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Structured summary of already formatted caption text
    pub async fn summarize(&self, content: &str) -> Result<SubtitleSummary> {
        let language = &self.settings.language;
        self.run(
            AnalysisKind::Summary,
            content,
            summary_system_prompt(language),
            summary_user_prompt(content),
            recover_summary,
        )
        .await
    }

    /// Structured summary of raw caption fragments
    pub async fn summarize_captions(&self, fragments: &[CaptionFragment]) -> Result<SubtitleSummary> {
        let content = format_for_analysis(fragments)?;
        self.summarize(&content).await
    }

    /// Mindmap of already formatted caption text
    pub async fn build_mindmap(&self, content: &str) -> Result<MindmapDocument> {
        let language = &self.settings.language;
        self.run(
            AnalysisKind::Mindmap,
            content,
            mindmap_system_prompt(language),
            mindmap_video_user_prompt(content),
            recover_mindmap,
        )
        .await
    }

    /// Mindmap of an article
    pub async fn build_article_mindmap(&self, title: &str, content: &str) -> Result<MindmapDocument> {
        let language = &self.settings.language;
        self.run(
            AnalysisKind::ArticleMindmap,
            &format!("{}\n{}", title, content),
            mindmap_system_prompt(language),
            mindmap_article_user_prompt(title, content),
            recover_mindmap,
        )
        .await
    }

    fn request(&self, system_prompt: String, user_prompt: String) -> Result<AnalysisRequest> {
        let settings = &self.settings;
        if !settings.enabled {
            return Err(ClipsightError::config("LLM analysis is disabled"));
        }

        let api_key = settings.api_key.clone().ok_or_else(|| {
            ClipsightError::config(format!(
                "No API key configured for {}",
                settings.provider.display_name()
            ))
        })?;

        Ok(AnalysisRequest {
            system_prompt,
            user_prompt,
            provider: settings.provider,
            model: settings.model.clone(),
            api_key,
            base_url: settings.base_url.clone(),
        })
    }

    async fn run<T>(
        &self,
        kind: AnalysisKind,
        content: &str,
        system_prompt: String,
        user_prompt: String,
        recover: Recover<T>,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        if content.trim().is_empty() {
            return Err(ClipsightError::invalid_input("Nothing to analyse"));
        }

        let request = self.request(system_prompt, user_prompt)?;
        let key = cache_key(
            kind,
            request.provider.as_str(),
            &request.model,
            self.settings.language.prompt_name(),
            content,
        );

        if let Some(cached) = self.cached(&key).await {
            return Ok(cached);
        }

        info!(
            "Starting {} analysis - Provider: {}, Content length: {} chars",
            kind.as_str(),
            request.provider,
            content.chars().count()
        );

        let raw = self.client.complete(&request).await?;
        let options = RecoveryOptions {
            language: self.settings.language.clone(),
            ..Default::default()
        };
        let recovered = recover(&raw, &options)?;

        info!(
            "{} analysis complete via {} ({} warnings)",
            kind.as_str(),
            recovered.method,
            recovered.warnings.len()
        );

        self.store(&key, &recovered.value).await;
        Ok(recovered.value)
    }

    /// Fresh cached value, if any
    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cache = self.cache.as_ref()?;
        let entry = match cache.get(key).await {
            Ok(entry) => entry?,
            Err(e) => {
                warn!("Cache lookup failed: {}", e);
                return None;
            }
        };

        if !entry.is_fresh(self.settings.cache_max_age) {
            debug!("Cache entry expired: {}", key);
            return None;
        }

        match serde_json::from_value(entry.value) {
            Ok(value) => {
                debug!("Cache hit: {}", key);
                Some(value)
            }
            Err(e) => {
                warn!("Ignoring unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T) {
        let Some(cache) = &self.cache else {
            return;
        };

        let result = match serde_json::to_value(value) {
            Ok(value) => cache.set(key, CacheEntry::new(value)).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            warn!("Failed to cache analysis result: {}", e);
        }
    }
}
