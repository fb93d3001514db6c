use crate::error::ClipsightError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Provider ids recognised in configuration (env var prefixes derive from these)
pub const KNOWN_PROVIDERS: &[&str] = &["openai", "openai-compatible", "gemini", "claude"];

/// Clipsight application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Master switch for LLM analysis
    pub analysis_enabled: bool,

    /// Selected provider id (e.g. "openai", "gemini")
    pub provider: String,

    /// Model name
    pub model: String,

    /// Custom model name, overrides `model` when set
    pub custom_model: Option<String>,

    /// Base URL override applied to every provider
    pub base_url: Option<String>,

    /// API keys per provider id
    pub api_keys: BTreeMap<String, String>,

    /// Base URL overrides per provider id
    pub base_urls: BTreeMap<String, String>,

    /// Reply language tag (e.g. "zh", "en")
    pub reply_language: String,

    /// HTTP request timeout in seconds (0 disables)
    pub request_timeout_secs: u64,

    /// Analysis cache file; in-memory cache when unset
    pub cache_path: Option<PathBuf>,

    /// Maximum age of cached analysis results
    pub cache_max_age_secs: u64,

    /// Log directory
    pub log_dir: PathBuf,

    /// Log level
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            analysis_enabled: true,
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            custom_model: None,
            base_url: None,
            api_keys: BTreeMap::new(),
            base_urls: BTreeMap::new(),
            reply_language: "zh".to_string(),
            request_timeout_secs: 300,
            cache_path: None,
            cache_max_age_secs: 24 * 60 * 60,
            log_dir: PathBuf::from("./log"),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self, ClipsightError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        let defaults = Self::default();

        let mut api_keys = BTreeMap::new();
        let mut base_urls = BTreeMap::new();
        for provider in KNOWN_PROVIDERS {
            let prefix = env_prefix(provider);
            let key = get_env(&format!("{}_API_KEY", prefix)).or_else(|| {
                // Anthropic's own variable name is common enough to accept
                if *provider == "claude" {
                    get_env("ANTHROPIC_API_KEY")
                } else {
                    None
                }
            });
            if let Some(key) = key {
                api_keys.insert(provider.to_string(), key);
            }
            if let Some(url) = get_env(&format!("{}_BASE_URL", prefix)) {
                base_urls.insert(provider.to_string(), url);
            }
        }

        let reply_language = get_env("REPLY_LANGUAGE")
            .or_else(|| get_env("LANG"))
            .unwrap_or(defaults.reply_language);

        let config = Self {
            analysis_enabled: get_env("ANALYSIS_ENABLED")
                .map(|s| parse_bool(&s))
                .unwrap_or(true),
            provider: get_env("LLM_PROVIDER").unwrap_or(defaults.provider),
            model: get_env("LLM_MODEL").unwrap_or(defaults.model),
            custom_model: get_env("LLM_CUSTOM_MODEL"),
            base_url: get_env("LLM_BASE_URL"),
            api_keys,
            base_urls,
            reply_language,
            request_timeout_secs: get_env("REQUEST_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
            cache_path: get_env("CACHE_PATH").map(PathBuf::from),
            cache_max_age_secs: get_env("CACHE_MAX_AGE_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.cache_max_age_secs),
            log_dir: get_env("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            log_level: get_env("LOG_LEVEL").unwrap_or(defaults.log_level),
        };

        Ok(config)
    }

    /// Model actually sent to the provider
    pub fn effective_model(&self) -> &str {
        self.custom_model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.model)
    }

    /// Force a model, replacing any custom model from the environment
    pub fn override_model(&mut self, model: &str) {
        self.model = model.to_string();
        self.custom_model = None;
    }

    /// API key configured for a provider id
    pub fn api_key_for(&self, provider: &str) -> Option<&str> {
        self.api_keys
            .get(provider)
            .map(String::as_str)
            .filter(|k| !k.is_empty())
    }

    /// Base URL override for a provider id (per-provider wins over global)
    pub fn base_url_for(&self, provider: &str) -> Option<&str> {
        self.base_urls
            .get(provider)
            .map(String::as_str)
            .or(self.base_url.as_deref())
            .filter(|u| !u.is_empty())
    }

    /// Ensure required directories exist, create if not
    pub fn ensure_directories(&self) -> Result<(), ClipsightError> {
        let mut dirs = vec![self.log_dir.clone()];
        if let Some(parent) = self.cache_path.as_ref().and_then(|p| p.parent()) {
            if !parent.as_os_str().is_empty() {
                dirs.push(parent.to_path_buf());
            }
        }

        for dir in dirs {
            if !dir.exists() {
                std::fs::create_dir_all(&dir).map_err(|e| {
                    ClipsightError::config(format!(
                        "Failed to create directory {}: {}",
                        dir.display(),
                        e
                    ))
                })?;
            }
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ClipsightError> {
        if self.effective_model().is_empty() {
            return Err(ClipsightError::config("Model name cannot be empty"));
        }

        let overrides = self.base_url.iter().chain(self.base_urls.values());
        for url in overrides {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ClipsightError::config(format!(
                    "Base URL must start with http:// or https://: {}",
                    url
                )));
            }
        }

        Ok(())
    }
}

/// Env var prefix for a provider id ("openai-compatible" -> "OPENAI_COMPATIBLE")
pub fn env_prefix(provider: &str) -> String {
    provider.to_uppercase().replace('-', "_")
}

fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_bool(value: &str) -> bool {
    !matches!(
        value.to_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.analysis_enabled);
        assert_eq!(config.provider, "openai");
        assert_eq!(config.cache_max_age_secs, 86_400);
    }

    #[test]
    fn test_effective_model_prefers_custom() {
        let mut config = AppConfig::default();
        assert_eq!(config.effective_model(), "gpt-4o-mini");

        config.custom_model = Some("deepseek-chat".to_string());
        assert_eq!(config.effective_model(), "deepseek-chat");

        config.custom_model = Some(String::new());
        assert_eq!(config.effective_model(), "gpt-4o-mini");
    }

    #[test]
    fn test_override_model_beats_custom() {
        let mut config = AppConfig {
            custom_model: Some("deepseek-chat".to_string()),
            ..Default::default()
        };
        config.override_model("gpt-4o");
        assert_eq!(config.effective_model(), "gpt-4o");
        assert_eq!(config.custom_model, None);
    }

    #[test]
    fn test_base_url_resolution() {
        let mut config = AppConfig::default();
        assert_eq!(config.base_url_for("gemini"), None);

        config.base_url = Some("https://proxy.example.com/v1".to_string());
        assert_eq!(config.base_url_for("gemini"), Some("https://proxy.example.com/v1"));

        config
            .base_urls
            .insert("gemini".to_string(), "https://gemini.example.com".to_string());
        assert_eq!(config.base_url_for("gemini"), Some("https://gemini.example.com"));
        assert_eq!(config.base_url_for("claude"), Some("https://proxy.example.com/v1"));
    }

    #[test]
    fn test_env_prefix() {
        assert_eq!(env_prefix("openai-compatible"), "OPENAI_COMPATIBLE");
        assert_eq!(env_prefix("claude"), "CLAUDE");
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("OFF"));
        assert!(!parse_bool("false"));
    }

    #[test]
    fn test_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());

        let mut invalid_config = AppConfig::default();
        invalid_config.base_url = Some("ftp://example.com".to_string());
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = AppConfig::default();
        invalid_config.model = String::new();
        assert!(invalid_config.validate().is_err());
    }
}
