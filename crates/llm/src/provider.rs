//! Provider adapters
//!
//! Each supported back-end speaks a different HTTP dialect. An adapter turns
//! an [`AnalysisRequest`] into a [`RequestDescriptor`] and pulls the reply
//! text back out of the provider's response body. Adapters are stateless
//! and do no I/O.

use clipsight_common::{ClipsightError, Result};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Sampling temperature used for every analysis call
pub const TEMPERATURE: f64 = 0.3;

/// Anthropic API version header value
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Output budget for Claude, which requires an explicit `max_tokens`
pub const CLAUDE_MAX_TOKENS: u32 = 4096;

/// Supported LLM back-ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenAi,
    OpenAiCompatible,
    Gemini,
    Claude,
}

impl ProviderId {
    pub const ALL: [ProviderId; 4] = [
        ProviderId::OpenAi,
        ProviderId::OpenAiCompatible,
        ProviderId::Gemini,
        ProviderId::Claude,
    ];

    /// Configuration id ("openai", "openai-compatible", ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "openai",
            ProviderId::OpenAiCompatible => "openai-compatible",
            ProviderId::Gemini => "gemini",
            ProviderId::Claude => "claude",
        }
    }

    /// Human-readable name used in error messages
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "OpenAI",
            ProviderId::OpenAiCompatible => "OpenAI-compatible",
            ProviderId::Gemini => "Gemini",
            ProviderId::Claude => "Claude",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ClipsightError;

    fn from_str(s: &str) -> Result<Self> {
        let id = s.trim().to_lowercase();
        ProviderId::ALL
            .into_iter()
            .find(|p| p.as_str() == id)
            .ok_or_else(|| ClipsightError::unsupported_provider(s))
    }
}

/// One analysis call, fully resolved
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub provider: ProviderId,
    pub model: String,
    pub api_key: String,
    /// Overrides the provider's default API root
    pub base_url: Option<String>,
}

/// Provider-specific HTTP request, consumed by the gateway
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

/// Request building and response extraction for one provider
pub trait ProviderAdapter: Send + Sync {
    /// Canonical API root, used when the request has no override
    fn default_base_url(&self) -> &'static str;

    /// Build the HTTP request for this provider
    fn build_request(&self, request: &AnalysisRequest) -> RequestDescriptor;

    /// Reply text from a response body, empty when the path is absent
    fn extract_content(&self, body: &Value) -> String;

    /// Base URL for a request, without trailing slash
    fn base_url(&self, request: &AnalysisRequest) -> String {
        request
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(self.default_base_url())
            .trim_end_matches('/')
            .to_string()
    }
}

fn json_headers() -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    headers
}

fn text_at(body: &Value, pointer: &str) -> String {
    body.pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn chat_completions_request(base_url: String, request: &AnalysisRequest) -> RequestDescriptor {
    let mut messages = Vec::with_capacity(2);
    if !request.system_prompt.is_empty() {
        messages.push(json!({ "role": "system", "content": request.system_prompt }));
    }
    messages.push(json!({ "role": "user", "content": request.user_prompt }));

    let mut headers = json_headers();
    headers.insert(
        "Authorization".to_string(),
        format!("Bearer {}", request.api_key),
    );

    RequestDescriptor {
        url: format!("{}/chat/completions", base_url),
        headers,
        body: json!({
            "model": request.model,
            "messages": messages,
            "temperature": TEMPERATURE,
        }),
    }
}

/// OpenAI chat completions
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenAiAdapter;

impl ProviderAdapter for OpenAiAdapter {
    fn default_base_url(&self) -> &'static str {
        "https://api.openai.com/v1"
    }

    fn build_request(&self, request: &AnalysisRequest) -> RequestDescriptor {
        chat_completions_request(self.base_url(request), request)
    }

    fn extract_content(&self, body: &Value) -> String {
        text_at(body, "/choices/0/message/content")
    }
}

/// Any server implementing the OpenAI chat completions API
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenAiCompatibleAdapter;

impl ProviderAdapter for OpenAiCompatibleAdapter {
    fn default_base_url(&self) -> &'static str {
        "https://api.openai.com/v1"
    }

    fn build_request(&self, request: &AnalysisRequest) -> RequestDescriptor {
        chat_completions_request(self.base_url(request), request)
    }

    fn extract_content(&self, body: &Value) -> String {
        text_at(body, "/choices/0/message/content")
    }
}

/// Google Gemini `generateContent`
///
/// Gemini has no system role, so system and user prompts are sent as one
/// text part separated by a blank line.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeminiAdapter;

impl GeminiAdapter {
    /// `gemini-1.5-flash` -> `models/gemini-1.5-flash`; already-prefixed names pass through
    pub fn model_path(model: &str) -> String {
        if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        }
    }
}

impl ProviderAdapter for GeminiAdapter {
    fn default_base_url(&self) -> &'static str {
        "https://generativelanguage.googleapis.com/v1beta"
    }

    fn build_request(&self, request: &AnalysisRequest) -> RequestDescriptor {
        let text = if request.system_prompt.is_empty() {
            request.user_prompt.clone()
        } else {
            format!("{}\n\n{}", request.system_prompt, request.user_prompt)
        };

        RequestDescriptor {
            url: format!(
                "{}/{}:generateContent?key={}",
                self.base_url(request),
                Self::model_path(&request.model),
                request.api_key
            ),
            headers: json_headers(),
            body: json!({
                "contents": [{ "parts": [{ "text": text }] }],
                "generationConfig": {
                    "temperature": TEMPERATURE,
                    "responseMimeType": "application/json",
                },
            }),
        }
    }

    fn extract_content(&self, body: &Value) -> String {
        text_at(body, "/candidates/0/content/parts/0/text")
    }
}

/// Anthropic Messages API
#[derive(Debug, Default, Clone, Copy)]
pub struct ClaudeAdapter;

impl ProviderAdapter for ClaudeAdapter {
    fn default_base_url(&self) -> &'static str {
        "https://api.anthropic.com/v1"
    }

    fn build_request(&self, request: &AnalysisRequest) -> RequestDescriptor {
        let mut headers = json_headers();
        headers.insert("x-api-key".to_string(), request.api_key.clone());
        headers.insert(
            "anthropic-version".to_string(),
            ANTHROPIC_VERSION.to_string(),
        );

        let mut body = json!({
            "model": request.model,
            "max_tokens": CLAUDE_MAX_TOKENS,
            "messages": [{ "role": "user", "content": request.user_prompt }],
        });
        if !request.system_prompt.is_empty() {
            body["system"] = Value::String(request.system_prompt.clone());
        }

        RequestDescriptor {
            url: format!("{}/messages", self.base_url(request)),
            headers,
            body,
        }
    }

    fn extract_content(&self, body: &Value) -> String {
        text_at(body, "/content/0/text")
    }
}

/// Lookup table from provider id to adapter
#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<ProviderId, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    /// Registry without any adapters
    pub fn empty() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Register (or replace) the adapter for a provider
    pub fn register(&mut self, provider: ProviderId, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(provider, adapter);
    }

    /// Adapter for a provider, or `UnsupportedProvider`
    pub fn get(&self, provider: ProviderId) -> Result<&dyn ProviderAdapter> {
        self.adapters
            .get(&provider)
            .map(|a| a.as_ref())
            .ok_or_else(|| ClipsightError::unsupported_provider(provider.as_str()))
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(ProviderId::OpenAi, Arc::new(OpenAiAdapter));
        registry.register(ProviderId::OpenAiCompatible, Arc::new(OpenAiCompatibleAdapter));
        registry.register(ProviderId::Gemini, Arc::new(GeminiAdapter));
        registry.register(ProviderId::Claude, Arc::new(ClaudeAdapter));
        registry
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.adapters.keys().map(ProviderId::as_str).collect();
        ids.sort_unstable();
        f.debug_struct("AdapterRegistry").field("adapters", &ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(provider: ProviderId, model: &str) -> AnalysisRequest {
        AnalysisRequest {
            system_prompt: "You are terse.".to_string(),
            user_prompt: "Summarise this.".to_string(),
            provider,
            model: model.to_string(),
            api_key: "sk-test".to_string(),
            base_url: None,
        }
    }

    #[test]
    fn test_provider_id_parsing() {
        assert_eq!("openai".parse::<ProviderId>().unwrap(), ProviderId::OpenAi);
        assert_eq!(
            " OpenAI-Compatible ".parse::<ProviderId>().unwrap(),
            ProviderId::OpenAiCompatible
        );
        let err = "zhipu".parse::<ProviderId>().unwrap_err();
        assert!(matches!(err, ClipsightError::UnsupportedProvider(ref p) if p == "zhipu"));
    }

    #[test]
    fn test_openai_request() {
        let desc = OpenAiAdapter.build_request(&request(ProviderId::OpenAi, "gpt-4o-mini"));
        assert_eq!(desc.url, "https://api.openai.com/v1/chat/completions");
        assert_eq!(desc.headers["Authorization"], "Bearer sk-test");
        assert_eq!(desc.body["model"], "gpt-4o-mini");
        assert_eq!(desc.body["temperature"], 0.3);
        assert_eq!(desc.body["messages"][0]["role"], "system");
        assert_eq!(desc.body["messages"][1]["content"], "Summarise this.");
    }

    #[test]
    fn test_openai_omits_empty_system_message() {
        let mut req = request(ProviderId::OpenAiCompatible, "qwen");
        req.system_prompt = String::new();
        req.base_url = Some("http://localhost:8000/v1/".to_string());

        let desc = OpenAiCompatibleAdapter.build_request(&req);
        assert_eq!(desc.url, "http://localhost:8000/v1/chat/completions");
        let messages = desc.body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
    }

    #[test]
    fn test_gemini_model_path_normalization() {
        let plain = GeminiAdapter.build_request(&request(ProviderId::Gemini, "gemini-1.5-flash"));
        let prefixed =
            GeminiAdapter.build_request(&request(ProviderId::Gemini, "models/gemini-1.5-flash"));

        assert!(plain.url.contains("models/gemini-1.5-flash:generateContent"));
        assert!(!prefixed.url.contains("models/models/"));
        assert_eq!(plain.url, prefixed.url);
        assert_eq!(
            plain.url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent?key=sk-test"
        );
    }

    #[test]
    fn test_gemini_concatenates_prompts() {
        let desc = GeminiAdapter.build_request(&request(ProviderId::Gemini, "gemini-pro"));
        assert_eq!(
            desc.body["contents"][0]["parts"][0]["text"],
            "You are terse.\n\nSummarise this."
        );
        assert_eq!(desc.body["generationConfig"]["responseMimeType"], "application/json");
        assert!(!desc.headers.contains_key("Authorization"));

        let mut req = request(ProviderId::Gemini, "gemini-pro");
        req.system_prompt = String::new();
        let desc = GeminiAdapter.build_request(&req);
        assert_eq!(desc.body["contents"][0]["parts"][0]["text"], "Summarise this.");
    }

    #[test]
    fn test_claude_request() {
        let desc = ClaudeAdapter.build_request(&request(ProviderId::Claude, "claude-3-5-haiku"));
        assert_eq!(desc.url, "https://api.anthropic.com/v1/messages");
        assert_eq!(desc.headers["x-api-key"], "sk-test");
        assert_eq!(desc.headers["anthropic-version"], "2023-06-01");
        assert_eq!(desc.body["system"], "You are terse.");
        assert_eq!(desc.body["messages"][0]["role"], "user");
        assert_eq!(desc.body["max_tokens"], 4096);
    }

    #[test]
    fn test_extract_content_round_trip() {
        let text = "{\"summary\": \"hi\"}";

        let openai = json!({ "choices": [{ "message": { "content": text } }] });
        assert_eq!(OpenAiAdapter.extract_content(&openai), text);
        assert_eq!(OpenAiCompatibleAdapter.extract_content(&openai), text);

        let gemini = json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] });
        assert_eq!(GeminiAdapter.extract_content(&gemini), text);

        let claude = json!({ "content": [{ "type": "text", "text": text }] });
        assert_eq!(ClaudeAdapter.extract_content(&claude), text);
    }

    #[test]
    fn test_extract_content_missing_path_is_empty() {
        let body = json!({ "error": "nope" });
        assert_eq!(OpenAiAdapter.extract_content(&body), "");
        assert_eq!(GeminiAdapter.extract_content(&json!({ "candidates": [] })), "");
        assert_eq!(ClaudeAdapter.extract_content(&Value::Null), "");
    }

    #[test]
    fn test_registry_lookup() {
        let registry = AdapterRegistry::default();
        for id in ProviderId::ALL {
            assert!(registry.get(id).is_ok());
        }

        let mut partial = AdapterRegistry::empty();
        partial.register(ProviderId::Claude, Arc::new(ClaudeAdapter));
        assert!(partial.get(ProviderId::Claude).is_ok());
        assert!(matches!(
            partial.get(ProviderId::Gemini),
            Err(ClipsightError::UnsupportedProvider(_))
        ));
    }
}
