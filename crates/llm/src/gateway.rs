use async_trait::async_trait;
use clipsight_common::{ClipsightError, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::llm_trait::LlmClient;
use crate::provider::{AdapterRegistry, AnalysisRequest};

/// Single-shot HTTP gateway in front of all provider adapters
///
/// One request per call, no retries. Timeouts are the HTTP client's
/// business and only apply when configured.
#[derive(Debug, Clone)]
pub struct ProviderGateway {
    client: Client,
    registry: AdapterRegistry,
}

impl ProviderGateway {
    /// Gateway over the built-in adapters
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        Self::with_registry(AdapterRegistry::default(), timeout)
    }

    /// Gateway over a custom adapter table
    pub fn with_registry(registry: AdapterRegistry, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClipsightError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, registry })
    }

    /// Send the request to its provider and return the raw reply text
    pub async fn call(&self, request: &AnalysisRequest) -> Result<String> {
        let adapter = self.registry.get(request.provider)?;
        let descriptor = adapter.build_request(request);

        info!(
            "Calling {} - Model: {}, Prompt length: {}",
            request.provider.display_name(),
            request.model,
            request.system_prompt.len() + request.user_prompt.len()
        );

        let mut builder = self.client.post(&descriptor.url);
        for (name, value) in &descriptor.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .json(&descriptor.body)
            .send()
            .await
            .map_err(|e| {
                ClipsightError::network(format!(
                    "{} request failed: {}",
                    request.provider.display_name(),
                    e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClipsightError::http(
                request.provider.display_name(),
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
            ));
        }

        let raw = response.text().await.map_err(|e| {
            ClipsightError::network(format!("Failed to read response body: {}", e))
        })?;
        let body: Value = serde_json::from_str(&raw)?;
        let content = adapter.extract_content(&body);

        debug!(
            "Received response from {} - Length: {}",
            request.provider.display_name(),
            content.len()
        );
        Ok(content)
    }
}

#[async_trait]
impl LlmClient for ProviderGateway {
    async fn complete(&self, request: &AnalysisRequest) -> Result<String> {
        self.call(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ClaudeAdapter, ProviderId};
    use axum::{
        http::{HeaderMap, StatusCode, Uri},
        response::{IntoResponse, Response},
        Json, Router,
    };
    use serde_json::json;
    use std::net::SocketAddr;
    use std::sync::Arc;

    /// Fake provider: answers in each provider's dialect, echoing request details
    async fn fake_provider(uri: Uri, headers: HeaderMap, Json(body): Json<Value>) -> Response {
        let path = uri.path();
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };

        if path.starts_with("/fail") {
            return (StatusCode::TOO_MANY_REQUESTS, "slow down").into_response();
        }
        if path.starts_with("/empty") {
            return Json(json!({ "id": "msg_1" })).into_response();
        }
        if path.starts_with("/garbage") {
            return "<html>oops</html>".into_response();
        }
        if path.ends_with("/chat/completions") {
            let text = format!("{}|{}", header("authorization"), body["model"].as_str().unwrap_or(""));
            return Json(json!({ "choices": [{ "message": { "content": text } }] })).into_response();
        }
        if path.ends_with(":generateContent") {
            let text = format!("{}|{}", path, uri.query().unwrap_or(""));
            return Json(json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] }))
                .into_response();
        }
        if path.ends_with("/messages") {
            let text = format!("{}|{}", header("x-api-key"), header("anthropic-version"));
            return Json(json!({ "content": [{ "type": "text", "text": text }] })).into_response();
        }
        StatusCode::NOT_FOUND.into_response()
    }

    async fn spawn_fake_provider() -> SocketAddr {
        let app = Router::new().fallback(fake_provider);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn request(provider: ProviderId, base_url: String) -> AnalysisRequest {
        AnalysisRequest {
            system_prompt: "system".to_string(),
            user_prompt: "user".to_string(),
            provider,
            model: "test-model".to_string(),
            api_key: "key-123".to_string(),
            base_url: Some(base_url),
        }
    }

    #[tokio::test]
    async fn test_openai_call() {
        let addr = spawn_fake_provider().await;
        let gateway = ProviderGateway::new(Some(Duration::from_secs(5))).unwrap();

        let text = gateway
            .call(&request(ProviderId::OpenAi, format!("http://{}/v1", addr)))
            .await
            .unwrap();
        assert_eq!(text, "Bearer key-123|test-model");
    }

    #[tokio::test]
    async fn test_gemini_call() {
        let addr = spawn_fake_provider().await;
        let gateway = ProviderGateway::new(None).unwrap();

        let text = gateway
            .call(&request(ProviderId::Gemini, format!("http://{}/v1beta", addr)))
            .await
            .unwrap();
        assert_eq!(text, "/v1beta/models/test-model:generateContent|key=key-123");
    }

    #[tokio::test]
    async fn test_claude_call() {
        let addr = spawn_fake_provider().await;
        let gateway = ProviderGateway::new(None).unwrap();

        let text = gateway
            .complete(&request(ProviderId::Claude, format!("http://{}/v1", addr)))
            .await
            .unwrap();
        assert_eq!(text, "key-123|2023-06-01");
    }

    #[tokio::test]
    async fn test_http_error_is_surfaced() {
        let addr = spawn_fake_provider().await;
        let gateway = ProviderGateway::new(None).unwrap();

        let err = gateway
            .call(&request(ProviderId::Claude, format!("http://{}/fail", addr)))
            .await
            .unwrap_err();
        match err {
            ClipsightError::Http {
                provider,
                status,
                status_text,
            } => {
                assert_eq!(provider, "Claude");
                assert_eq!(status, 429);
                assert_eq!(status_text, "Too Many Requests");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_json_body_is_an_error() {
        let addr = spawn_fake_provider().await;
        let gateway = ProviderGateway::new(None).unwrap();

        let err = gateway
            .call(&request(ProviderId::OpenAi, format!("http://{}/garbage", addr)))
            .await
            .unwrap_err();
        assert!(matches!(err, ClipsightError::Json(_)));
    }

    #[tokio::test]
    async fn test_unexpected_shape_yields_empty_text() {
        let addr = spawn_fake_provider().await;
        let gateway = ProviderGateway::new(None).unwrap();

        let text = gateway
            .call(&request(ProviderId::Claude, format!("http://{}/empty", addr)))
            .await
            .unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_unregistered_provider() {
        let mut registry = AdapterRegistry::empty();
        registry.register(ProviderId::Claude, Arc::new(ClaudeAdapter));
        let gateway = ProviderGateway::with_registry(registry, None).unwrap();

        let err = gateway
            .call(&request(ProviderId::Gemini, "http://127.0.0.1:9".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ClipsightError::UnsupportedProvider(_)));
    }
}
