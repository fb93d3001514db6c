use async_trait::async_trait;
use clipsight_common::Result;

use crate::provider::AnalysisRequest;

/// Anything that can turn an analysis request into raw model text
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one request, return the model's raw reply (possibly empty)
    async fn complete(&self, request: &AnalysisRequest) -> Result<String>;
}
