use crate::error::Result;
use crate::types::{RawResponse, ToolDefinition};
use async_trait::async_trait;

/// The remote model service, reduced to a single round trip.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(&self, prompt: &str, tools: &[ToolDefinition]) -> Result<RawResponse>;
}
