use crate::backend::GenerativeBackend;
use crate::config::ClientConfig;
use crate::error::{LlmError, Result};
use crate::gemini::GeminiBackend;
use crate::types::{Metrics, RawResponse, SendResult, ToolDefinition};
use std::sync::Arc;

/// Result of one round trip, keeping blocked and failed apart.
#[derive(Debug)]
pub enum SendOutcome {
    Ok(SendResult),
    Blocked(String),
    Failed(LlmError),
}

impl SendOutcome {
    /// Collapse to the "usable response or nothing" form.
    pub fn into_result(self) -> Option<SendResult> {
        match self {
            SendOutcome::Ok(result) => Some(result),
            SendOutcome::Blocked(_) | SendOutcome::Failed(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct ChatClient {
    config: Arc<ClientConfig>,
    backend: Arc<dyn GenerativeBackend>,
}

impl ChatClient {
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn new(config: ClientConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("geminichat/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(%e, "reqwest client build failed; falling back to default client");
                reqwest::Client::new()
            });
        let mut backend = GeminiBackend::new(http, config.api_key(), config.model());
        if let Some(base_url) = config.base_url() {
            backend = backend.with_base_url(base_url);
        }
        Self::with_backend(config, Arc::new(backend))
    }

    /// Explicit key, else `GEMINI_API_KEY`.
    pub fn from_key(api_key: Option<&str>, tools: Vec<ToolDefinition>) -> Result<Self> {
        Ok(Self::new(ClientConfig::from_env(api_key, tools)?))
    }

    pub fn with_backend(config: ClientConfig, backend: Arc<dyn GenerativeBackend>) -> Self {
        Self {
            config: Arc::new(config),
            backend,
        }
    }

    pub fn model(&self) -> &str {
        self.config.model()
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        self.config.tools()
    }

    /// One round trip. Failures and blocked responses both come back as `None`;
    /// failures are logged.
    pub async fn send_message(&self, message: &str) -> Option<SendResult> {
        self.send_message_detailed(message).await.into_result()
    }

    #[tracing::instrument(level = "info", skip_all, fields(model = %self.config.model()))]
    pub async fn send_message_detailed(&self, message: &str) -> SendOutcome {
        match self.backend.generate(message, self.config.tools()).await {
            Ok(raw) => normalize(raw),
            Err(e) => {
                tracing::error!(error = %e, "error communicating with gemini api");
                SendOutcome::Failed(e)
            }
        }
    }
}

fn normalize(raw: RawResponse) -> SendOutcome {
    if let Some(reason) = raw.block_reason {
        if raw.text.is_empty() && raw.function_calls.is_empty() {
            tracing::warn!(block_reason = %reason, "gemini withheld the response");
            return SendOutcome::Blocked(reason);
        }
    }

    SendOutcome::Ok(SendResult {
        text: raw.text,
        function_calls: raw.function_calls,
        metrics: Metrics {
            tokens: raw.total_token_count.unwrap_or(0),
            safety_ratings: raw.safety_ratings.unwrap_or_default(),
            timestamp: chrono::Utc::now(),
        },
    })
}
