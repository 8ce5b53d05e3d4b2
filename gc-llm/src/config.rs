use crate::error::{LlmError, Result};
use crate::types::ToolDefinition;

pub const DEFAULT_MODEL: &str = "gemini-1.5-pro-latest";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Immutable client settings, fixed at construction.
#[derive(Clone)]
pub struct ClientConfig {
    api_key: String,
    model: String,
    base_url: Option<String>,
    tools: Vec<ToolDefinition>,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>, tools: Vec<ToolDefinition>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::Configuration(
                "gemini api key must not be empty".to_string(),
            ));
        }
        Ok(Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            tools,
        })
    }

    /// Explicit key if non-empty, else `fallback` (usually the environment).
    pub fn resolve(
        explicit: Option<&str>,
        fallback: Option<&str>,
        tools: Vec<ToolDefinition>,
    ) -> Result<Self> {
        let key = [explicit, fallback]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|k| !k.is_empty())
            .ok_or_else(|| {
                LlmError::Configuration(format!(
                    "gemini api key not provided and {API_KEY_ENV} is not set"
                ))
            })?;
        Self::new(key, tools)
    }

    /// `resolve` with `GEMINI_API_KEY` as the fallback.
    pub fn from_env(explicit: Option<&str>, tools: Vec<ToolDefinition>) -> Result<Self> {
        let env_key = std::env::var(API_KEY_ENV).ok();
        Self::resolve(explicit, env_key.as_deref(), tools)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model;
        }
        self
    }

    /// Point the client at a different endpoint root, e.g. a local proxy.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = Some(base_url).filter(|u| !u.trim().is_empty());
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("tools", &self.tools.len())
            .finish()
    }
}
