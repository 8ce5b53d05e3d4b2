use crate::backend::GenerativeBackend;
use crate::error::{LlmError, Result};
use crate::types::{FunctionCall, RawResponse, SafetyRating, ToolDefinition};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone)]
pub struct GeminiBackend {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiBackend {
    pub fn new(http: reqwest::Client, api_key: &str, model: &str) -> Self {
        Self {
            http,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate_content_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    #[tracing::instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn generate(&self, prompt: &str, tools: &[ToolDefinition]) -> Result<RawResponse> {
        let req = GeminiRequest::new(prompt, tools);

        let response = self
            .http
            .post(self.generate_content_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&req)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::Http(format!(
                "gemini generateContent status={status} body={body}"
            )));
        }

        let parsed: GeminiResponse = serde_json::from_str(&body)?;
        tracing::debug!(
            candidates = parsed.candidates.len(),
            blocked = parsed
                .prompt_feedback
                .as_ref()
                .is_some_and(|f| f.block_reason.is_some()),
            "gemini response received"
        );
        parsed.try_into()
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiToolBlock>,
}

impl GeminiRequest {
    fn new(prompt: &str, tools: &[ToolDefinition]) -> Self {
        let tools = if tools.is_empty() {
            Vec::new()
        } else {
            vec![GeminiToolBlock {
                function_declarations: tools.iter().map(to_gemini_declaration).collect(),
            }]
        };
        Self {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiTextPart {
                    text: prompt.to_string(),
                }],
            }],
            tools,
        }
    }
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiTextPart>,
}

#[derive(Debug, Serialize)]
struct GeminiTextPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiToolBlock {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

fn to_gemini_declaration(t: &ToolDefinition) -> GeminiFunctionDeclaration {
    GeminiFunctionDeclaration {
        name: t.name.clone(),
        description: t.description.clone(),
        parameters: t.parameters.clone(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiCandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// Finish reasons meaning the candidate was withheld after the prompt was accepted.
const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "LANGUAGE",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
    "IMAGE_SAFETY",
];

fn blocking_finish_reason(reason: Option<String>) -> Option<String> {
    reason.filter(|r| BLOCKING_FINISH_REASONS.contains(&r.as_str()))
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    function_call: Option<GeminiFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    safety_ratings: Option<Vec<SafetyRating>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    total_token_count: Option<u64>,
}

impl TryFrom<GeminiResponse> for RawResponse {
    type Error = LlmError;

    fn try_from(v: GeminiResponse) -> Result<Self> {
        let mut text = String::new();
        let mut function_calls = Vec::new();

        // Only the first candidate counts.
        let (parts, finish_block) = match v.candidates.into_iter().next() {
            Some(c) => (
                c.content.map(|c| c.parts).unwrap_or_default(),
                blocking_finish_reason(c.finish_reason),
            ),
            None => (Vec::new(), None),
        };

        for part in parts {
            if let Some(t) = part.text {
                text.push_str(&t);
            }
            if let Some(call) = part.function_call {
                let args = match call.args {
                    serde_json::Value::Null => serde_json::Map::new(),
                    serde_json::Value::Object(map) => map,
                    other => {
                        return Err(LlmError::ResponseFormat(format!(
                            "gemini functionCall {} args must be an object, got {other}",
                            call.name
                        )));
                    }
                };
                function_calls.push(FunctionCall {
                    name: call.name,
                    args,
                });
            }
        }

        let (prompt_block, safety_ratings) = match v.prompt_feedback {
            Some(f) => (f.block_reason, f.safety_ratings),
            None => (None, None),
        };
        let block_reason = prompt_block.or(finish_block);

        Ok(RawResponse {
            text,
            function_calls,
            block_reason,
            safety_ratings,
            total_token_count: v.usage_metadata.and_then(|u| u.total_token_count),
        })
    }
}
