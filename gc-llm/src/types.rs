use crate::error::{LlmError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A function the remote model may ask the caller to invoke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// Parameter schema, forwarded as-is.
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Parse a JSON array of tool definitions (the `--tools` file format).
pub fn load_tool_definitions(json: &str) -> Result<Vec<ToolDefinition>> {
    let tools: Vec<ToolDefinition> = serde_json::from_str(json)
        .map_err(|e| LlmError::InvalidInput(format!("tool definitions: {e}")))?;
    if let Some(idx) = tools.iter().position(|t| t.name.trim().is_empty()) {
        return Err(LlmError::InvalidInput(format!(
            "tool definition at index {idx} has an empty name"
        )));
    }
    Ok(tools)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Map<String, serde_json::Value>,
}

/// Provider-defined rating record, carried through untouched.
pub type SafetyRating = serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    /// Total token count reported by the service, 0 when absent.
    pub tokens: u64,
    pub safety_ratings: Vec<SafetyRating>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResult {
    pub text: String,
    pub function_calls: Vec<FunctionCall>,
    pub metrics: Metrics,
}

/// What a backend hands back before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResponse {
    pub text: String,
    pub function_calls: Vec<FunctionCall>,
    pub block_reason: Option<String>,
    pub safety_ratings: Option<Vec<SafetyRating>>,
    pub total_token_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_definitions_parse_from_json_array() {
        let raw = json!([{
            "name": "get_weather",
            "description": "Gets the current weather for a specified location.",
            "parameters": {
                "type": "OBJECT",
                "properties": {
                    "location": { "type": "STRING", "description": "The city to get weather for" }
                },
                "required": ["location"]
            }
        }])
        .to_string();

        let tools = load_tool_definitions(&raw).expect("tools parse");
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "get_weather");
        assert_eq!(tools[0].parameters["required"], json!(["location"]));
    }

    #[test]
    fn tool_definitions_reject_empty_names() {
        let raw = json!([{ "name": " ", "description": "", "parameters": {} }]).to_string();
        let err = load_tool_definitions(&raw).expect_err("empty name rejected");
        assert!(matches!(err, LlmError::InvalidInput(_)));
    }

    #[test]
    fn tool_definitions_reject_malformed_json() {
        let err = load_tool_definitions("{not json").expect_err("bad json rejected");
        assert!(matches!(err, LlmError::InvalidInput(_)));
    }

    #[test]
    fn safety_ratings_keep_unknown_fields() {
        let rating = json!({
            "category": "HARM_CATEGORY_DANGEROUS_CONTENT",
            "probability": "LOW",
            "probabilityScore": 0.2,
            "severity": "HARM_SEVERITY_LOW",
            "severityScore": 0.1
        });
        let metrics = Metrics {
            tokens: 3,
            safety_ratings: vec![rating.clone()],
            timestamp: chrono::Utc::now(),
        };
        let value = serde_json::to_value(&metrics).expect("serialize");
        assert_eq!(value["safety_ratings"][0], rating);
    }

    #[test]
    fn function_call_args_default_to_empty() {
        let call: FunctionCall =
            serde_json::from_value(json!({ "name": "ping" })).expect("call parses");
        assert!(call.args.is_empty());
    }
}
