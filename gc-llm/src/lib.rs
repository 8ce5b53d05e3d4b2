//! Gemini chat client for geminichat.
//!
//! One message in, one normalized `SendResult` out. The remote model sits behind
//! the `GenerativeBackend` trait; `GeminiBackend` is the REST implementation.

mod backend;
mod client;
mod config;
mod cost;
mod error;
mod gemini;
mod types;

pub use backend::GenerativeBackend;
pub use client::{ChatClient, SendOutcome};
pub use config::{API_KEY_ENV, ClientConfig, DEFAULT_MODEL};
pub use cost::{CostEstimator, CostSample};
pub use error::{LlmError, Result};
pub use gemini::{DEFAULT_BASE_URL, GeminiBackend};
pub use types::{
    FunctionCall, Metrics, RawResponse, SafetyRating, SendResult, ToolDefinition,
    load_tool_definitions,
};
