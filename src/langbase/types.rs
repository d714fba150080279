use serde::{Deserialize, Serialize};

/// Model used when provisioning pipes
pub const DEFAULT_PIPE_MODEL: &str = "openai:gpt-4o-mini";

/// Sampling temperature for pipes that do not set their own
pub const DEFAULT_PIPE_TEMPERATURE: f64 = 0.7;

/// Message in a Langbase conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Body of `POST /v1/pipes/run`
#[derive(Debug, Clone, Serialize)]
pub struct PipeRequest {
    pub name: String,
    pub messages: Vec<Message>,
    pub stream: bool,
}

impl PipeRequest {
    /// Non-streaming run of pipe `name`.
    pub fn new(name: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            name: name.into(),
            messages,
            stream: false,
        }
    }
}

/// Result of a pipe run. `success: false` is treated as a failed run.
#[derive(Debug, Clone, Deserialize)]
pub struct PipeResponse {
    pub success: bool,
    pub completion: String,
    #[serde(rename = "threadId")]
    pub thread_id: Option<String>,
    pub raw: Option<RawCompletion>,
}

/// Provider details echoed back by Langbase
#[derive(Debug, Clone, Deserialize)]
pub struct RawCompletion {
    pub model: Option<String>,
    pub usage: Option<TokenUsage>,
}

/// Token counts reported by the provider
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

/// A pipe the application expects to exist.
#[derive(Debug, Clone, PartialEq)]
pub struct PipeSpec {
    pub name: String,
    pub description: String,
    pub system_prompt: String,
    /// Ask the model for a JSON object
    pub json_output: bool,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Body of `POST /v1/pipes`. Always an upsert so provisioning is repeatable.
#[derive(Debug, Clone, Serialize)]
pub struct PipeDefinition {
    pub name: String,
    pub description: String,
    pub model: String,
    pub upsert: bool,
    pub json: bool,
    pub temperature: f64,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
}

impl From<&PipeSpec> for PipeDefinition {
    fn from(spec: &PipeSpec) -> Self {
        Self {
            name: spec.name.clone(),
            description: spec.description.clone(),
            model: DEFAULT_PIPE_MODEL.to_string(),
            upsert: true,
            json: spec.json_output,
            temperature: spec.temperature,
            max_tokens: spec.max_tokens,
            messages: vec![Message::system(&spec.system_prompt)],
        }
    }
}

/// Pipe as reported by Langbase after creation
#[derive(Debug, Clone, Deserialize)]
pub struct PipeInfo {
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}
