use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry of a conversation history, in the shape chat-completion APIs expect.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

// OpenAI chat-completions streaming types

#[derive(Serialize, Deserialize, Debug)]
pub struct OpenAIDelta {
    pub role: Option<String>,
    pub content: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct OpenAIChunkChoice {
    pub index: Option<usize>,
    pub delta: OpenAIDelta,
    pub finish_reason: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct OpenAIChatCompletionChunk {
    pub id: Option<String>,
    pub object: Option<String>,
    pub model: Option<String>,
    pub choices: Vec<OpenAIChunkChoice>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct OpenAIErrorMessage {
    pub error: OpenAIErrorDetails,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct OpenAIErrorDetails {
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub code: Option<serde_json::Value>,
    pub message: String,
}
