// Module declarations
mod config;
mod console;
mod conversation;
mod error;
mod functions;
mod movies;
mod openai_client;
mod prompt;
mod session;
mod traits;
mod types;

// Conversation loop and its state
pub use crate::conversation::{Assistant, DEFAULT_MAX_FUNCTION_CALLS};
pub use crate::error::AssistantError;
pub use crate::session::{Session, SessionId, SessionStore};

// Function registry, dispatcher and the backend behind it
pub use crate::functions::{
    dispatch, dispatch_with, Dispatch, FunctionCallRequest, FunctionResult, MovieFunction,
    ResolvedCall, RESULT_PREFIX,
};
pub use crate::movies::{MovieBackend, StubMovieBackend};
pub use crate::prompt::SYSTEM_PROMPT;

// Transports
pub use crate::config::AssistantConfig;
pub use crate::console::ConsoleSink;
pub use crate::openai_client::OpenAIClient;
pub use crate::traits::{
    ChatModel, ChatSink, LLMConfig, TokenStream, DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS,
    DEFAULT_MODEL, DEFAULT_TEMPERATURE,
};
pub use crate::types::{
    Message, OpenAIChatCompletionChunk, OpenAIErrorDetails, OpenAIErrorMessage, Role,
};
